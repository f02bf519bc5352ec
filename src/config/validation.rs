//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (groups reference existing proxies)
//! - Validate value ranges (timeouts > 0, ports valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Group members must be leaf proxies or groups declared earlier, so
//!   groups can be built in file order and never form cycles

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{HealthConfig, ProxyProtocol};
use crate::health::check::MAX_CONCURRENCY;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("duplicate proxy or group name: {0}")]
    DuplicateName(String),

    #[error("proxy {0}: missing server or port")]
    MissingAddress(String),

    #[error("group {group}: unknown member {member}")]
    UnknownMember { group: String, member: String },

    #[error("group {0}: no proxies")]
    EmptyGroup(String),

    #[error("group {group}: invalid test url {url}")]
    InvalidUrl { group: String, url: String },

    #[error("invalid bind address for {field}: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("health_check.{0} must be greater than zero")]
    Zero(&'static str),

    #[error("health_check.{field} must be at most {max}")]
    TooLarge { field: &'static str, max: usize },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &HealthConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut known: HashSet<&str> = HashSet::new();

    if config.api.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "api.bind_address",
            value: config.api.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }
    if config.health_check.concurrency == 0 {
        errors.push(ValidationError::Zero("concurrency"));
    } else if config.health_check.concurrency > MAX_CONCURRENCY {
        errors.push(ValidationError::TooLarge {
            field: "concurrency",
            max: MAX_CONCURRENCY,
        });
    }
    if config.health_check.probe_timeout_ms == 0 {
        errors.push(ValidationError::Zero("probe_timeout_ms"));
    }

    for proxy in &config.proxies {
        if !known.insert(proxy.name.as_str()) {
            errors.push(ValidationError::DuplicateName(proxy.name.clone()));
        }
        if proxy.protocol != ProxyProtocol::Direct && (proxy.server.is_empty() || proxy.port == 0) {
            errors.push(ValidationError::MissingAddress(proxy.name.clone()));
        }
    }

    for group in &config.groups {
        if group.proxies.is_empty() {
            errors.push(ValidationError::EmptyGroup(group.name.clone()));
        }
        for member in &group.proxies {
            if !known.contains(member.as_str()) {
                errors.push(ValidationError::UnknownMember {
                    group: group.name.clone(),
                    member: member.clone(),
                });
            }
        }
        if Url::parse(&group.url).is_err() {
            errors.push(ValidationError::InvalidUrl {
                group: group.name.clone(),
                url: group.url.clone(),
            });
        }
        // Inserted after the member check: a group cannot contain itself.
        if !known.insert(group.name.as_str()) {
            errors.push(ValidationError::DuplicateName(group.name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
