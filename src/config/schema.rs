//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::adapter::GroupKind;
use crate::health::check::{CheckOptions, DEFAULT_CONCURRENCY};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HealthConfig {
    /// Control API settings.
    pub api: ApiConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Defaults shared by every group's health check.
    pub health_check: HealthCheckConfig,

    /// Leaf proxy definitions.
    pub proxies: Vec<ProxyEntry>,

    /// Proxy group definitions.
    pub groups: Vec<GroupEntry>,
}

/// Control API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind address (e.g., "127.0.0.1:9090").
    pub bind_address: String,

    /// Bearer token required on every request. Empty disables authentication.
    pub secret: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:9090".to_string(),
            secret: String::new(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9091".to_string(),
        }
    }
}

/// Health check tunables.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Maximum probes in flight per round.
    pub concurrency: usize,

    /// Timeout for each scheduled probe in milliseconds.
    pub probe_timeout_ms: u64,

    /// How long a finished round is reused by later triggers, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            probe_timeout_ms: 5000,
            debounce_ms: 1000,
        }
    }
}

impl HealthCheckConfig {
    pub fn options(&self) -> CheckOptions {
        CheckOptions {
            concurrency: self.concurrency,
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            debounce: Duration::from_millis(self.debounce_ms),
        }
    }
}

/// Outbound protocol of a leaf proxy.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProtocol {
    Direct,
    Http,
    Https,
    Socks5,
}

impl ProxyProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyProtocol::Direct => "direct",
            ProxyProtocol::Http => "http",
            ProxyProtocol::Https => "https",
            ProxyProtocol::Socks5 => "socks5",
        }
    }
}

/// Leaf proxy definition.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProxyEntry {
    /// Unique proxy name.
    pub name: String,

    /// Protocol used to reach the proxy.
    #[serde(rename = "type")]
    pub protocol: ProxyProtocol,

    /// Proxy host (ignored for `direct`).
    #[serde(default)]
    pub server: String,

    /// Proxy port (ignored for `direct`).
    #[serde(default)]
    pub port: u16,

    pub username: Option<String>,

    pub password: Option<String>,
}

/// Proxy group definition.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct GroupEntry {
    /// Unique group name.
    pub name: String,

    /// Selection strategy.
    #[serde(rename = "type")]
    pub kind: GroupKind,

    /// Member names: leaf proxies or groups defined earlier.
    pub proxies: Vec<String>,

    /// Health check target URL.
    #[serde(default = "default_test_url")]
    pub url: String,

    /// Seconds between automatic rounds. 0 disables the scheduler.
    #[serde(default)]
    pub interval: u64,

    /// Skip automatic rounds while the group is idle.
    #[serde(default = "default_lazy")]
    pub lazy: bool,

    /// Accepted status codes, e.g. "200/204/300-399". Empty accepts any response.
    #[serde(default)]
    pub expected_status: String,
}

fn default_test_url() -> String {
    "https://www.gstatic.com/generate_204".to_string()
}

fn default_lazy() -> bool {
    true
}
