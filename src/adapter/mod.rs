//! Proxy adapters.
//!
//! # Data Flow
//! ```text
//! config [[proxies]] → http.rs (HttpProxy, leaf)
//! config [[groups]]  → group.rs (ProxyGroup, owns a HealthCheck)
//!                    → registry.rs (name → Arc<dyn Proxy>, swapped on reload)
//! ```
//!
//! # Design Decisions
//! - Every proxy owns its alive/delay state; probing mutates it in place
//! - Group capability is an explicit trait queried through `Proxy::as_group`
//! - Probe deadlines are absolute instants shared by the caller

pub mod group;
pub mod http;
#[cfg(test)]
pub mod mock;
pub mod registry;
pub mod types;

use futures_util::future::BoxFuture;
use std::sync::Arc;
use tokio::time::Instant;

use crate::health::ranges::StatusRanges;

pub use group::{GroupKind, ProxyGroup};
pub use http::HttpProxy;
pub use registry::ProxyRegistry;
pub use types::{DelayReport, DelayState, ProbeError, ProxyInfo, UNKNOWN_DELAY};

/// Shared handle to any proxy.
pub type AnyProxy = Arc<dyn Proxy>;

/// An outbound proxy that can be probed.
pub trait Proxy: Send + Sync {
    /// Unique name within its group.
    fn name(&self) -> &str;

    /// Adapter type shown in the API (`http`, `socks5`, `url-test`, ...).
    fn kind(&self) -> &'static str;

    /// Probe `url` through this proxy, finishing no later than `deadline`.
    ///
    /// The outcome is also recorded on the proxy's own delay state.
    fn url_test<'a>(
        &'a self,
        url: &'a str,
        expected: &'a StatusRanges,
        deadline: Instant,
    ) -> BoxFuture<'a, Result<u16, ProbeError>>;

    fn alive(&self) -> bool;

    fn last_delay(&self) -> u16;

    /// Group capability, if this proxy is a collection of proxies.
    fn as_group(&self) -> Option<&dyn Group> {
        None
    }

    fn info(&self) -> ProxyInfo {
        ProxyInfo {
            name: self.name().to_string(),
            kind: self.kind().to_string(),
            alive: self.alive(),
            delay: self.last_delay(),
            now: None,
            all: None,
        }
    }
}

/// Capability implemented by proxies that wrap a set of members.
pub trait Group: Send + Sync {
    /// Snapshot of the current members.
    fn members(&self) -> Vec<AnyProxy>;

    /// Name of the currently preferred member.
    fn now(&self) -> Option<String>;

    /// Pick the member for a real connection and mark the group as used.
    fn select(&self) -> Option<AnyProxy>;

    /// Probe every member against a shared deadline and report per-member results.
    fn delay_test<'a>(
        &'a self,
        url: &'a str,
        expected: &'a StatusRanges,
        deadline: Instant,
    ) -> BoxFuture<'a, Result<DelayReport, ProbeError>>;
}
