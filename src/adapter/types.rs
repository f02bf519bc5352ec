//! Probe results, per-proxy delay state and API views.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Delay reported for a proxy that is down or was never measured.
pub const UNKNOWN_DELAY: u16 = u16::MAX;

/// Errors produced by a single probe or an on-demand group round.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// Deadline reached before a response arrived.
    #[error("timeout")]
    Timeout,

    /// Connection, handshake or request failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Response arrived but its status is not in the expected set.
    #[error("unexpected status code {0}")]
    UnexpectedStatus(u16),

    /// Group has no members to probe.
    #[error("group has no proxies")]
    NoMembers,

    /// Every member of a group failed.
    #[error("get delay: all proxies failed")]
    AllFailed,
}

/// Convert an elapsed time to whole milliseconds, saturating at `u16::MAX`.
pub fn delay_ms(elapsed: Duration) -> u16 {
    elapsed.as_millis().min(u128::from(u16::MAX)) as u16
}

/// Alive flag and last measured delay, owned by each proxy.
#[derive(Debug)]
pub struct DelayState {
    alive: AtomicBool,
    delay: AtomicU16,
}

impl DelayState {
    pub fn new() -> Self {
        Self {
            alive: AtomicBool::new(true),
            delay: AtomicU16::new(UNKNOWN_DELAY),
        }
    }

    /// Record the outcome of one probe.
    pub fn record(&self, result: &Result<u16, ProbeError>) {
        match result {
            Ok(delay) => {
                self.delay.store(*delay, Ordering::Relaxed);
                self.alive.store(true, Ordering::Release);
            }
            Err(_) => {
                self.alive.store(false, Ordering::Release);
            }
        }
    }

    pub fn alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Last successful delay, or `UNKNOWN_DELAY` while not alive.
    pub fn last_delay(&self) -> u16 {
        if !self.alive() {
            return UNKNOWN_DELAY;
        }
        self.delay.load(Ordering::Relaxed)
    }
}

impl Default for DelayState {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable snapshot of a proxy for the control API.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProxyInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub alive: bool,
    pub delay: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all: Option<Vec<String>>,
}

/// Outcome of an on-demand group round.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DelayReport {
    /// Member name → measured delay (ms) for successful probes.
    pub delays: BTreeMap<String, u16>,
    /// Member name → error message for failed probes.
    pub errors: BTreeMap<String, String>,
}

impl DelayReport {
    pub fn is_all_failed(&self) -> bool {
        self.delays.is_empty()
    }
}
