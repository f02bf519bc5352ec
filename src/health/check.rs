//! Per-group health check engine.
//!
//! # Responsibilities
//! - Periodically probe the group's proxies (`process`)
//! - Skip rounds while a lazy group is idle
//! - Collapse concurrent triggers into one round (`check`)
//! - Stop exactly once on `close`
//!
//! # States
//! ```text
//! Idle (interval == 0)   no loop, on-demand only
//! Scheduled              tick every `interval` seconds
//! Closed                 stop signal observed, loop exited, terminal
//! ```

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::Instrument;
use uuid::Uuid;

use crate::adapter::AnyProxy;
use crate::health::batch::{self, Deadline};
use crate::health::ranges::StatusRanges;
use crate::health::single::Single;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

pub const DEFAULT_CONCURRENCY: usize = 10;
/// Upper bound accepted from configuration.
pub const MAX_CONCURRENCY: usize = 1024;
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

/// Tunables shared by every round of one health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    /// Maximum probes in flight.
    pub concurrency: usize,
    /// Budget for each scheduled probe.
    pub probe_timeout: Duration,
    /// How long a finished round is reused by later triggers.
    pub debounce: Duration,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// What a finished round looked like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSummary {
    pub id: Uuid,
    pub total: usize,
    pub alive: usize,
    pub elapsed: Duration,
}

/// Health check for one proxy group.
pub struct HealthCheck {
    label: String,
    url: Arc<str>,
    proxies: ArcSwap<Vec<AnyProxy>>,
    interval: u64,
    lazy: bool,
    last_touch: AtomicI64,
    expected: Arc<StatusRanges>,
    options: CheckOptions,
    single: Single<RoundSummary>,
    shutdown: Shutdown,
}

impl HealthCheck {
    /// Build a health check. A malformed `expected_status` spec degrades to the empty set.
    pub fn new(
        proxies: Vec<AnyProxy>,
        url: impl Into<String>,
        interval: u64,
        lazy: bool,
        expected_status: &str,
    ) -> Self {
        let url: String = url.into();
        Self {
            label: url.clone(),
            url: Arc::from(url),
            proxies: ArcSwap::from_pointee(proxies),
            interval,
            lazy,
            last_touch: AtomicI64::new(0),
            expected: Arc::new(StatusRanges::parse_lenient(expected_status)),
            options: CheckOptions::default(),
            single: Single::new(DEFAULT_DEBOUNCE),
            shutdown: Shutdown::new(),
        }
    }

    /// Name used in logs and metrics (defaults to the test URL).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_options(mut self, options: CheckOptions) -> Self {
        self.single = Single::new(options.debounce);
        self.options = options;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn lazy(&self) -> bool {
        self.lazy
    }

    pub fn expected(&self) -> &StatusRanges {
        &self.expected
    }

    pub fn options(&self) -> CheckOptions {
        self.options
    }

    /// True when a scheduler loop applies (`interval > 0`).
    pub fn auto(&self) -> bool {
        self.interval != 0
    }

    /// Current proxy snapshot.
    pub fn proxies(&self) -> Arc<Vec<AnyProxy>> {
        self.proxies.load_full()
    }

    /// Replace the proxy set. Rounds already running keep their snapshot.
    pub fn set_proxies(&self, proxies: Vec<AnyProxy>) {
        self.proxies.store(Arc::new(proxies));
    }

    /// Mark the group as used now.
    pub fn touch(&self) {
        self.last_touch.store(unix_now(), Ordering::Release);
    }

    /// Last touch time in unix seconds (0 if never touched).
    pub fn last_touch(&self) -> i64 {
        self.last_touch.load(Ordering::Acquire)
    }

    /// Whether a tick at `now` (unix seconds) runs a round.
    pub fn should_probe(&self, now: i64) -> bool {
        !self.lazy || now - self.last_touch() < self.interval as i64
    }

    /// Run one round, or join the round already running / just finished.
    pub async fn check(&self) -> RoundSummary {
        let (summary, shared) = self
            .single
            .run(|| {
                run_round(
                    self.label.clone(),
                    self.proxies.load_full(),
                    self.url.clone(),
                    self.expected.clone(),
                    self.options,
                )
            })
            .await;

        if shared {
            tracing::debug!(group = %self.label, round = %summary.id, "Joined existing health check round");
        }
        summary
    }

    /// Scheduler loop. Returns immediately when `interval == 0` or once closed.
    pub async fn process(&self) {
        if !self.auto() {
            return;
        }

        let period = Duration::from_secs(self.interval);
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stop = self.shutdown.subscribe();

        tracing::info!(
            group = %self.label,
            interval = self.interval,
            lazy = self.lazy,
            url = %self.url,
            "Health check starting"
        );

        loop {
            tokio::select! {
                biased;
                _ = stop.recv() => {
                    tracing::info!(group = %self.label, "Health check received stop signal, exiting loop");
                    break;
                }
                _ = ticker.tick() => {
                    if self.should_probe(unix_now()) {
                        self.check().await;
                    } else {
                        tracing::debug!(group = %self.label, "Skip once health check because we are lazy");
                        metrics::record_skipped_round(&self.label);
                    }
                }
            }
        }
    }

    /// Spawn the scheduler loop. `None` when `interval == 0`.
    pub fn spawn(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.auto() {
            return None;
        }
        let this = self.clone();
        Some(tokio::spawn(async move { this.process().await }))
    }

    /// Stop the scheduler. Returns `false` if already closed.
    pub fn close(&self) -> bool {
        let first = self.shutdown.trigger();
        if !first {
            tracing::debug!(group = %self.label, "Health check already closed");
        }
        first
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_triggered()
    }
}

async fn run_round(
    label: String,
    proxies: Arc<Vec<AnyProxy>>,
    url: Arc<str>,
    expected: Arc<StatusRanges>,
    options: CheckOptions,
) -> RoundSummary {
    let id = Uuid::new_v4();
    let started = Instant::now();
    let span = tracing::debug_span!("health_check", group = %label, round = %id);

    async {
        tracing::debug!(proxies = proxies.len(), "Start new health checking");

        let outcomes = batch::probe_all(
            &proxies,
            &url,
            &expected,
            Deadline::PerProbe(options.probe_timeout),
            options.concurrency,
        )
        .await;

        for outcome in &outcomes {
            match &outcome.result {
                Ok(delay) => metrics::record_probe(&outcome.name, true, *delay),
                Err(_) => metrics::record_probe(&outcome.name, false, 0),
            }
        }

        let summary = RoundSummary {
            id,
            total: outcomes.len(),
            alive: outcomes.iter().filter(|o| o.result.is_ok()).count(),
            elapsed: started.elapsed(),
        };
        metrics::record_round(&label, summary.elapsed);
        tracing::debug!(
            total = summary.total,
            alive = summary.alive,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Finish a health checking"
        );
        summary
    }
    .instrument(span)
    .await
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
