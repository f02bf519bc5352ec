//! Bounded-concurrency probe rounds.
//!
//! # Responsibilities
//! - Probe every proxy of a snapshot once
//! - Keep at most `concurrency` probes in flight
//! - Return only after every probe finished (barrier)
//!
//! # Design Decisions
//! - A permit is taken before the probe task is spawned
//! - Probe failures are outcomes, never errors of the round
//! - Outcomes come back in snapshot order

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tracing::Instrument;

use crate::adapter::{AnyProxy, ProbeError};
use crate::health::ranges::StatusRanges;

/// When each probe must finish.
#[derive(Debug, Clone, Copy)]
pub enum Deadline {
    /// Each probe gets its own budget, starting when it starts.
    PerProbe(Duration),
    /// Every probe shares one absolute deadline.
    At(Instant),
}

impl Deadline {
    fn resolve(self) -> Instant {
        match self {
            Deadline::PerProbe(budget) => Instant::now() + budget,
            Deadline::At(at) => at,
        }
    }
}

/// Result of probing one proxy.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub name: String,
    pub result: Result<u16, ProbeError>,
}

/// Probe every proxy in `proxies` and wait for all of them.
pub async fn probe_all(
    proxies: &[AnyProxy],
    url: &str,
    expected: &StatusRanges,
    deadline: Deadline,
    concurrency: usize,
) -> Vec<ProbeOutcome> {
    let semaphore = Arc::new(Semaphore::new(concurrency.clamp(1, Semaphore::MAX_PERMITS)));
    let url: Arc<str> = Arc::from(url);
    let expected = Arc::new(expected.clone());
    let mut tasks = JoinSet::new();

    for (index, proxy) in proxies.iter().enumerate() {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        let proxy = proxy.clone();
        let url = url.clone();
        let expected = expected.clone();

        let probe = async move {
            let _permit = permit;
            let deadline = deadline.resolve();
            tracing::debug!(proxy = %proxy.name(), "Health checking");

            // Adapters honor the deadline themselves; the outer bound guarantees it.
            let result = time::timeout_at(deadline, proxy.url_test(&url, &expected, deadline))
                .await
                .unwrap_or(Err(ProbeError::Timeout));

            tracing::debug!(
                proxy = %proxy.name(),
                alive = proxy.alive(),
                delay_ms = proxy.last_delay(),
                "Health checked"
            );
            (index, proxy.name().to_string(), result)
        };
        tasks.spawn(probe.instrument(tracing::Span::current()));
    }

    let mut outcomes: Vec<(usize, ProbeOutcome)> = Vec::with_capacity(proxies.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, name, result)) => outcomes.push((index, ProbeOutcome { name, result })),
            Err(e) => tracing::warn!(error = %e, "Probe task failed"),
        }
    }

    outcomes.sort_by_key(|(index, _)| *index);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}
