//! In-memory proxy used by unit tests.

use futures_util::future::{BoxFuture, FutureExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::{DelayState, ProbeError, Proxy};
use crate::health::ranges::StatusRanges;

/// Shared in-flight gauge for concurrency assertions.
#[derive(Debug, Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct MockProxy {
    name: String,
    latency: Duration,
    /// `None` never answers.
    status: Option<u16>,
    state: DelayState,
    calls: AtomicUsize,
    in_flight: Arc<InFlight>,
}

impl MockProxy {
    pub fn new(name: &str, latency_ms: u64, status: u16) -> Self {
        Self {
            name: name.to_string(),
            latency: Duration::from_millis(latency_ms),
            status: Some(status),
            state: DelayState::new(),
            calls: AtomicUsize::new(0),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    pub fn hanging(name: &str) -> Self {
        Self {
            status: None,
            ..Self::new(name, 0, 200)
        }
    }

    pub fn with_gauge(mut self, gauge: Arc<InFlight>) -> Self {
        self.in_flight = gauge;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Proxy for MockProxy {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "mock"
    }

    fn url_test<'a>(
        &'a self,
        _url: &'a str,
        expected: &'a StatusRanges,
        deadline: Instant,
    ) -> BoxFuture<'a, Result<u16, ProbeError>> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.in_flight.enter();

            let respond = async {
                match self.status {
                    Some(status) => {
                        tokio::time::sleep(self.latency).await;
                        if expected.accepts(status) {
                            Ok(self.latency.as_millis() as u16)
                        } else {
                            Err(ProbeError::UnexpectedStatus(status))
                        }
                    }
                    None => std::future::pending().await,
                }
            };
            let result = tokio::time::timeout_at(deadline, respond)
                .await
                .unwrap_or(Err(ProbeError::Timeout));

            self.in_flight.exit();
            self.state.record(&result);
            result
        }
        .boxed()
    }

    fn alive(&self) -> bool {
        self.state.alive()
    }

    fn last_delay(&self) -> u16 {
        self.state.last_delay()
    }
}
