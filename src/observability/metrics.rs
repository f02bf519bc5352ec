//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_health_rounds_total` (counter): finished rounds by group
//! - `proxy_health_rounds_skipped_total` (counter): lazy skips by group
//! - `proxy_health_round_duration_seconds` (histogram): round wall time by group
//! - `proxy_health_alive` (gauge): 1=alive, 0=down, by proxy
//! - `proxy_health_delay_ms` (gauge): last successful delay by proxy
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_round(group: &str, elapsed: Duration) {
    let labels = [("group", group.to_string())];
    counter!("proxy_health_rounds_total", &labels).increment(1);
    histogram!("proxy_health_round_duration_seconds", &labels).record(elapsed.as_secs_f64());
}

pub fn record_skipped_round(group: &str) {
    counter!("proxy_health_rounds_skipped_total", "group" => group.to_string()).increment(1);
}

pub fn record_probe(proxy: &str, alive: bool, delay_ms: u16) {
    let labels = [("proxy", proxy.to_string())];
    gauge!("proxy_health_alive", &labels).set(if alive { 1.0 } else { 0.0 });
    if alive {
        gauge!("proxy_health_delay_ms", &labels).set(f64::from(delay_ms));
    }
}
