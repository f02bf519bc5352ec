//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Health checks and the control API produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Round IDs appear as span fields on every probe log line
//! - Metrics are cheap and no-ops when the exporter is disabled

pub mod logging;
pub mod metrics;
