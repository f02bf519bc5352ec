//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Scheduled rounds (check.rs):
//!     Periodic timer (skipped while lazy and idle)
//!     → single.rs (one round in flight, 1s result cache)
//!     → batch.rs (≤10 concurrent probes, 5s each, barrier)
//!     → Proxy::url_test updates each proxy's own state
//!
//! On-demand rounds (api/handlers.rs):
//!     Caller's URL, ranges, timeout
//!     → Group::delay_test → batch.rs with one shared deadline
//!     → per-member delays/errors returned to the caller
//! ```
//!
//! # Design Decisions
//! - Scheduled errors never leave this module
//! - A round probes the proxy snapshot taken when it started
//! - On-demand rounds bypass the debounce guard and may overlap scheduled ones

pub mod batch;
pub mod check;
pub mod ranges;
pub mod single;

pub use check::{CheckOptions, HealthCheck, RoundSummary};
pub use ranges::{RangeParseError, StatusRange, StatusRanges};
pub use single::Single;
