//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Build proxies & groups → Start schedulers → Start API
//!
//! Reload (startup.rs):
//!     Validated config → Rebuild leaves → Replace group membership
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → Stop API → Close every health check once → Exit
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{Runtime, StartupError};
