//! Proxy group health checking library

pub mod adapter;
pub mod api;
pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;

pub use config::schema::HealthConfig;
pub use health::HealthCheck;
pub use lifecycle::{Runtime, Shutdown};
