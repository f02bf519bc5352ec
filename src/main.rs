//! Proxy group health checker
//!
//! # Architecture Overview
//!
//! ```text
//!   config file ──▶ config ──▶ lifecycle::Runtime ──▶ adapter (leaves, groups, registry)
//!        │                            │
//!        └── watcher ── reload ───────┤
//!                                     ▼
//!                              health::HealthCheck (one per group)
//!                                     │  ticker → single-flight → batch probes
//!                                     ▼
//!                              Proxy::url_test (alive / delay state)
//!
//!   Control API (api) ──▶ registry ──▶ Group::delay_test (on-demand rounds)
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use proxy_health::api::{self, ApiState};
use proxy_health::config::{load_config, watcher::ConfigWatcher};
use proxy_health::lifecycle::{signals, Runtime, Shutdown};
use proxy_health::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "proxy-health")]
#[command(about = "Health checker for proxy groups", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "proxy-health.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init(&config.observability)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "proxy-health starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut runtime = Runtime::build(&config)?;
    runtime.start();

    let shutdown = Shutdown::new();

    let listener = TcpListener::bind(&config.api.bind_address).await?;
    let state = ApiState::new(runtime.registry(), &config.api.secret);
    let server = tokio::spawn(api::serve(listener, state, shutdown.subscribe()));

    let (watcher, mut updates) = ConfigWatcher::new(&args.config);
    let _watcher = match watcher.run() {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
            None
        }
    };

    tokio::select! {
        _ = signals::wait_for_shutdown() => {}
        _ = async {
            while let Some(new_config) = updates.recv().await {
                match runtime.reload(&new_config) {
                    Ok(()) => tracing::info!("Configuration reloaded"),
                    Err(e) => tracing::error!(error = %e, "Reload rejected, keeping current proxies"),
                }
            }
            std::future::pending::<()>().await
        } => {}
    }

    shutdown.trigger();
    runtime.shutdown().await;
    match server.await {
        Ok(Err(e)) => tracing::error!(error = %e, "Control API failed"),
        Err(e) => tracing::error!(error = %e, "Control API task panicked"),
        Ok(Ok(())) => {}
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
