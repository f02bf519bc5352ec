//! Configuration file watcher for hot reload.
//!
//! Editors usually emit several modify/create events for one save. Events are
//! collected until the file has been quiet for a short settle window, and then
//! the file is loaded once.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::HealthConfig;

/// Quiet period that ends a burst of file events.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(250);

/// Watches the configuration file and emits validated configurations.
pub struct ConfigWatcher {
    path: PathBuf,
    settle: Duration,
    update_tx: mpsc::UnboundedSender<HealthConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<HealthConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                settle: DEFAULT_SETTLE,
                update_tx,
            },
            update_rx,
        )
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Start watching. Must be called inside a tokio runtime.
    ///
    /// Keep the returned watcher alive while reloads are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    let _ = event_tx.send(());
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        tokio::spawn(reload_loop(self.path, self.settle, event_rx, self.update_tx));
        Ok(watcher)
    }
}

/// Load the file once per burst of change events. Exits when either side closes.
async fn reload_loop(
    path: PathBuf,
    settle: Duration,
    mut events: mpsc::UnboundedReceiver<()>,
    updates: mpsc::UnboundedSender<HealthConfig>,
) {
    while events.recv().await.is_some() {
        let burst = drain_burst(&mut events, settle).await;
        tracing::info!(path = ?path, events = burst, "Config file change detected, reloading");

        match load_config(&path) {
            Ok(config) => {
                if updates.send(config).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
            }
        }
    }
}

/// Swallow events until none arrives for `settle`. Returns the burst size.
async fn drain_burst(events: &mut mpsc::UnboundedReceiver<()>, settle: Duration) -> usize {
    let mut count = 1;
    while let Ok(Some(())) = tokio::time::timeout(settle, events.recv()).await {
        count += 1;
    }
    count
}
