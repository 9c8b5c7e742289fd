//! Configuration file watcher for hot reload.
//!
//! # Data Flow
//! ```text
//! config file modified
//!     → loader.rs (parse + validate)
//!     → valid: new GuardConfig sent over the update channel
//!     → invalid: error logged, current configuration kept
//!
//! consumers read through SharedConfig (atomic Arc swap)
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GuardConfig;

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<GuardConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GuardConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        match load_config(&path) {
                            Ok(new_config) => {
                                let _ = tx.send(new_config);
                            }
                            Err(e) => {
                                tracing::error!(
                                    "Failed to reload config: {}. Keeping current configuration.",
                                    e
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Live configuration shared across tasks, swapped atomically on reload.
#[derive(Debug)]
pub struct SharedConfig {
    inner: ArcSwap<GuardConfig>,
}

impl SharedConfig {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            inner: ArcSwap::from_pointee(config),
        }
    }

    /// Snapshot of the current configuration.
    pub fn load(&self) -> Arc<GuardConfig> {
        self.inner.load_full()
    }

    /// Replace the current configuration.
    pub fn store(&self, config: GuardConfig) {
        self.inner.store(Arc::new(config));
    }

    /// Drain watcher updates into the shared slot until the channel closes.
    pub async fn apply_updates(&self, mut updates: mpsc::UnboundedReceiver<GuardConfig>) {
        while let Some(config) = updates.recv().await {
            tracing::info!("Applying reloaded configuration");
            self.store(config);
        }
    }
}
