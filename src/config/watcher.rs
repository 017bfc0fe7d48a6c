//! Configuration file watcher for hot reload.
//!
//! Only the `scoring` section is applied to a running pool; backend
//! membership is fixed at construction, so backend changes are logged
//! and ignored until restart.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::PoolConfig;
use crate::lifecycle::Shutdown;
use crate::load_balancer::Pool;

/// Watches one config file and sends every valid reload down a channel.
pub struct ConfigWatcher {
    path: PathBuf,
    updates: mpsc::UnboundedSender<PoolConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end of its reloads.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<PoolConfig>) {
        let (updates, rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            updates,
        };
        (watcher, rx)
    }

    /// Start watching. Dropping the returned handle stops it.
    ///
    /// The parent directory is watched rather than the file, so editors that
    /// save by replacing the file are still seen.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self.path.file_name().map(|name| name.to_os_string());
        let path = self.path.clone();
        let updates = self.updates;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = %e, "Config watch error");
                        return;
                    }
                };
                if !(event.kind.is_modify() || event.kind.is_create()) {
                    return;
                }
                if !event.paths.iter().any(|p| p.file_name() == file_name.as_deref()) {
                    return;
                }
                reload(&path, &updates);
            },
            Config::default(),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = %self.path.display(), "Watching config for scoring changes");
        Ok(watcher)
    }
}

fn reload(path: &Path, updates: &mpsc::UnboundedSender<PoolConfig>) {
    match load_config(path) {
        Ok(config) => {
            tracing::debug!(path = %path.display(), "Config file reloaded");
            let _ = updates.send(config);
        }
        // partial writes land here too; the next event retries
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Ignoring config change"),
    }
}

/// Apply one reloaded configuration to a running pool.
///
/// Returns true if the scoring tunables changed.
pub fn apply_update(pool: &Pool, config: &PoolConfig) -> bool {
    let names: Vec<&str> = pool.backends().iter().map(|b| b.name()).collect();
    let reloaded: Vec<&str> = config.backends.iter().map(|b| b.name.as_str()).collect();
    if names != reloaded {
        tracing::warn!(
            current = ?names,
            reloaded = ?reloaded,
            "Backend list changed on disk; restart to apply"
        );
    }

    if *pool.scoring() == config.scoring {
        return false;
    }
    match pool.set_scoring(config.scoring.clone()) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Reloaded scoring rejected; keeping current tunables");
            false
        }
    }
}

/// Feed reloaded configurations into the pool until shutdown.
pub async fn run_updates(
    pool: Arc<Pool>,
    mut updates: mpsc::UnboundedReceiver<PoolConfig>,
    shutdown: Shutdown,
) {
    let stopped = shutdown.wait();
    tokio::pin!(stopped);
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(config) => {
                    apply_update(&pool, &config);
                }
                None => break,
            },
            _ = &mut stopped => {
                tracing::info!("Config updater stopping");
                break;
            }
        }
    }
}
