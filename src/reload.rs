//! Hot reload: polls the main config and the per-platform zone/node files,
//! swaps rebuilt entries into the server context and keeps the health
//! registry aligned.
//!
//! A file is re-read only when its mtime advanced AND its SHA-256 differs
//! from the last successful read, so touch without change is free. A failed
//! parse leaves the previously published entry in place; the data plane
//! never restarts.

use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::GslbConfig;
use crate::loader;
use crate::metrics;
use crate::state::{ServerContext, RESERVED_ZONE};

/// Period of all three polling tasks.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Settle time after a config change is noticed, to absorb editor writes.
pub const RELOAD_DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
struct ReadRecord {
    modified: SystemTime,
    hash: String,
}

/// The reload driver; owns the live configuration.
pub struct Reloader {
    ctx: Arc<ServerContext>,
    config_path: PathBuf,
    config: RwLock<Arc<GslbConfig>>,
    poll_interval: Duration,
    debounce: Duration,
}

impl Reloader {
    /// Driver with the standard intervals.
    pub fn new(ctx: Arc<ServerContext>, config_path: PathBuf, initial: GslbConfig) -> Arc<Self> {
        Self::with_intervals(ctx, config_path, initial, POLL_INTERVAL, RELOAD_DEBOUNCE)
    }

    /// Driver with custom intervals (tests).
    pub fn with_intervals(
        ctx: Arc<ServerContext>,
        config_path: PathBuf,
        initial: GslbConfig,
        poll_interval: Duration,
        debounce: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            ctx,
            config_path,
            config: RwLock::new(Arc::new(initial)),
            poll_interval,
            debounce,
        })
    }

    /// The configuration currently in effect.
    pub fn config(&self) -> Arc<GslbConfig> {
        self.config.read().clone()
    }

    /// Start the three polling tasks.
    pub fn spawn(self: &Arc<Self>, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        vec![
            tokio::spawn(Self::watch_config(self.clone(), shutdown.clone())),
            tokio::spawn(Self::poll_zones(self.clone(), shutdown.clone())),
            tokio::spawn(Self::poll_platforms(self.clone(), shutdown)),
        ]
    }

    async fn watch_config(self: Arc<Self>, shutdown: CancellationToken) {
        let mut last: Option<ReadRecord> = read_record(&self.config_path);
        let mut ticker = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = ticker.tick() => {}
            }

            let Some(current) = read_record(&self.config_path) else {
                continue;
            };
            let changed = match &last {
                Some(last) => current.modified > last.modified && current.hash != last.hash,
                None => true,
            };
            if !changed {
                continue;
            }

            // Let the writer finish; editors often write in several steps.
            tokio::time::sleep(self.debounce).await;

            match GslbConfig::load(&self.config_path) {
                Ok(config) => {
                    info!(path = %self.config_path.display(), "configuration reloaded");
                    *self.config.write() = Arc::new(config);
                    last = read_record(&self.config_path);
                    metrics::record_config_reload(true);
                }
                Err(err) => {
                    // Prior config stays live.
                    warn!(path = %self.config_path.display(), %err,
                        "ignoring bad configuration");
                    metrics::record_config_reload(false);
                }
            }
        }
    }

    async fn poll_zones(self: Arc<Self>, shutdown: CancellationToken) {
        let mut state: HashMap<String, ReadRecord> = HashMap::new();
        let mut ticker = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = ticker.tick() => self.zones_pass(&mut state),
            }
        }
    }

    async fn poll_platforms(self: Arc<Self>, shutdown: CancellationToken) {
        let mut state: HashMap<String, ReadRecord> = HashMap::new();
        let mut ticker = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = ticker.tick() => self.platforms_pass(&mut state),
            }
        }
    }

    fn zones_pass(&self, state: &mut HashMap<String, ReadRecord>) {
        let config = self.config();

        for (name, files) in &config.platforms {
            let Some(record) = pending_read(&files.zone_file, name, state) else {
                continue;
            };

            match loader::load_zone_file(name, &files.zone_file) {
                Ok(zone) => {
                    info!(zone = name, serial = zone.options.serial, "zone loaded");
                    self.ctx.publish_zone(name, Arc::new(zone));
                    state.insert(name.clone(), record);
                    metrics::record_zone_reload(name, true);
                }
                Err(err) => {
                    warn!(zone = name, %err, "zone reload abandoned");
                    metrics::record_zone_reload(name, false);
                }
            }
        }

        for name in self.ctx.zone_names() {
            if name == RESERVED_ZONE || config.platforms.contains_key(&name) {
                continue;
            }
            info!(zone = %name, "removing zone");
            state.remove(&name);
            self.ctx.remove_zone(&name);
        }
    }

    fn platforms_pass(&self, state: &mut HashMap<String, ReadRecord>) {
        let config = self.config();
        let pool = self.ctx.platforms();
        let mut changed = false;

        for (name, files) in &config.platforms {
            let Some(record) = pending_read(&files.node_file, name, state) else {
                continue;
            };

            match pool.add_platform(name, &files.node_file) {
                Ok(()) => {
                    info!(platform = name, "platform nodes loaded");
                    state.insert(name.clone(), record);
                    metrics::record_platform_reload(name, true);
                    changed = true;
                }
                Err(err) => {
                    warn!(platform = name, %err, "platform reload abandoned");
                    metrics::record_platform_reload(name, false);
                }
            }
        }

        for name in pool.platform_names() {
            if config.platforms.contains_key(&name) {
                continue;
            }
            info!(platform = %name, "removing platform");
            state.remove(&name);
            pool.delete_platform(&name);
            changed = true;
        }

        pool.health_reconcile(changed);
    }
}

/// The record to commit when the file must be (re-)read: first sighting, or
/// mtime advanced with different content. `None` otherwise.
fn pending_read(
    path: &Path,
    name: &str,
    state: &HashMap<String, ReadRecord>,
) -> Option<ReadRecord> {
    let Some(current) = read_record(path) else {
        // Missing or unreadable: skip this cycle, keep what is published.
        debug!(name, path = %path.display(), "data file unreadable; skipping");
        return None;
    };

    let changed = match state.get(name) {
        Some(last) => current.modified > last.modified && current.hash != last.hash,
        None => true,
    };
    changed.then_some(current)
}

fn read_record(path: &Path) -> Option<ReadRecord> {
    let modified = std::fs::metadata(path).and_then(|meta| meta.modified()).ok()?;
    let data = std::fs::read(path).ok()?;
    Some(ReadRecord {
        modified,
        hash: sha256_hex(&data),
    })
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
