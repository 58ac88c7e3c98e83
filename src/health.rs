//! Active TCP liveness probes for platform nodes.
//!
//! The registry maps `addr:port` keys to probe units. A node with no
//! registered unit is treated as healthy; a registered unit reflects the
//! outcome of its most recent TCP dial.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::GslbError;
use crate::metrics;

/// Probe period; also used as the dial timeout.
pub const PROBE_INTERVAL: Duration = Duration::from_secs(5);

/// The only check type currently probed.
const CHECK_TCP: &str = "tcp";

#[derive(Debug)]
struct HealthUnit {
    addr: IpAddr,
    port: u16,
    check: String,
    healthy: Arc<AtomicBool>,
    stop: CancellationToken,
}

/// Thread-safe registry of health-check units.
///
/// `add` and `remove` are only called from the reloader; probe tasks flip
/// their own unit's status flag and never touch the map.
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    units: Arc<RwLock<HashMap<String, HealthUnit>>>,
    interval: Duration,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    /// Registry probing at the standard interval.
    pub fn new() -> Self {
        Self::with_interval(PROBE_INTERVAL)
    }

    /// Registry with a custom probe interval (tests).
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            units: Arc::new(RwLock::new(HashMap::new())),
            interval,
        }
    }

    /// Registry key for an address / port pair.
    pub fn key(addr: &IpAddr, port: u16) -> String {
        format!("{addr}:{port}")
    }

    /// Whether a unit is registered for this node.
    pub fn exists(&self, addr: &IpAddr, _check: &str, port: u16) -> bool {
        self.units.read().contains_key(&Self::key(addr, port))
    }

    /// Whether this node may be handed out.
    ///
    /// Absence of a unit means healthy: nodes without (supported) checks are
    /// never filtered.
    pub fn is_healthy(&self, addr: &IpAddr, port: u16) -> bool {
        match self.units.read().get(&Self::key(addr, port)) {
            Some(unit) => unit.healthy.load(Ordering::Relaxed),
            None => true,
        }
    }

    /// Register a unit and start probing it.
    ///
    /// The unit starts out healthy and is corrected by its first probe.
    pub fn add(&self, addr: IpAddr, check: &str, port: u16) -> Result<(), GslbError> {
        if check != CHECK_TCP {
            return Err(GslbError::UnsupportedHealthCheck(check.to_string()));
        }

        let healthy = Arc::new(AtomicBool::new(true));
        let stop = CancellationToken::new();
        let unit = HealthUnit {
            addr,
            port,
            check: check.to_string(),
            healthy: healthy.clone(),
            stop: stop.clone(),
        };

        let key = Self::key(&addr, port);
        debug!(%key, "starting health probe");
        {
            let mut units = self.units.write();
            if let Some(old) = units.insert(key, unit) {
                old.stop.cancel();
            }
        }

        let target = SocketAddr::new(addr, port);
        let interval = self.interval;
        tokio::spawn(probe_loop(target, healthy, stop, interval));

        Ok(())
    }

    /// Drop a unit and stop its probe loop.
    pub fn remove(&self, key: &str) {
        if let Some(unit) = self.units.write().remove(key) {
            debug!(key, addr = %unit.addr, port = unit.port, check = %unit.check, "stopping health probe");
            unit.stop.cancel();
        }
    }

    /// Number of registered units.
    pub fn len(&self) -> usize {
        self.units.read().len()
    }

    /// True when no unit is registered.
    pub fn is_empty(&self) -> bool {
        self.units.read().is_empty()
    }

    /// Keys of all registered units.
    pub fn keys(&self) -> Vec<String> {
        self.units.read().keys().cloned().collect()
    }
}

/// Periodic TCP dial against one node.
///
/// The dial timeout equals the probe interval, so at most one dial is in
/// flight per unit.
async fn probe_loop(
    target: SocketAddr,
    healthy: Arc<AtomicBool>,
    stop: CancellationToken,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop.cancelled() => {
                debug!(%target, "health probe stopped");
                return;
            }
            _ = ticker.tick() => {
                let up = match tokio::time::timeout(interval, TcpStream::connect(target)).await {
                    Ok(Ok(_stream)) => true,
                    Ok(Err(err)) => {
                        debug!(%target, %err, "health probe dial failed");
                        false
                    }
                    Err(_) => {
                        debug!(%target, "health probe dial timed out");
                        false
                    }
                };

                let was = healthy.swap(up, Ordering::Relaxed);
                if was != up {
                    warn!(%target, healthy = up, "node health changed");
                    metrics::record_health_transition(up);
                }
            }
        }
    }
}
