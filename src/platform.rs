//! Per-platform backend node pools.
//!
//! A platform maps area names to address pools split by family. Pools are
//! rebuilt from node files by the reloader and consulted by the resolver
//! whenever a label has no static A/AAAA records of its own.

use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::GslbError;
use crate::health::HealthRegistry;
use crate::metrics;
use crate::sampler::WeightedSelector;

/// Address family requested by a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    /// A lookups.
    V4,
    /// AAAA lookups.
    V6,
}

/// Health check descriptor attached to a node.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthCheck {
    /// Check type; only `tcp` is probed.
    #[serde(rename = "type")]
    pub kind: String,
    /// Port the check dials.
    pub port: u16,
}

/// One backend address with its administrative weight.
#[derive(Debug, Clone, Deserialize)]
pub struct Node {
    /// Backend address.
    #[serde(rename = "ip")]
    pub addr: IpAddr,
    /// Administrative weight; 0 disables weighting for the whole family
    /// only when every node in it is 0.
    #[serde(default)]
    pub weight: u64,
    /// Optional liveness check.
    #[serde(default)]
    pub hc: Option<HealthCheck>,
}

/// A platform area: both family pools plus their aggregate weights.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Area {
    /// IPv4 nodes, sorted weight-descending after load.
    #[serde(default, rename = "A")]
    pub ipv4: Vec<Node>,
    /// IPv6 nodes, sorted weight-descending after load.
    #[serde(default, rename = "AAAA")]
    pub ipv6: Vec<Node>,
    /// Sum of IPv4 node weights.
    #[serde(skip)]
    pub ipv4_weight: u64,
    /// Sum of IPv6 node weights.
    #[serde(skip)]
    pub ipv6_weight: u64,
}

impl Area {
    fn nodes(&self, family: AddressFamily) -> (&[Node], u64) {
        match family {
            AddressFamily::V4 => (&self.ipv4, self.ipv4_weight),
            AddressFamily::V6 => (&self.ipv6, self.ipv6_weight),
        }
    }
}

/// Area-name keyed pools of one platform.
pub type Areas = HashMap<String, Area>;

/// All platforms, shared between the reloader and the query path.
#[derive(Debug)]
pub struct PlatformPool {
    platforms: RwLock<HashMap<String, Arc<Areas>>>,
    health: HealthRegistry,
    /// `addr:port` keys referenced by the last reconciliation pass.
    probed: Mutex<HashSet<String>>,
}

impl PlatformPool {
    /// Empty pool backed by the given health registry.
    pub fn new(health: HealthRegistry) -> Self {
        Self {
            platforms: RwLock::new(HashMap::new()),
            health,
            probed: Mutex::new(HashSet::new()),
        }
    }

    /// The registry gating node selection.
    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    /// Parse a node file and install it, replacing any prior entry.
    pub fn add_platform(&self, name: &str, file: &Path) -> Result<(), GslbError> {
        let data = std::fs::read(file)?;
        self.add_platform_from_slice(name, &data)
    }

    /// Parse node JSON and install it under `name`.
    pub fn add_platform_from_slice(&self, name: &str, data: &[u8]) -> Result<(), GslbError> {
        let mut areas: Areas = serde_json::from_slice(data)
            .map_err(|err| GslbError::node(name, err.to_string()))?;

        for (area_name, area) in areas.iter_mut() {
            validate_family(name, area_name, &area.ipv4, AddressFamily::V4)?;
            validate_family(name, area_name, &area.ipv6, AddressFamily::V6)?;

            area.ipv4_weight = area.ipv4.iter().map(|n| n.weight).sum();
            area.ipv6_weight = area.ipv6.iter().map(|n| n.weight).sum();
            area.ipv4.sort_by(|a, b| b.weight.cmp(&a.weight));
            area.ipv6.sort_by(|a, b| b.weight.cmp(&a.weight));
        }

        debug!(platform = name, areas = areas.len(), "installing platform");
        self.platforms.write().insert(name.to_string(), Arc::new(areas));
        metrics::record_platform_count(self.platforms.read().len());
        Ok(())
    }

    /// Remove a platform entirely.
    pub fn delete_platform(&self, name: &str) {
        self.platforms.write().remove(name);
        metrics::record_platform_count(self.platforms.read().len());
    }

    /// Names of all installed platforms.
    pub fn platform_names(&self) -> Vec<String> {
        self.platforms.read().keys().cloned().collect()
    }

    /// One area of one platform, if present.
    pub fn area(&self, platform: &str, area: &str) -> Option<Area> {
        self.platforms
            .read()
            .get(platform)?
            .get(area)
            .cloned()
    }

    /// Select up to `max` live addresses from a platform area.
    ///
    /// With a zero family weight every healthy node is returned in pool
    /// order, capped at `max`. Otherwise winners are drawn by weight without
    /// replacement, and an unhealthy winner is consumed but not emitted, so
    /// the result may be shorter than `max`.
    pub fn search<R: rand::Rng + ?Sized>(
        &self,
        platform: &str,
        area: &str,
        family: AddressFamily,
        max: usize,
        rng: &mut R,
    ) -> Vec<IpAddr> {
        let Some(area) = self.area(platform, area) else {
            return Vec::new();
        };
        let (nodes, sum) = area.nodes(family);

        if sum == 0 {
            return nodes
                .iter()
                .filter(|node| self.node_usable(node))
                .map(|node| node.addr)
                .take(max)
                .collect();
        }

        let max = max.min(nodes.len());
        let mut selector =
            WeightedSelector::new(nodes.iter().map(|n| (n.clone(), n.weight)).collect());

        let mut out = Vec::with_capacity(max);
        for _ in 0..max {
            match selector.pick(rng) {
                Some(node) => {
                    if self.node_usable(&node) {
                        out.push(node.addr);
                    }
                }
                None => break,
            }
        }
        out
    }

    fn node_usable(&self, node: &Node) -> bool {
        match &node.hc {
            Some(hc) => self.health.is_healthy(&node.addr, hc.port),
            None => true,
        }
    }

    /// Align the health registry with the node set currently installed.
    ///
    /// Every node carrying a check descriptor gets a probe unit; units whose
    /// node disappeared since the previous pass are removed. A no-op unless
    /// `changed` reports that some node file was actually reloaded.
    pub fn health_reconcile(&self, changed: bool) {
        if !changed {
            return;
        }

        let mut in_use = HashSet::new();

        {
            let platforms = self.platforms.read();
            for areas in platforms.values() {
                for area in areas.values() {
                    for node in area.ipv4.iter().chain(area.ipv6.iter()) {
                        let Some(hc) = &node.hc else { continue };

                        let key = HealthRegistry::key(&node.addr, hc.port);
                        if !self.health.exists(&node.addr, &hc.kind, hc.port) {
                            if let Err(err) = self.health.add(node.addr, &hc.kind, hc.port) {
                                warn!(addr = %node.addr, port = hc.port, %err,
                                    "node registered without probe");
                            }
                        }
                        in_use.insert(key);
                    }
                }
            }
        }

        let mut probed = self.probed.lock();
        for stale in probed.difference(&in_use) {
            self.health.remove(stale);
        }
        *probed = in_use;
        metrics::record_health_unit_count(self.health.len());
    }
}

fn validate_family(
    platform: &str,
    area: &str,
    nodes: &[Node],
    family: AddressFamily,
) -> Result<(), GslbError> {
    for node in nodes {
        if let Some(hc) = &node.hc {
            if hc.port == 0 {
                return Err(GslbError::node(
                    platform,
                    format!("area '{area}': node {} has health check port 0", node.addr),
                ));
            }
        }
        let ok = match family {
            AddressFamily::V4 => node.addr.is_ipv4(),
            AddressFamily::V6 => node.addr.is_ipv6(),
        };
        if !ok {
            return Err(GslbError::node(
                platform,
                format!("area '{area}': node {} is in the wrong family list", node.addr),
            ));
        }
    }
    Ok(())
}
