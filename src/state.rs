//! Shared server state: the published zones, the platform pool and the
//! query logger, passed around as one `Arc` handle instead of module
//! globals.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::health::HealthRegistry;
use crate::metrics;
use crate::platform::PlatformPool;
use crate::qlog::QueryLogger;
use crate::zone::Zone;

/// Zone reserved for the server itself; never reloaded from config.
pub const RESERVED_ZONE: &str = "gslb-dns";

/// Everything a query or a reload needs to see.
pub struct ServerContext {
    zones: RwLock<HashMap<String, Arc<Zone>>>,
    platforms: PlatformPool,
    query_log: Option<QueryLogger>,
    private_debug: bool,
}

impl ServerContext {
    /// New context around a platform pool.
    pub fn new(platforms: PlatformPool, query_log: Option<QueryLogger>, private_debug: bool) -> Self {
        Self {
            zones: RwLock::new(HashMap::new()),
            platforms,
            query_log,
            private_debug,
        }
    }

    /// The platform pool.
    pub fn platforms(&self) -> &PlatformPool {
        &self.platforms
    }

    /// The health registry behind the pool.
    pub fn health(&self) -> &HealthRegistry {
        self.platforms.health()
    }

    /// The query logger, when configured.
    pub fn query_log(&self) -> Option<&QueryLogger> {
        self.query_log.as_ref()
    }

    /// Whether the reserved zone only answers loopback clients.
    pub fn private_debug(&self) -> bool {
        self.private_debug
    }

    /// Publish a zone, replacing any prior entry atomically.
    pub fn publish_zone(&self, name: &str, zone: Arc<Zone>) {
        debug!(zone = name, serial = zone.options.serial, "publishing zone");
        self.zones.write().insert(name.to_string(), zone);
        metrics::record_zone_count(self.zones.read().len());
    }

    /// Remove a zone from service.
    pub fn remove_zone(&self, name: &str) {
        self.zones.write().remove(name);
        metrics::record_zone_count(self.zones.read().len());
    }

    /// Names of all published zones.
    pub fn zone_names(&self) -> Vec<String> {
        self.zones.read().keys().cloned().collect()
    }

    /// One published zone by exact name.
    pub fn zone(&self, name: &str) -> Option<Arc<Zone>> {
        self.zones.read().get(name).cloned()
    }

    /// The zone answering for a query name: the longest origin that is a
    /// suffix of the (lowercased, dot-stripped) name.
    pub fn find_zone(&self, qname: &str) -> Option<Arc<Zone>> {
        let name = qname.trim_end_matches('.');
        let zones = self.zones.read();

        let mut best: Option<&Arc<Zone>> = None;
        for (origin, zone) in zones.iter() {
            let matches = name == origin
                || name
                    .strip_suffix(origin)
                    .is_some_and(|head| head.ends_with('.'));
            if matches && best.is_none_or(|b| origin.len() > b.origin.len()) {
                best = Some(zone);
            }
        }
        best.cloned()
    }

    /// Install the reserved internal zone (SOA only).
    pub fn setup_reserved_zone(&self) {
        let mut zone = Zone::new(RESERVED_ZONE);
        zone.add_label("");
        zone.setup_soa();
        self.publish_zone(RESERVED_ZONE, Arc::new(zone));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ServerContext {
        ServerContext::new(PlatformPool::new(HealthRegistry::new()), None, false)
    }

    #[test]
    fn find_zone_matches_by_suffix() {
        let ctx = context();
        ctx.publish_zone("example.com", Arc::new(Zone::new("example.com")));

        assert!(ctx.find_zone("www.example.com.").is_some());
        assert!(ctx.find_zone("example.com.").is_some());
        assert!(ctx.find_zone("example.org.").is_none());
        // Not a label boundary: must not match.
        assert!(ctx.find_zone("badexample.com.").is_none());
    }

    #[test]
    fn find_zone_prefers_longest_origin() {
        let ctx = context();
        ctx.publish_zone("example.com", Arc::new(Zone::new("example.com")));
        ctx.publish_zone("sub.example.com", Arc::new(Zone::new("sub.example.com")));

        let zone = ctx.find_zone("www.sub.example.com.").unwrap();
        assert_eq!(zone.origin, "sub.example.com");
    }

    #[test]
    fn publish_replaces_whole_entry() {
        let ctx = context();
        let mut v1 = Zone::new("example.com");
        v1.options.serial = 1;
        ctx.publish_zone("example.com", Arc::new(v1));

        let mut v2 = Zone::new("example.com");
        v2.options.serial = 2;
        ctx.publish_zone("example.com", Arc::new(v2));

        assert_eq!(ctx.zone("example.com").unwrap().options.serial, 2);
        assert_eq!(ctx.zone_names().len(), 1);
    }

    #[test]
    fn reserved_zone_has_soa() {
        let ctx = context();
        ctx.setup_reserved_zone();
        let zone = ctx.zone(RESERVED_ZONE).unwrap();
        assert!(zone.soa_record().is_some());
    }
}
