//! Metrics instrumentation for gslb-dns.
//!
//! All metrics are prefixed with `gslb_dns.`

use metrics::{counter, gauge, histogram};
use std::time::Instant;

/// Record a served query.
pub fn record_query(zone: &str, qtype: &str, rcode: &str, duration: std::time::Duration) {
    counter!("gslb_dns.query.count",
        "zone" => zone.to_string(), "type" => qtype.to_string(), "rcode" => rcode.to_string())
    .increment(1);
    histogram!("gslb_dns.query.duration.seconds", "zone" => zone.to_string())
        .record(duration.as_secs_f64());
}

/// Record a query that matched no configured zone.
pub fn record_refused() {
    counter!("gslb_dns.query.refused.count").increment(1);
}

/// Record the outcome of a zone reload attempt.
pub fn record_zone_reload(zone: &str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("gslb_dns.reload.zone.count",
        "zone" => zone.to_string(), "outcome" => outcome)
    .increment(1);
}

/// Record the outcome of a platform node-file reload attempt.
pub fn record_platform_reload(platform: &str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("gslb_dns.reload.platform.count",
        "platform" => platform.to_string(), "outcome" => outcome)
    .increment(1);
}

/// Record a config file re-read.
pub fn record_config_reload(ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("gslb_dns.reload.config.count", "outcome" => outcome).increment(1);
}

/// Record a node health transition (true = became healthy).
pub fn record_health_transition(up: bool) {
    let direction = if up { "up" } else { "down" };
    counter!("gslb_dns.health.transition.count", "direction" => direction).increment(1);
}

/// Published zone count.
pub fn record_zone_count(count: usize) {
    gauge!("gslb_dns.state.zones.count").set(count as f64);
}

/// Installed platform count.
pub fn record_platform_count(count: usize) {
    gauge!("gslb_dns.state.platforms.count").set(count as f64);
}

/// Registered health unit count.
pub fn record_health_unit_count(count: usize) {
    gauge!("gslb_dns.state.health_units.count").set(count as f64);
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
