//! Error types for gslb-dns.

use thiserror::Error;

/// Errors that can occur while loading data or serving queries.
#[derive(Debug, Error)]
pub enum GslbError {
    /// IO error (network, file, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed main configuration file
    #[error("invalid configuration: {0}")]
    ConfigParse(String),

    /// Malformed zone data file
    #[error("zone '{zone}': {reason}")]
    ZoneParse {
        /// Zone (platform) name the file belongs to.
        zone: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Malformed platform node file
    #[error("platform '{platform}': {reason}")]
    NodeParse {
        /// Platform name the file belongs to.
        platform: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Health check type other than `tcp`
    #[error("health check type '{0}' not supported")]
    UnsupportedHealthCheck(String),

    /// DNS protocol error
    #[error("DNS protocol error: {0}")]
    Proto(#[from] hickory_proto::ProtoError),
}

impl GslbError {
    /// Shorthand for a zone parse failure.
    pub fn zone(zone: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ZoneParse {
            zone: zone.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a node file parse failure.
    pub fn node(platform: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NodeParse {
            platform: platform.into(),
            reason: reason.into(),
        }
    }
}
