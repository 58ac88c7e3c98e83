//! Main configuration: the hot-reloaded JSON document that enumerates
//! platforms and the optional query log.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::GslbError;

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GslbConfig {
    /// Query log settings; absent means query logging is off.
    #[serde(default, rename = "queryLog")]
    pub query_log: Option<QueryLogConfig>,

    /// Platforms by name; each names a zone file and a node file.
    #[serde(default, rename = "platform")]
    pub platforms: HashMap<String, PlatformFiles>,
}

/// Query log file settings.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryLogConfig {
    /// Log file path.
    pub path: String,

    /// Rotate after this many bytes; 0 disables size rotation.
    #[serde(default)]
    pub maxsize: u64,

    /// Rotated files to keep.
    #[serde(default = "default_keep")]
    pub keep: usize,
}

fn default_keep() -> usize {
    1
}

/// The two data files backing one platform.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformFiles {
    /// Zone data file.
    #[serde(rename = "domainFile")]
    pub zone_file: PathBuf,

    /// Node pool file.
    #[serde(rename = "nodeFile")]
    pub node_file: PathBuf,
}

impl GslbConfig {
    /// Read and parse the configuration file.
    pub fn load(path: &Path) -> Result<Self, GslbError> {
        let data = std::fs::read(path)?;
        Self::parse(&data)
    }

    /// Parse a configuration document.
    pub fn parse(data: &[u8]) -> Result<Self, GslbError> {
        serde_json::from_slice(data).map_err(|err| GslbError::ConfigParse(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_parses() {
        let config = GslbConfig::parse(
            br#"{
                "queryLog": { "path": "/var/log/gslb/query.log", "maxsize": 1048576, "keep": 5 },
                "platform": {
                    "svc": { "domainFile": "svc.zone.json", "nodeFile": "svc.nodes.json" }
                }
            }"#,
        )
        .unwrap();

        let qlog = config.query_log.unwrap();
        assert_eq!(qlog.path, "/var/log/gslb/query.log");
        assert_eq!(qlog.maxsize, 1_048_576);
        assert_eq!(qlog.keep, 5);

        let platform = &config.platforms["svc"];
        assert_eq!(platform.zone_file, PathBuf::from("svc.zone.json"));
        assert_eq!(platform.node_file, PathBuf::from("svc.nodes.json"));
    }

    #[test]
    fn query_log_is_optional() {
        let config = GslbConfig::parse(br#"{"platform": {}}"#).unwrap();
        assert!(config.query_log.is_none());
        assert!(config.platforms.is_empty());
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(matches!(
            GslbConfig::parse(b"{oops"),
            Err(GslbError::ConfigParse(_))
        ));
    }
}
