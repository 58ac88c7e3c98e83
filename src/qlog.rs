//! Query logging: one JSON line per query, written off the hot path
//! through a non-blocking writer into a size-rotated file.

use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use serde::Serialize;
use std::io::Write;
use tracing::debug;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};

use crate::config::QueryLogConfig;
use crate::error::GslbError;

/// One logged query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryLogEntry {
    /// Unix timestamp, nanoseconds.
    pub time: i64,
    /// Zone origin that answered.
    pub origin: String,
    /// Query name as received.
    pub name: String,
    /// Query type mnemonic.
    pub qtype: String,
    /// Socket remote address.
    pub remote_addr: String,
    /// Effective client address with source netmask (`ip/bits`).
    pub client_addr: String,
    /// First dotted label of the query name.
    pub label: String,
    /// Final response code mnemonic.
    pub rcode: String,
    /// Number of answer records.
    pub answers: usize,
    /// Whether an EDNS client subnet option was present.
    pub has_ecs: bool,
}

/// Handle to the query log writer.
///
/// Cloning is cheap; the worker guard must stay alive for the lifetime of
/// the process, so the owning side keeps it.
pub struct QueryLogger {
    writer: NonBlocking,
    _guard: WorkerGuard,
}

impl QueryLogger {
    /// Open (or create) the log file with rotation per the config.
    pub fn new(config: &QueryLogConfig) -> Result<Self, GslbError> {
        let mut condition = RollingConditionBasic::new();
        if config.maxsize > 0 {
            condition = condition.max_size(config.maxsize);
        }

        let appender = BasicRollingFileAppender::new(&config.path, condition, config.keep)
            .map_err(GslbError::Io)?;
        let (writer, guard) = tracing_appender::non_blocking(appender);

        Ok(Self {
            writer,
            _guard: guard,
        })
    }

    /// Append one entry; failures are logged and swallowed, a query log
    /// must never fail a query.
    pub fn write(&self, entry: &QueryLogEntry) {
        let mut line = match serde_json::to_vec(entry) {
            Ok(line) => line,
            Err(err) => {
                debug!(%err, "failed to serialize query log entry");
                return;
            }
        };
        line.push(b'\n');

        let mut writer = self.writer.clone();
        if let Err(err) = writer.write_all(&line) {
            debug!(%err, "failed to write query log entry");
        }
    }
}
