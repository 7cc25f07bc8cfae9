//! Configuration for the Signet relay.
//!
//! Resolution order, lowest to highest priority:
//! 1. Built-in defaults
//! 2. Config file (JSON, passed via `--config`)
//! 3. Environment variables / CLI arguments (applied by the binary)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Complete relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub host: HostConfig,
}

/// Relay daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Unix socket path the front-end listener binds.
    pub socket_path: Option<PathBuf>,
    /// Log level: "error", "info" or "debug".
    pub log_level: String,
    /// Emit JSON log lines instead of the human-readable format.
    pub log_json: bool,
    /// Maximum accepted NDJSON line length on the front-end transport.
    pub max_line_bytes: usize,
    /// Approval cache time-to-live in seconds.
    pub approval_ttl_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            log_level: "error".to_string(),
            log_json: false,
            max_line_bytes: 1024 * 1024, // 1 MiB
            approval_ttl_secs: 24 * 60 * 60,
        }
    }
}

/// Native host connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Command used to spawn the native host, one process per channel.
    pub command: Option<PathBuf>,
    /// Arguments passed to the host command.
    pub args: Vec<String>,
    /// Acknowledge each non-terminal fragment with a `get_part` control
    /// message (transport variant B). Leave off for hosts whose transport
    /// has native backpressure.
    pub fragment_ack: bool,
    /// Capacity of the outbound per-channel message queue.
    pub channel_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            fragment_ack: false,
            channel_capacity: 64,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Load from a file when a path is given, otherwise built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.relay.log_level, "error");
        assert_eq!(config.relay.approval_ttl_secs, 24 * 60 * 60);
        assert!(!config.host.fragment_ack);
        assert!(config.host.command.is_none());
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"relay": {{"socket_path": "/tmp/s.sock", "log_level": "debug",
                 "log_json": false, "max_line_bytes": 4096, "approval_ttl_secs": 60}}}}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.relay.log_level, "debug");
        assert_eq!(config.relay.approval_ttl_secs, 60);
        // host section absent -> defaults
        assert_eq!(config.host.channel_capacity, 64);
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let err = Config::load(Path::new("/nonexistent/signet.json")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn load_or_default_without_path() {
        let config = Config::load_or_default(None).unwrap();
        assert_eq!(config.relay.log_level, "error");
    }
}
