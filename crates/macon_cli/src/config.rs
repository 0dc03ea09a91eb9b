//! Application configuration.
//!
//! Every setting has a default, so the configuration file is optional and
//! may list only the keys that differ.
//!
//! ```json
//! {
//!   "device": { "host": "192.168.1.10", "target_net_id": "5.12.34.56.1.1" },
//!   "mongo_uri": "mongodb://localhost:27017/?serverSelectionTimeoutMS=5000",
//!   "backup_dir": "C:\\MACON\\Backups"
//! }
//! ```

use crate::error::{CliError, CliResult};
use macon_ads::AdsConfig;
use macon_sync_engine::{DomainTable, MappingRegistry, RetryConfig, SyncConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Controller connection.
    pub device: AdsConfig,
    /// Document database connection string.
    pub mongo_uri: String,
    /// Directory receiving backup files.
    pub backup_dir: PathBuf,
    /// Directory receiving log files.
    pub log_dir: PathBuf,
    /// Pause between sweeps.
    pub poll_interval_ms: u64,
    /// First delay before reconnecting to the controller.
    pub reconnect_initial_ms: u64,
    /// Longest delay between reconnect attempts.
    pub reconnect_max_ms: u64,
    /// Mapping table file; the built-in table when absent.
    pub mappings: Option<PathBuf>,
    /// Where each group lives on the controller and in the database.
    pub domains: DomainTable,
}

impl AppConfig {
    /// Loads the configuration file, or the defaults when there is none.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| CliError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies command-line overrides.
    pub fn with_overrides(
        mut self,
        log_dir: Option<PathBuf>,
        backup_dir: Option<PathBuf>,
        mappings: Option<PathBuf>,
    ) -> Self {
        if let Some(dir) = log_dir {
            self.log_dir = dir;
        }
        if let Some(dir) = backup_dir {
            self.backup_dir = dir;
        }
        if mappings.is_some() {
            self.mappings = mappings;
        }
        self
    }

    /// Loads and validates the mapping table.
    pub fn registry(&self) -> CliResult<MappingRegistry> {
        let registry = match &self.mappings {
            Some(path) => MappingRegistry::from_path(path)?,
            None => MappingRegistry::builtin()?,
        };
        Ok(registry)
    }

    /// Backoff for controller reconnects.
    pub fn reconnect(&self) -> RetryConfig {
        RetryConfig::new(Duration::from_millis(self.reconnect_initial_ms))
            .with_max_delay(Duration::from_millis(self.reconnect_max_ms))
    }

    /// Pause between sweeps.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Engine configuration.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::new()
            .with_poll_interval(self.poll_interval())
            .with_domains(self.domains.clone())
            .with_reconnect(self.reconnect())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device: AdsConfig::default(),
            mongo_uri: "mongodb://localhost:27017".into(),
            backup_dir: PathBuf::from("backups"),
            log_dir: PathBuf::from("logs"),
            poll_interval_ms: 1000,
            reconnect_initial_ms: 1000,
            reconnect_max_ms: 30_000,
            mappings: None,
            domains: DomainTable::default(),
        }
    }
}
