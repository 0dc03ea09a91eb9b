//! Configuration for the sync engine.

use crate::mapping::DomainGroup;
use crate::store::CollectionRef;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where a domain group lives on each side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSettings {
    /// Controller program (object) holding the group's variables.
    pub program: String,
    /// Database holding the group's collection.
    pub database: String,
    /// Collection holding the group's records.
    pub collection: String,
    /// File stem used for backups of the collection.
    pub backup_name: String,
}

impl DomainSettings {
    /// Creates domain settings.
    pub fn new(
        program: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
        backup_name: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            database: database.into(),
            collection: collection.into(),
            backup_name: backup_name.into(),
        }
    }

    /// Fully qualified controller symbol of `variable`.
    pub fn symbol(&self, variable: &str) -> String {
        format!("{}.{}", self.program, variable)
    }

    /// The group's collection.
    pub fn collection_ref(&self) -> CollectionRef {
        CollectionRef::new(&self.database, &self.collection)
    }
}

/// Domain settings for all three groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainTable {
    /// General settings.
    pub general: DomainSettings,
    /// Machine configuration.
    pub machine: DomainSettings,
    /// Material data.
    pub material: DomainSettings,
}

impl DomainTable {
    /// Settings of `group`.
    pub fn get(&self, group: DomainGroup) -> &DomainSettings {
        match group {
            DomainGroup::General => &self.general,
            DomainGroup::Machine => &self.machine,
            DomainGroup::Material => &self.material,
        }
    }
}

impl Default for DomainTable {
    fn default() -> Self {
        Self {
            general: DomainSettings::new(
                "MACONDatabase",
                "MACON_General",
                "GeneralSettings",
                "GeneralSettings",
            ),
            machine: DomainSettings::new(
                "MachineDatabase",
                "MACON_Machine",
                "Machine_Config",
                "MachineConfig",
            ),
            material: DomainSettings::new(
                "Material",
                "MACON_Production",
                "CurrentMaterialData",
                "MaterialData",
            ),
        }
    }
}

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Time between the end of one sweep and the start of the next.
    pub poll_interval: Duration,
    /// Where each group lives.
    pub domains: DomainTable,
    /// Backoff used when re-establishing a lost session.
    pub reconnect: RetryConfig,
}

impl SyncConfig {
    /// Creates a configuration with the default domain table.
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            domains: DomainTable::default(),
            reconnect: RetryConfig::default(),
        }
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the domain table.
    pub fn with_domains(mut self, domains: DomainTable) -> Self {
        self.domains = domains;
        self
    }

    /// Sets the reconnect backoff.
    pub fn with_reconnect(mut self, reconnect: RetryConfig) -> Self {
        self.reconnect = reconnect;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for retry behavior.
///
/// Retries are unlimited; the delay grows exponentially up to `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a retry configuration starting at `initial_delay`.
    pub fn new(initial_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Retries immediately, every time.
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Disables jitter.
    pub fn without_jitter(mut self) -> Self {
        self.add_jitter = false;
        self
    }

    /// Calculates the delay before retry number `attempt` (0 = first try).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let base_delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);

        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            // Add up to 25% jitter
            let jitter = delay_secs * 0.25 * rand::random::<f64>();
            Duration::from_secs_f64(delay_secs + jitter)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}
