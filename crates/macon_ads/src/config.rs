//! ADS connection settings.

use crate::codec::DEFAULT_STRING_CAPACITY;
use crate::net_id::AmsNetId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default AMS/TCP port of the router.
pub const DEFAULT_TCP_PORT: u16 = 48898;

/// Default AMS port of the first PLC runtime.
pub const DEFAULT_AMS_PORT: u16 = 851;

/// Where and how to reach the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdsConfig {
    /// Host running the AMS router.
    pub host: String,
    /// TCP port of the AMS router.
    pub tcp_port: u16,
    /// AMS net id of the controller.
    pub target_net_id: AmsNetId,
    /// AMS port of the PLC runtime.
    pub target_port: u16,
    /// AMS net id this client presents.
    pub source_net_id: AmsNetId,
    /// AMS port this client presents.
    pub source_port: u16,
    /// Capacity of STRING variables in characters.
    pub string_capacity: usize,
    /// Connect, read and write timeout in milliseconds.
    pub timeout_ms: u64,
}

impl AdsConfig {
    /// Creates a configuration for `host` with default ports and net ids.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Sets the target net id and AMS port.
    pub fn with_target(mut self, net_id: AmsNetId, port: u16) -> Self {
        self.target_net_id = net_id;
        self.target_port = port;
        self
    }

    /// Sets the source net id and AMS port.
    pub fn with_source(mut self, net_id: AmsNetId, port: u16) -> Self {
        self.source_net_id = net_id;
        self.source_port = port;
        self
    }

    /// Sets the router TCP port.
    pub fn with_tcp_port(mut self, port: u16) -> Self {
        self.tcp_port = port;
        self
    }

    /// Sets the I/O timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// The I/O timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            tcp_port: DEFAULT_TCP_PORT,
            target_net_id: AmsNetId::local(),
            target_port: DEFAULT_AMS_PORT,
            source_net_id: AmsNetId::local(),
            source_port: 32905,
            string_capacity: DEFAULT_STRING_CAPACITY,
            timeout_ms: 2000,
        }
    }
}
