//! AMS net ids.

use crate::error::AdsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Six-byte AMS address, written as six dotted decimal octets.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AmsNetId([u8; 6]);

impl AmsNetId {
    /// Creates a net id from raw bytes.
    pub const fn from_bytes(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Net id of the local router, `127.0.0.1.1.1`.
    pub const fn local() -> Self {
        Self([127, 0, 0, 1, 1, 1])
    }

    /// Raw bytes.
    pub const fn bytes(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for AmsNetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a}.{b}.{c}.{d}.{e}.{g}")
    }
}

impl fmt::Debug for AmsNetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AmsNetId({self})")
    }
}

impl FromStr for AmsNetId {
    type Err = AdsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AdsError::InvalidNetId(s.to_string());
        let mut bytes = [0u8; 6];
        let mut parts = s.split('.');
        for byte in &mut bytes {
            *byte = parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(invalid)?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for AmsNetId {
    type Error = AdsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AmsNetId> for String {
    fn from(id: AmsNetId) -> Self {
        id.to_string()
    }
}
