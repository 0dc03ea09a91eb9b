//! Record identifier.

use crate::error::{DocumentError, DocumentResult};
use std::fmt;
use std::str::FromStr;

/// Opaque identity assigned to a record by the document database.
///
/// Record IDs are 12 bytes, rendered as 24 lowercase hex characters. The
/// byte layout is owned by the database; MACON Sync only compares, orders
/// and prints them.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId([u8; 12]);

impl RecordId {
    /// Creates a record ID from raw bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// Renders the ID as 24 lowercase hex characters.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parses an ID from its 24 character hex form.
    pub fn parse_hex(input: &str) -> DocumentResult<Self> {
        if input.len() != 24 || !input.is_ascii() {
            return Err(DocumentError::invalid_record_id(input));
        }

        let mut bytes = [0u8; 12];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&input[i * 2..i * 2 + 2], 16)
                .map_err(|_| DocumentError::invalid_record_id(input))?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.to_hex())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for RecordId {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

impl From<[u8; 12]> for RecordId {
    fn from(bytes: [u8; 12]) -> Self {
        Self::from_bytes(bytes)
    }
}
