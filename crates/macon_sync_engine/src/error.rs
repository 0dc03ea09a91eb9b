//! Error types for the sync engine.

use crate::mapping::{DomainGroup, ValueType};
use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Result type for document store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the engine.
///
/// Field-level errors (`FieldRead`, `FieldWrite`) are recovered inside a
/// sweep. `RecordFetch` skips one domain group for one sweep. `Connectivity`
/// abandons the rest of a sweep; the next scheduled sweep tries again.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Reading a field from the device or the document failed.
    #[error("failed to read {group}/{variable}: {message}")]
    FieldRead {
        /// Domain group of the field.
        group: DomainGroup,
        /// Device variable of the field.
        variable: String,
        /// Error message.
        message: String,
    },

    /// Writing a field to the device or the document failed.
    #[error("failed to write {group}/{variable}: {message}")]
    FieldWrite {
        /// Domain group of the field.
        group: DomainGroup,
        /// Device variable of the field.
        variable: String,
        /// Error message.
        message: String,
    },

    /// The current record of a domain group could not be fetched.
    #[error("no current record for {group}: {message}")]
    RecordFetch {
        /// Domain group whose record is unavailable.
        group: DomainGroup,
        /// Error message.
        message: String,
    },

    /// A whole record could not be written back.
    #[error("failed to store record for {group}: {message}")]
    RecordWrite {
        /// Domain group whose record was rejected.
        group: DomainGroup,
        /// Error message.
        message: String,
    },

    /// Session-level failure talking to the device or the store.
    #[error("connectivity failure: {0}")]
    Connectivity(String),

    /// The field mapping table is invalid.
    #[error("invalid field mapping: {0}")]
    Mapping(#[from] MappingError),

    /// Filesystem error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Creates a field read error.
    pub fn field_read(group: DomainGroup, variable: &str, message: impl Display) -> Self {
        Self::FieldRead {
            group,
            variable: variable.to_string(),
            message: message.to_string(),
        }
    }

    /// Creates a field write error.
    pub fn field_write(group: DomainGroup, variable: &str, message: impl Display) -> Self {
        Self::FieldWrite {
            group,
            variable: variable.to_string(),
            message: message.to_string(),
        }
    }

    /// Creates a record fetch error.
    pub fn record_fetch(group: DomainGroup, message: impl Display) -> Self {
        Self::RecordFetch {
            group,
            message: message.to_string(),
        }
    }

    /// Creates a record write error.
    pub fn record_write(group: DomainGroup, message: impl Display) -> Self {
        Self::RecordWrite {
            group,
            message: message.to_string(),
        }
    }

    /// Maps a device read failure, keeping connectivity failures distinct.
    pub fn device_read(group: DomainGroup, variable: &str, error: DeviceError) -> Self {
        if error.is_connectivity() {
            Self::Connectivity(error.to_string())
        } else {
            Self::field_read(group, variable, error)
        }
    }

    /// Maps a device write failure, keeping connectivity failures distinct.
    pub fn device_write(group: DomainGroup, variable: &str, error: DeviceError) -> Self {
        if error.is_connectivity() {
            Self::Connectivity(error.to_string())
        } else {
            Self::field_write(group, variable, error)
        }
    }

    /// Returns true for errors confined to a single field.
    pub fn is_field_level(&self) -> bool {
        matches!(self, SyncError::FieldRead { .. } | SyncError::FieldWrite { .. })
    }

    /// Returns true for session-level failures.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, SyncError::Connectivity(_))
    }
}

/// Errors raised by a [`DeviceInterface`](crate::DeviceInterface).
#[derive(Error, Debug)]
pub enum DeviceError {
    /// No session to the device.
    #[error("not connected to device")]
    NotConnected,

    /// The session broke while a request was in flight.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// The device does not know the symbol.
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    /// The device answered with an error status.
    #[error("device error {code:#06x}: {message}")]
    Status {
        /// Device status code.
        code: u32,
        /// Description of the status.
        message: String,
    },

    /// A value does not fit the declared type.
    #[error("type mismatch for {symbol}: expected {expected}, got {found}")]
    TypeMismatch {
        /// Symbol being read or written.
        symbol: String,
        /// Declared type.
        expected: ValueType,
        /// What was found instead.
        found: String,
    },

    /// Malformed or unexpected response.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Socket error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeviceError {
    /// Creates a device status error.
    pub fn status(code: u32, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(symbol: &str, expected: ValueType, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            symbol: symbol.to_string(),
            expected,
            found: found.into(),
        }
    }

    /// Returns true if the session itself is unusable.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            DeviceError::NotConnected | DeviceError::ConnectionLost(_) | DeviceError::Io(_)
        )
    }
}

/// Errors raised by a [`DocumentStore`](crate::DocumentStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store cannot be reached.
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    /// A stored document has no identity field.
    #[error("document in {collection} has no _id")]
    MissingIdentity {
        /// Collection holding the document.
        collection: String,
    },

    /// The record addressed by an update does not exist.
    #[error("record {id} not found in {collection}")]
    RecordNotFound {
        /// Collection searched.
        collection: String,
        /// Identity searched for.
        id: String,
    },

    /// Any other driver failure.
    #[error("document store error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns true if the store itself is unreachable.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Errors found while loading or validating a mapping table.
#[derive(Error, Debug)]
pub enum MappingError {
    /// The table is not valid JSON or does not have the expected shape.
    #[error("mapping table is malformed: {0}")]
    Parse(#[from] serde_json::Error),

    /// The table file could not be read.
    #[error("cannot read mapping table {path:?}: {source}")]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A device variable appears twice in one group.
    #[error("duplicate device variable {variable} in group {group}")]
    DuplicateVariable {
        /// Group containing the duplicate.
        group: DomainGroup,
        /// The repeated variable.
        variable: String,
    },

    /// A group has no fields.
    #[error("group {0} declares no fields")]
    EmptyGroup(DomainGroup),

    /// A field has an empty device variable or document path.
    #[error("field {variable:?} in group {group} has an empty device variable or document path")]
    EmptyField {
        /// Group containing the field.
        group: DomainGroup,
        /// Device variable of the field (may be empty).
        variable: String,
    },

    /// More than one field is marked protected.
    #[error("more than one protected field: {first} and {second}")]
    MultipleProtected {
        /// First protected field.
        first: String,
        /// Second protected field.
        second: String,
    },
}
