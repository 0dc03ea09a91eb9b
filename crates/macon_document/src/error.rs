//! Error types for the document crate.

use thiserror::Error;

/// Result type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors that can occur while building document values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// A record identity string was not 24 hex characters.
    #[error("invalid record id: {input:?}")]
    InvalidRecordId {
        /// The rejected input.
        input: String,
    },
}

impl DocumentError {
    /// Create an invalid record id error.
    pub fn invalid_record_id(input: impl Into<String>) -> Self {
        Self::InvalidRecordId {
            input: input.into(),
        }
    }
}
