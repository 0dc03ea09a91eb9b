//! Error types for the command-line entry point.

use macon_ads::AdsError;
use macon_sync_engine::{MappingError, StoreError, SyncError};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that end the process.
#[derive(Error, Debug)]
pub enum CliError {
    /// The configuration file could not be read.
    #[error("cannot read configuration {path:?}: {source}")]
    ConfigRead {
        /// Configuration file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The configuration file is not valid.
    #[error("invalid configuration {path:?}: {source}")]
    ConfigParse {
        /// Configuration file.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// The mapping table did not load.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// The device session could not be opened.
    #[error("cannot open device session: {0}")]
    Device(#[from] AdsError),

    /// The document store session could not be opened.
    #[error("cannot open document store session: {0}")]
    Store(#[from] StoreError),

    /// A bulk operation failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Some groups could not be transferred at all.
    #[error("{operation} skipped {groups} of 3 groups")]
    Incomplete {
        /// Operation name.
        operation: &'static str,
        /// Number of skipped groups.
        groups: usize,
    },

    /// Logging could not be set up.
    #[error("cannot set up logging: {0}")]
    Logging(String),
}
