//! # MACON Sync Engine
//!
//! Bidirectional reconciliation between controller variables and document
//! database records.
//!
//! This crate provides:
//! - Field mapping registry (data-driven, validated at load time)
//! - Snapshot cache of the last value seen on each side
//! - Reconciliation loop with the protected-field rule
//! - Bulk push, pull and export
//! - Device and document store abstractions with in-memory implementations
//!
//! ## Architecture
//!
//! The engine polls. Each sweep walks the domain groups in fixed order
//! (general, machine, material), fetches each group's newest record once and
//! compares every mapped field against its cached baseline:
//!
//! 1. First observation seeds the baseline without writing anything
//! 2. A device change wins and is written to the document
//! 3. A document change is written to the device
//!
//! ## Key Invariants
//!
//! - A value is never propagated on first observation
//! - The device has priority when both sides changed
//! - The protected field is never overwritten from the document side while
//!   the two sides disagree
//! - One failing field never stops the others

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod device;
mod error;
mod export;
mod mapping;
mod reconcile;
mod schedule;
mod snapshot;
mod store;
mod transfer;

pub use config::{DomainSettings, DomainTable, RetryConfig, SyncConfig};
pub use device::{DeviceInterface, MemoryDevice};
pub use error::{DeviceError, DeviceResult, MappingError, StoreError, StoreResult, SyncError, SyncResult};
pub use export::{backup_path, backup_timestamp, export_all, export_collection, BACKUP_TIMESTAMP_FORMAT};
pub use mapping::{DomainGroup, FieldMapping, MappingRegistry, ValueType};
pub use reconcile::{FieldOutcome, Reconciler, SweepReport, SyncStats};
pub use schedule::{CountdownTicker, IntervalTicker, Ticker};
pub use snapshot::{FieldKey, Snapshot, SnapshotCache};
pub use store::{CollectionRef, DocumentStore, MemoryStore, Record, ID_FIELD};
pub use transfer::{BulkTransfer, FieldTransfer, TransferReport, TransferSummary};
