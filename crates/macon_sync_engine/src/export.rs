//! Collection export.
//!
//! Every document of each group's collection is written to one indented JSON
//! array file named `<backup name>_<timestamp>.json`. Record identities are
//! rendered as hex strings at any depth.

use crate::config::{DomainSettings, DomainTable};
use crate::error::{SyncError, SyncResult};
use crate::mapping::DomainGroup;
use crate::store::DocumentStore;
use macon_document::{stringify_ids, to_json};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// `chrono` format of the timestamp in backup file names.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Current local time formatted for backup file names.
pub fn backup_timestamp() -> String {
    chrono::Local::now().format(BACKUP_TIMESTAMP_FORMAT).to_string()
}

/// Path of the backup file for `settings` taken at `stamp`.
pub fn backup_path(dir: &Path, settings: &DomainSettings, stamp: &str) -> PathBuf {
    dir.join(format!("{}_{}.json", settings.backup_name, stamp))
}

/// Exports one group's collection. Returns the written file.
pub fn export_collection<S: DocumentStore>(
    store: &S,
    group: DomainGroup,
    settings: &DomainSettings,
    dir: &Path,
    stamp: &str,
) -> SyncResult<PathBuf> {
    let collection = settings.collection_ref();
    let documents = store
        .all(&collection)
        .map_err(|e| SyncError::record_fetch(group, e))?;

    let count = documents.len();
    let array: Vec<serde_json::Value> = documents
        .into_iter()
        .map(|doc| to_json(&stringify_ids(doc)))
        .collect();

    let path = backup_path(dir, settings, stamp);
    let mut file = fs::File::create(&path)?;
    serde_json::to_writer_pretty(&mut file, &array)?;
    file.write_all(b"\n")?;
    file.sync_all()?;

    info!(group = %group, collection = %collection, documents = count, path = ?path, "exported");
    Ok(path)
}

/// Exports all three collections into `dir`, creating it if needed.
///
/// Stops at the first collection that cannot be exported.
pub fn export_all<S: DocumentStore>(
    store: &S,
    domains: &DomainTable,
    dir: &Path,
    stamp: &str,
) -> SyncResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    DomainGroup::ALL
        .into_iter()
        .map(|group| export_collection(store, group, domains.get(group), dir, stamp))
        .collect()
}
