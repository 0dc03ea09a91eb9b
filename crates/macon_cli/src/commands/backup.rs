//! Backup command.

use crate::error::CliResult;
use macon_sync_engine::{backup_timestamp, export_all, DocumentStore, DomainTable};
use std::path::{Path, PathBuf};
use tracing::info;

/// Exports the three collections to timestamped JSON files in `dir`.
pub fn run<S: DocumentStore>(store: &S, domains: &DomainTable, dir: &Path) -> CliResult<Vec<PathBuf>> {
    info!("Creating backup in {:?}", dir);
    let files = export_all(store, domains, dir, &backup_timestamp())?;

    println!("✓ Backup saved in {}", dir.display());
    for file in &files {
        println!("  {}", file.display());
    }
    Ok(files)
}
