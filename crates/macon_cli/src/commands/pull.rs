//! Pull command: controller to database.

use super::print_progress;
use macon_sync_engine::{
    BulkTransfer, DeviceInterface, DocumentStore, DomainTable, MappingRegistry, TransferSummary,
};
use tracing::info;

/// Reads every mapped variable into the current records.
pub fn run<D: DeviceInterface, S: DocumentStore>(
    device: &D,
    store: &S,
    registry: &MappingRegistry,
    domains: &DomainTable,
) -> TransferSummary {
    info!("Pulling controller values into the database");
    let summary = BulkTransfer::new(device, store, registry, domains).pull_all();
    print_progress("←", domains, &summary);

    let read: usize = summary.reports.iter().map(|r| r.transferred()).sum();
    println!("✓ Database updated from controller ({read} values read)");
    summary
}
