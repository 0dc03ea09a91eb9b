//! Push command: database to controller.

use super::print_progress;
use macon_sync_engine::{
    BulkTransfer, DeviceInterface, DocumentStore, DomainTable, MappingRegistry, TransferSummary,
};
use tracing::info;

/// Writes every mapped value of the current records to the controller.
pub fn run<D: DeviceInterface, S: DocumentStore>(
    device: &D,
    store: &S,
    registry: &MappingRegistry,
    domains: &DomainTable,
) -> TransferSummary {
    info!("Pushing current records to the controller");
    let summary = BulkTransfer::new(device, store, registry, domains).push_all();
    print_progress("→", domains, &summary);

    let written: usize = summary.reports.iter().map(|r| r.transferred()).sum();
    println!("✓ Controller updated from database ({written} values written)");
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{ensure_complete, testing::plant};
    use macon_document::Value;
    use macon_sync_engine::DomainGroup;

    #[test]
    fn writes_document_values() {
        let (device, store, registry, domains) = plant();
        store.edit_latest(
            &domains.general.collection_ref(),
            "appName",
            Value::from("MACON"),
        );

        let summary = run(&device, &store, &registry, &domains);
        assert!(ensure_complete("push", &summary).is_ok());
        assert_eq!(
            device.value("MACONDatabase.sAppName"),
            Some(Value::from("MACON"))
        );
        assert_eq!(summary.reports[0].transferred(), 1);
    }

    #[test]
    fn missing_record_skips_the_group() {
        let (device, store, registry, domains) = plant();
        store.set_unavailable(&domains.machine.collection_ref(), true);

        let summary = run(&device, &store, &registry, &domains);
        assert_eq!(summary.reports.len(), 2);
        assert_eq!(summary.failures[0].0, DomainGroup::Machine);
        assert!(ensure_complete("push", &summary).is_err());
    }
}
