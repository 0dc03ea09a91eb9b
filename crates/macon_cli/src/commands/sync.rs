//! Sync command: the reconciliation loop.

use macon_sync_engine::{
    DeviceInterface, DocumentStore, MappingRegistry, Reconciler, SyncConfig, SyncStats, Ticker,
};
use tracing::info;

/// Runs the reconciliation loop until `ticker` stops it.
///
/// With an [`IntervalTicker`](macon_sync_engine::IntervalTicker) this never
/// returns; the process is stopped externally.
pub fn run<D: DeviceInterface, S: DocumentStore>(
    config: SyncConfig,
    registry: MappingRegistry,
    device: D,
    store: S,
    ticker: &mut impl Ticker,
) -> SyncStats {
    info!("MACON Sync started");
    println!("✓ MACON Sync started, polling every {:?}", config.poll_interval);
    Reconciler::new(config, registry, device, store).run(ticker)
}
