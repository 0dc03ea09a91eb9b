//! Reconciliation loop.
//!
//! One sweep visits every domain group in fixed order, fetches the group's
//! current record once, and then decides a direction for every mapped field:
//!
//! 1. No baseline yet: remember both sides, write nothing.
//! 2. The device changed since the baseline: the device wins and its value is
//!    written to the document.
//! 3. Otherwise the document changed: its value is written to the device,
//!    unless the field is protected and the two sides disagree.
//!
//! Field-level failures are logged and counted; the sweep moves on. A failed
//! record fetch skips one group. A lost device session abandons the sweep.

use crate::config::{DomainSettings, SyncConfig};
use crate::device::DeviceInterface;
use crate::error::{SyncError, SyncResult};
use crate::mapping::{DomainGroup, FieldMapping, MappingRegistry};
use crate::schedule::Ticker;
use crate::snapshot::{Snapshot, SnapshotCache};
use crate::store::{DocumentStore, Record};
use macon_document::Value;
use parking_lot::RwLock;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// What happened to one field during a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOutcome {
    /// First observation; baseline recorded.
    Seeded,
    /// Device value written to the document.
    ToDocument,
    /// Document value written to the device.
    ToDevice,
    /// Document edit of the protected field held back.
    Suppressed,
    /// Neither side changed.
    Unchanged,
}

/// Counts for a single sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Fields observed for the first time.
    pub seeded: u64,
    /// Values propagated device to document.
    pub to_document: u64,
    /// Values propagated document to device.
    pub to_device: u64,
    /// Protected writes held back.
    pub suppressed: u64,
    /// Fields skipped after a read or write failure.
    pub field_failures: u64,
    /// Groups skipped because their record could not be fetched.
    pub group_failures: u64,
    /// Duration of the sweep.
    pub duration: Duration,
}

impl SweepReport {
    /// Values propagated in either direction.
    pub fn propagated(&self) -> u64 {
        self.to_document + self.to_device
    }

    /// Returns true if nothing failed.
    pub fn is_clean(&self) -> bool {
        self.field_failures == 0 && self.group_failures == 0
    }

    fn count(&mut self, outcome: FieldOutcome) {
        match outcome {
            FieldOutcome::Seeded => self.seeded += 1,
            FieldOutcome::ToDocument => self.to_document += 1,
            FieldOutcome::ToDevice => self.to_device += 1,
            FieldOutcome::Suppressed => self.suppressed += 1,
            FieldOutcome::Unchanged => {}
        }
    }
}

/// Cumulative statistics across sweeps.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Sweeps started.
    pub sweeps: u64,
    /// Sweeps abandoned after a connectivity failure.
    pub abandoned_sweeps: u64,
    /// Values propagated device to document.
    pub to_document: u64,
    /// Values propagated document to device.
    pub to_device: u64,
    /// Protected writes held back.
    pub suppressed: u64,
    /// Field-level failures.
    pub field_failures: u64,
    /// Group-level failures.
    pub group_failures: u64,
    /// Time the last sweep finished.
    pub last_sweep_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Keeps the device and the document store consistent.
///
/// The reconciler owns the snapshot cache; baselines live exactly as long as
/// the reconciler does.
pub struct Reconciler<D: DeviceInterface, S: DocumentStore> {
    config: SyncConfig,
    registry: MappingRegistry,
    device: D,
    store: S,
    cache: RwLock<SnapshotCache>,
    stats: RwLock<SyncStats>,
}

impl<D: DeviceInterface, S: DocumentStore> Reconciler<D, S> {
    /// Creates a reconciler with an empty snapshot cache.
    pub fn new(config: SyncConfig, registry: MappingRegistry, device: D, store: S) -> Self {
        Self {
            config,
            registry,
            device,
            store,
            cache: RwLock::new(SnapshotCache::new()),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Gets the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Gets the mapping registry.
    pub fn registry(&self) -> &MappingRegistry {
        &self.registry
    }

    /// Gets the device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Gets the document store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Gets a copy of the snapshot cache.
    pub fn cache(&self) -> SnapshotCache {
        self.cache.read().clone()
    }

    /// Gets the baseline of one field.
    pub fn snapshot(&self, group: DomainGroup, variable: &str) -> Option<Snapshot> {
        self.cache.read().get(group, variable).cloned()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Sweeps until `ticker` says stop. Runs at least one sweep.
    pub fn run(&self, ticker: &mut impl Ticker) -> SyncStats {
        info!(
            fields = self.registry.len(),
            poll_interval_ms = u64::try_from(self.config.poll_interval.as_millis()).unwrap_or(u64::MAX),
            "reconciliation loop started"
        );

        loop {
            if let Err(e) = self.sweep() {
                error!(error = %e, "sweep abandoned");
            }
            if !ticker.tick() {
                break;
            }
        }

        let stats = self.stats();
        info!(sweeps = stats.sweeps, "reconciliation loop stopped");
        stats
    }

    /// Runs one sweep over every group.
    ///
    /// Only a connectivity failure is returned as an error; everything else
    /// is counted in the report.
    pub fn sweep(&self) -> SyncResult<SweepReport> {
        let start = Instant::now();
        let mut report = SweepReport::default();

        let result = self.sweep_groups(&mut report);
        report.duration = start.elapsed();

        let mut stats = self.stats.write();
        stats.sweeps += 1;
        stats.to_document += report.to_document;
        stats.to_device += report.to_device;
        stats.suppressed += report.suppressed;
        stats.field_failures += report.field_failures;
        stats.group_failures += report.group_failures;
        stats.last_sweep_time = Some(Instant::now());

        match result {
            Ok(()) => Ok(report),
            Err(e) => {
                stats.abandoned_sweeps += 1;
                stats.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn sweep_groups(&self, report: &mut SweepReport) -> SyncResult<()> {
        for group in DomainGroup::ALL {
            let fields = self.registry.fields_for(group);
            if fields.is_empty() {
                continue;
            }
            let settings = self.config.domains.get(group);

            let record = match self.fetch_record(group, settings) {
                Ok(record) => record,
                Err(e) => {
                    warn!(group = %group, error = %e, "group skipped");
                    report.group_failures += 1;
                    self.stats.write().last_error = Some(e.to_string());
                    continue;
                }
            };

            for field in fields {
                match self.reconcile_field(settings, &record, field) {
                    Ok(outcome) => report.count(outcome),
                    Err(e) if e.is_connectivity() => return Err(e),
                    Err(e) => {
                        warn!(
                            group = %group,
                            variable = %field.device_variable,
                            error = %e,
                            "field skipped"
                        );
                        report.field_failures += 1;
                        self.stats.write().last_error = Some(e.to_string());
                    }
                }
            }
        }
        Ok(())
    }

    fn fetch_record(&self, group: DomainGroup, settings: &DomainSettings) -> SyncResult<Record> {
        let collection = settings.collection_ref();
        match self.store.latest(&collection) {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(SyncError::record_fetch(
                group,
                format!("{collection} is empty"),
            )),
            Err(e) => Err(SyncError::record_fetch(group, e)),
        }
    }

    fn reconcile_field(
        &self,
        settings: &DomainSettings,
        record: &Record,
        field: &FieldMapping,
    ) -> SyncResult<FieldOutcome> {
        let group = field.group;
        let variable = field.device_variable.as_str();
        let symbol = settings.symbol(variable);

        let device_value = self
            .device
            .read(&symbol, field.value_type)
            .map_err(|e| SyncError::device_read(group, variable, e))?;
        let document_value = record.get(&field.document_path).cloned();

        let baseline = self.cache.read().get(group, variable).cloned();
        let Some(baseline) = baseline else {
            debug!(
                group = %group,
                variable,
                device = %device_value,
                document = ?document_value,
                "baseline recorded"
            );
            self.cache
                .write()
                .seed(group, variable, device_value, document_value);
            return Ok(FieldOutcome::Seeded);
        };

        if device_value != baseline.device {
            self.store
                .update_field(
                    &settings.collection_ref(),
                    record.id(),
                    &field.document_path,
                    &device_value,
                )
                .map_err(|e| SyncError::field_write(group, variable, e))?;
            info!(group = %group, variable, value = %device_value, "device -> document");
            self.cache.write().record(group, variable, device_value);
            return Ok(FieldOutcome::ToDocument);
        }

        if document_value == baseline.document {
            return Ok(FieldOutcome::Unchanged);
        }

        if field.protected && document_value.as_ref() != Some(&device_value) {
            info!(
                group = %group,
                variable,
                device = %device_value,
                document = ?document_value,
                "protected field, document edit not applied"
            );
            return Ok(FieldOutcome::Suppressed);
        }

        let Some(document_value) = document_value else {
            return Err(SyncError::field_write(
                group,
                variable,
                format!("{} is missing from the document", field.document_path),
            ));
        };

        self.device
            .write(&symbol, &document_value, field.value_type)
            .map_err(|e| SyncError::device_write(group, variable, e))?;
        info!(group = %group, variable, value = %document_value, "document -> device");

        let device_side = field
            .value_type
            .coerce(&document_value)
            .unwrap_or_else(|| document_value.clone());
        self.cache.write().set(
            group,
            variable,
            Snapshot {
                device: device_side,
                document: Some(document_value),
            },
        );
        Ok(FieldOutcome::ToDevice)
    }
}
