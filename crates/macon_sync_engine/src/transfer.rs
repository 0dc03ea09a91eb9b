//! One-shot bulk transfers between the document store and the device.

use crate::config::DomainTable;
use crate::device::DeviceInterface;
use crate::error::{SyncError, SyncResult};
use crate::mapping::{DomainGroup, MappingRegistry};
use crate::store::{DocumentStore, Record};
use macon_document::Value;
use tracing::{debug, info, warn};

/// Result of transferring one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldTransfer {
    /// The value was copied.
    Transferred(Value),
    /// The source had no value; nothing was written.
    Missing,
    /// Reading or writing failed.
    Failed(String),
}

/// Per-field results of a push or pull of one group.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReport {
    /// The group transferred.
    pub group: DomainGroup,
    /// One entry per mapped field, in registry order.
    pub fields: Vec<(String, FieldTransfer)>,
}

impl TransferReport {
    fn new(group: DomainGroup) -> Self {
        Self {
            group,
            fields: Vec::new(),
        }
    }

    /// Number of fields copied.
    pub fn transferred(&self) -> usize {
        self.count(|t| matches!(t, FieldTransfer::Transferred(_)))
    }

    /// Number of fields the source did not have.
    pub fn missing(&self) -> usize {
        self.count(|t| matches!(t, FieldTransfer::Missing))
    }

    /// Number of fields that failed.
    pub fn failed(&self) -> usize {
        self.count(|t| matches!(t, FieldTransfer::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&FieldTransfer) -> bool) -> usize {
        self.fields.iter().filter(|(_, t)| pred(t)).count()
    }
}

/// Results of a push or pull over all groups.
#[derive(Debug, Default)]
pub struct TransferSummary {
    /// Groups that were transferred, in sweep order.
    pub reports: Vec<TransferReport>,
    /// Groups that could not be transferred at all.
    pub failures: Vec<(DomainGroup, SyncError)>,
}

impl TransferSummary {
    /// Returns true if every group was transferred.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Push and pull built on the mapping registry.
pub struct BulkTransfer<'a, D: DeviceInterface, S: DocumentStore> {
    device: &'a D,
    store: &'a S,
    registry: &'a MappingRegistry,
    domains: &'a DomainTable,
}

impl<'a, D: DeviceInterface, S: DocumentStore> BulkTransfer<'a, D, S> {
    /// Creates a bulk transfer over the given collaborators.
    pub fn new(
        device: &'a D,
        store: &'a S,
        registry: &'a MappingRegistry,
        domains: &'a DomainTable,
    ) -> Self {
        Self {
            device,
            store,
            registry,
            domains,
        }
    }

    /// Copies every mapped value of the group's current record to the device.
    ///
    /// Paths absent from the record are skipped. Field failures are recorded
    /// and never stop the push.
    pub fn push(&self, group: DomainGroup) -> SyncResult<TransferReport> {
        let settings = self.domains.get(group);
        let record = self.fetch(group)?;
        let mut report = TransferReport::new(group);

        for field in self.registry.fields_for(group) {
            let variable = field.device_variable.as_str();
            let outcome = match record.get(&field.document_path) {
                None => {
                    debug!(group = %group, variable, path = %field.document_path, "not in document");
                    FieldTransfer::Missing
                }
                Some(value) => {
                    match self
                        .device
                        .write(&settings.symbol(variable), value, field.value_type)
                    {
                        Ok(()) => {
                            info!(group = %group, variable, value = %value, "pushed");
                            FieldTransfer::Transferred(value.clone())
                        }
                        Err(e) => {
                            warn!(group = %group, variable, error = %e, "push failed");
                            FieldTransfer::Failed(e.to_string())
                        }
                    }
                }
            };
            report.fields.push((variable.to_string(), outcome));
        }

        Ok(report)
    }

    /// Reads every mapped variable into the group's current record.
    ///
    /// Only mapped paths whose stored value differs are written, all in one
    /// update; the rest of the record is left as stored. A failed read
    /// leaves its path unmodified.
    pub fn pull(&self, group: DomainGroup) -> SyncResult<TransferReport> {
        let settings = self.domains.get(group);
        let record = self.fetch(group)?;
        let mut report = TransferReport::new(group);
        let mut changed = Vec::new();

        for field in self.registry.fields_for(group) {
            let variable = field.device_variable.as_str();
            let outcome = match self.device.read(&settings.symbol(variable), field.value_type) {
                Ok(value) => {
                    info!(group = %group, variable, value = %value, "pulled");
                    if record.get(&field.document_path) != Some(&value) {
                        changed.push((field.document_path.clone(), value.clone()));
                    }
                    FieldTransfer::Transferred(value)
                }
                Err(e) => {
                    warn!(group = %group, variable, error = %e, "pull failed");
                    FieldTransfer::Failed(e.to_string())
                }
            };
            report.fields.push((variable.to_string(), outcome));
        }

        if !changed.is_empty() {
            self.store
                .update_fields(&settings.collection_ref(), record.id(), &changed)
                .map_err(|e| SyncError::record_write(group, e))?;
            debug!(group = %group, paths = changed.len(), "record updated");
        }
        Ok(report)
    }

    /// Pushes every group in order, continuing past failed groups.
    pub fn push_all(&self) -> TransferSummary {
        self.for_each_group("push", |group| self.push(group))
    }

    /// Pulls every group in order, continuing past failed groups.
    pub fn pull_all(&self) -> TransferSummary {
        self.for_each_group("pull", |group| self.pull(group))
    }

    fn for_each_group(
        &self,
        operation: &str,
        run: impl Fn(DomainGroup) -> SyncResult<TransferReport>,
    ) -> TransferSummary {
        let mut summary = TransferSummary::default();
        for group in DomainGroup::ALL {
            match run(group) {
                Ok(report) => {
                    info!(
                        group = %group,
                        transferred = report.transferred(),
                        missing = report.missing(),
                        failed = report.failed(),
                        "{operation} finished"
                    );
                    summary.reports.push(report);
                }
                Err(e) => {
                    warn!(group = %group, error = %e, "{operation} skipped group");
                    summary.failures.push((group, e));
                }
            }
        }
        summary
    }

    fn fetch(&self, group: DomainGroup) -> SyncResult<Record> {
        let collection = self.domains.get(group).collection_ref();
        match self.store.latest(&collection) {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(SyncError::record_fetch(
                group,
                format!("{collection} is empty"),
            )),
            Err(e) => Err(SyncError::record_fetch(group, e)),
        }
    }
}
