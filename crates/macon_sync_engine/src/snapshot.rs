//! Snapshot cache.
//!
//! Remembers, per field, the last value seen on each side. Entries are
//! created on first observation and overwritten after every propagation.
//! The cache lives as long as the engine that owns it and is never
//! persisted.

use crate::mapping::DomainGroup;
use macon_document::Value;
use std::collections::HashMap;

/// Identifies one mapped field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldKey {
    /// Domain group of the field.
    pub group: DomainGroup,
    /// Device variable of the field.
    pub variable: String,
}

impl FieldKey {
    /// Creates a field key.
    pub fn new(group: DomainGroup, variable: impl Into<String>) -> Self {
        Self {
            group,
            variable: variable.into(),
        }
    }
}

/// Last values observed for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Last value read from or written to the device.
    pub device: Value,
    /// Last value read from or written to the document; `None` if the path
    /// was absent.
    pub document: Option<Value>,
}

impl Snapshot {
    /// Both sides agree on `value`.
    pub fn converged(value: Value) -> Self {
        Self {
            device: value.clone(),
            document: Some(value),
        }
    }
}

/// Per-field baselines used for change detection.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCache {
    entries: HashMap<FieldKey, Snapshot>,
}

impl SnapshotCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Baseline of a field, if it has been observed.
    pub fn get(&self, group: DomainGroup, variable: &str) -> Option<&Snapshot> {
        self.entries.get(&FieldKey::new(group, variable))
    }

    /// Returns true if the field has a baseline.
    pub fn contains(&self, group: DomainGroup, variable: &str) -> bool {
        self.get(group, variable).is_some()
    }

    /// Records the first observation of a field.
    ///
    /// Does nothing if the field already has a baseline.
    pub fn seed(&mut self, group: DomainGroup, variable: &str, device: Value, document: Option<Value>) {
        self.entries
            .entry(FieldKey::new(group, variable))
            .or_insert(Snapshot { device, document });
    }

    /// Records that both sides now hold `value`.
    pub fn record(&mut self, group: DomainGroup, variable: &str, value: Value) {
        self.set(group, variable, Snapshot::converged(value));
    }

    /// Replaces the baseline of a field.
    pub fn set(&mut self, group: DomainGroup, variable: &str, snapshot: Snapshot) {
        self.entries.insert(FieldKey::new(group, variable), snapshot);
    }

    /// Number of fields with a baseline.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no field has been observed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_only_once() {
        let mut cache = SnapshotCache::new();
        cache.seed(DomainGroup::General, "sUsername", Value::from("alice"), Some(Value::from("alice")));
        cache.seed(DomainGroup::General, "sUsername", Value::from("bob"), None);

        let snap = cache.get(DomainGroup::General, "sUsername").unwrap();
        assert_eq!(snap.device, Value::from("alice"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn record_converges_both_sides() {
        let mut cache = SnapshotCache::new();
        cache.seed(DomainGroup::Machine, "axes_1_min", Value::Float(0.0), None);
        cache.record(DomainGroup::Machine, "axes_1_min", Value::Float(2.5));

        let snap = cache.get(DomainGroup::Machine, "axes_1_min").unwrap();
        assert_eq!(snap.device, Value::Float(2.5));
        assert_eq!(snap.document, Some(Value::Float(2.5)));
    }

    #[test]
    fn groups_are_separate_keys() {
        let mut cache = SnapshotCache::new();
        cache.record(DomainGroup::General, "nId", Value::Integer(1));
        assert!(cache.contains(DomainGroup::General, "nId"));
        assert!(!cache.contains(DomainGroup::Material, "nId"));
    }
}
