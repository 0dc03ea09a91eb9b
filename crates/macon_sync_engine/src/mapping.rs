//! Field mapping registry.
//!
//! A mapping table pairs controller variables with document paths, one
//! ordered list per domain group. Tables are data: the built-in table is
//! embedded from `mappings/default.json` and an alternative can be loaded at
//! startup. Every table is validated before use.

use crate::error::MappingError;
use macon_document::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// The mapping table shipped with the binary.
const BUILTIN_TABLE: &str = include_str!("../mappings/default.json");

/// One of the independently synchronized subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainGroup {
    /// General application settings.
    General,
    /// Machine configuration.
    Machine,
    /// Current material data.
    Material,
}

impl DomainGroup {
    /// All groups, in sweep order.
    pub const ALL: [DomainGroup; 3] = [DomainGroup::General, DomainGroup::Machine, DomainGroup::Material];

    /// Lowercase name of the group.
    pub fn as_str(self) -> &'static str {
        match self {
            DomainGroup::General => "general",
            DomainGroup::Machine => "machine",
            DomainGroup::Material => "material",
        }
    }

    fn index(self) -> usize {
        match self {
            DomainGroup::General => 0,
            DomainGroup::Machine => 1,
            DomainGroup::Material => 2,
        }
    }
}

impl fmt::Display for DomainGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primitive type of a controller variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Text.
    String,
    /// Boolean.
    Bool,
    /// Signed integer.
    Integer,
    /// Floating point.
    Float,
}

impl ValueType {
    /// Lowercase name of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Bool => "bool",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
        }
    }

    /// Converts `value` to the form a variable of this type holds.
    ///
    /// Integers widen to floats, whole floats narrow to integers and the
    /// integers 0 and 1 stand for booleans. Floats are rounded to single
    /// precision, the width of a REAL, so a written value equals the value
    /// read back. Everything else is rejected.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn coerce(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (ValueType::String, Value::Text(s)) => Some(Value::Text(s.clone())),
            (ValueType::Bool, Value::Bool(b)) => Some(Value::Bool(*b)),
            (ValueType::Bool, Value::Integer(0)) => Some(Value::Bool(false)),
            (ValueType::Bool, Value::Integer(1)) => Some(Value::Bool(true)),
            (ValueType::Integer, Value::Integer(n)) => Some(Value::Integer(*n)),
            (ValueType::Integer, Value::Float(f))
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 =>
            {
                Some(Value::Integer(*f as i64))
            }
            (ValueType::Float, Value::Float(f)) => Some(Value::Float(f64::from(*f as f32))),
            (ValueType::Float, Value::Integer(n)) => Some(Value::Float(f64::from(*n as f32))),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correspondence between one controller variable and one document path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    /// Group the field belongs to.
    pub group: DomainGroup,
    /// Variable name inside the group's controller program.
    pub device_variable: String,
    /// Dotted path inside the group's current record.
    pub document_path: String,
    /// Primitive type of the variable.
    pub value_type: ValueType,
    /// Document-side edits never reach the device for a protected field.
    pub protected: bool,
}

impl FieldMapping {
    /// Creates an unprotected mapping.
    pub fn new(
        group: DomainGroup,
        device_variable: impl Into<String>,
        document_path: impl Into<String>,
        value_type: ValueType,
    ) -> Self {
        Self {
            group,
            device_variable: device_variable.into(),
            document_path: document_path.into(),
            value_type,
            protected: false,
        }
    }

    /// Marks the mapping as protected.
    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldEntry {
    variable: String,
    path: String,
    #[serde(rename = "type")]
    value_type: ValueType,
    #[serde(default)]
    protected: bool,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TableFile {
    general: Vec<FieldEntry>,
    machine: Vec<FieldEntry>,
    material: Vec<FieldEntry>,
}

/// Ordered, validated field mappings for every domain group.
#[derive(Debug, Clone, Default)]
pub struct MappingRegistry {
    groups: [Vec<FieldMapping>; 3],
}

impl MappingRegistry {
    /// Builds a registry from mappings, keeping their order within each group.
    pub fn new(fields: impl IntoIterator<Item = FieldMapping>) -> Result<Self, MappingError> {
        let mut registry = Self::default();
        for field in fields {
            registry.groups[field.group.index()].push(field);
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Loads the built-in table.
    pub fn builtin() -> Result<Self, MappingError> {
        Self::from_json_str(BUILTIN_TABLE)
    }

    /// Loads a table from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, MappingError> {
        let text = std::fs::read_to_string(path).map_err(|source| MappingError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Parses a table from JSON text.
    ///
    /// The text must declare all three groups, each with at least one field.
    pub fn from_json_str(text: &str) -> Result<Self, MappingError> {
        let table: TableFile = serde_json::from_str(text)?;

        let mut fields = Vec::new();
        for (group, entries) in [
            (DomainGroup::General, table.general),
            (DomainGroup::Machine, table.machine),
            (DomainGroup::Material, table.material),
        ] {
            if entries.is_empty() {
                return Err(MappingError::EmptyGroup(group));
            }
            fields.extend(entries.into_iter().map(|entry| FieldMapping {
                group,
                device_variable: entry.variable,
                document_path: entry.path,
                value_type: entry.value_type,
                protected: entry.protected,
            }));
        }

        Self::new(fields)
    }

    /// Fields of `group`, in table order.
    pub fn fields_for(&self, group: DomainGroup) -> &[FieldMapping] {
        &self.groups[group.index()]
    }

    /// The protected field, if the table has one.
    pub fn protected_field(&self) -> Option<&FieldMapping> {
        self.iter().find(|field| field.protected)
    }

    /// All fields, group by group in sweep order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldMapping> {
        self.groups.iter().flatten()
    }

    /// Total number of fields.
    pub fn len(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    /// Returns true if no group has fields.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn validate(&self) -> Result<(), MappingError> {
        let mut protected: Option<&FieldMapping> = None;

        for group in DomainGroup::ALL {
            let mut seen = HashSet::new();
            for field in self.fields_for(group) {
                if field.device_variable.is_empty() || field.document_path.is_empty() {
                    return Err(MappingError::EmptyField {
                        group,
                        variable: field.device_variable.clone(),
                    });
                }
                if !seen.insert(field.device_variable.as_str()) {
                    return Err(MappingError::DuplicateVariable {
                        group,
                        variable: field.device_variable.clone(),
                    });
                }
                if field.protected {
                    if let Some(first) = protected {
                        return Err(MappingError::MultipleProtected {
                            first: format!("{}/{}", first.group, first.device_variable),
                            second: format!("{}/{}", field.group, field.device_variable),
                        });
                    }
                    protected = Some(field);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_loads() {
        let registry = MappingRegistry::builtin().unwrap();
        assert_eq!(registry.fields_for(DomainGroup::General).len(), 26);
        assert_eq!(registry.fields_for(DomainGroup::Machine).len(), 23);
        assert_eq!(registry.fields_for(DomainGroup::Material).len(), 9);
        assert_eq!(registry.len(), 58);
    }

    #[test]
    fn builtin_table_keeps_order() {
        let registry = MappingRegistry::builtin().unwrap();
        let general: Vec<&str> = registry
            .fields_for(DomainGroup::General)
            .iter()
            .take(3)
            .map(|f| f.device_variable.as_str())
            .collect();
        assert_eq!(general, vec!["sAppName", "sVersion", "sLang_Default"]);

        let last = registry.fields_for(DomainGroup::Material).last().unwrap();
        assert_eq!(last.device_variable, "MaterialXPosition");
        assert_eq!(last.document_path, "MaterialPposition");
    }

    #[test]
    fn builtin_table_keeps_bracket_paths_verbatim() {
        let registry = MappingRegistry::builtin().unwrap();
        let theme = registry
            .fields_for(DomainGroup::General)
            .iter()
            .find(|f| f.device_variable == "sTheme1")
            .unwrap();
        assert_eq!(theme.document_path, "ui.theme.availableThemes.[0");
    }

    #[test]
    fn builtin_protected_field_is_safe_torque_off() {
        let registry = MappingRegistry::builtin().unwrap();
        let protected = registry.protected_field().unwrap();
        assert_eq!(protected.group, DomainGroup::Machine);
        assert_eq!(protected.device_variable, "safety_STO_Enabled");
        assert_eq!(protected.value_type, ValueType::Integer);
        assert_eq!(registry.iter().filter(|f| f.protected).count(), 1);
    }

    #[test]
    fn duplicate_variable_is_rejected() {
        let result = MappingRegistry::new([
            FieldMapping::new(DomainGroup::General, "sAppName", "appName", ValueType::String),
            FieldMapping::new(DomainGroup::General, "sAppName", "name", ValueType::String),
        ]);
        assert!(matches!(
            result,
            Err(MappingError::DuplicateVariable { group: DomainGroup::General, .. })
        ));
    }

    #[test]
    fn same_variable_in_two_groups_is_allowed() {
        let registry = MappingRegistry::new([
            FieldMapping::new(DomainGroup::General, "nId", "id", ValueType::Integer),
            FieldMapping::new(DomainGroup::Material, "nId", "id", ValueType::Integer),
        ])
        .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn two_protected_fields_are_rejected() {
        let result = MappingRegistry::new([
            FieldMapping::new(DomainGroup::Machine, "a", "a", ValueType::Integer).protected(),
            FieldMapping::new(DomainGroup::Material, "b", "b", ValueType::Integer).protected(),
        ]);
        assert!(matches!(result, Err(MappingError::MultipleProtected { .. })));
    }

    #[test]
    fn empty_path_is_rejected() {
        let result = MappingRegistry::new([FieldMapping::new(
            DomainGroup::Machine,
            "machineId",
            "",
            ValueType::String,
        )]);
        assert!(matches!(result, Err(MappingError::EmptyField { .. })));
    }

    #[test]
    fn table_must_declare_every_group() {
        let text = r#"{ "general": [ { "variable": "a", "path": "a", "type": "string" } ],
                        "machine": [ { "variable": "b", "path": "b", "type": "bool" } ] }"#;
        assert!(matches!(
            MappingRegistry::from_json_str(text),
            Err(MappingError::Parse(_))
        ));
    }

    #[test]
    fn table_rejects_empty_group() {
        let text = r#"{ "general": [ { "variable": "a", "path": "a", "type": "string" } ],
                        "machine": [ { "variable": "b", "path": "b", "type": "bool" } ],
                        "material": [] }"#;
        assert!(matches!(
            MappingRegistry::from_json_str(text),
            Err(MappingError::EmptyGroup(DomainGroup::Material))
        ));
    }

    #[test]
    fn table_rejects_unknown_type() {
        let text = r#"{ "general": [ { "variable": "a", "path": "a", "type": "lreal" } ],
                        "machine": [ { "variable": "b", "path": "b", "type": "bool" } ],
                        "material": [ { "variable": "c", "path": "c", "type": "float" } ] }"#;
        assert!(matches!(
            MappingRegistry::from_json_str(text),
            Err(MappingError::Parse(_))
        ));
    }

    #[test]
    fn coerce_rules() {
        assert_eq!(ValueType::Float.coerce(&Value::Integer(3)), Some(Value::Float(3.0)));
        assert_eq!(ValueType::Integer.coerce(&Value::Float(4.0)), Some(Value::Integer(4)));
        assert_eq!(ValueType::Integer.coerce(&Value::Float(4.5)), None);
        assert_eq!(
            ValueType::Float.coerce(&Value::Float(0.1)),
            Some(Value::Float(f64::from(0.1_f32)))
        );
        assert_ne!(ValueType::Float.coerce(&Value::Float(0.1)), Some(Value::Float(0.1)));
        assert_eq!(ValueType::Bool.coerce(&Value::Integer(1)), Some(Value::Bool(true)));
        assert_eq!(ValueType::Bool.coerce(&Value::Integer(2)), None);
        assert_eq!(ValueType::String.coerce(&Value::Integer(2)), None);
        assert_eq!(ValueType::String.coerce(&Value::Null), None);
        assert_eq!(
            ValueType::String.coerce(&Value::from("x")),
            Some(Value::from("x"))
        );
    }

    #[test]
    fn group_order_is_fixed() {
        assert_eq!(
            DomainGroup::ALL,
            [DomainGroup::General, DomainGroup::Machine, DomainGroup::Material]
        );
        assert_eq!(DomainGroup::Machine.to_string(), "machine");
    }
}
