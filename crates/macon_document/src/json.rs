//! JSON rendering and identity stringification.

use crate::value::{Map, Value};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Number;

/// Renders a value as JSON.
///
/// Record identities become their hex string, date-times become RFC 3339
/// strings and non-finite floats become `null`.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Integer(n) => serde_json::Value::Number(Number::from(*n)),
        Value::Float(f) => Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Map(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.to_string(), to_json(v)))
                .collect(),
        ),
        Value::Id(id) => serde_json::Value::String(id.to_hex()),
        Value::DateTime(ms) => serde_json::Value::String(format_millis(*ms)),
    }
}

/// Builds a value from JSON.
///
/// Numbers that fit an `i64` become integers, all others floats.
pub fn from_json(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::Text(s),
        serde_json::Value::Array(items) => {
            Value::Array(items.into_iter().map(from_json).collect())
        }
        serde_json::Value::Object(object) => Value::Map(
            object
                .into_iter()
                .map(|(k, v)| (k, from_json(v)))
                .collect::<Map>(),
        ),
    }
}

/// Replaces every record identity in `value`, at any depth and inside
/// arrays, with its hex string.
pub fn stringify_ids(value: Value) -> Value {
    match value {
        Value::Id(id) => Value::Text(id.to_hex()),
        Value::Array(items) => Value::Array(items.into_iter().map(stringify_ids).collect()),
        Value::Map(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (k, stringify_ids(v)))
                .collect(),
        ),
        other => other,
    }
}

fn format_millis(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| ms.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::RecordId;
    use serde_json::json;

    #[test]
    fn json_roundtrip_keeps_key_order() {
        let source = json!({ "z": 1, "a": [true, null], "m": { "x": 2.5, "y": "t" } });
        let value = from_json(source.clone());
        let keys: Vec<&str> = value.as_map().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(to_json(&value), source);
    }

    #[test]
    fn non_finite_float_renders_null() {
        assert_eq!(to_json(&Value::Float(f64::NAN)), serde_json::Value::Null);
        assert_eq!(to_json(&Value::Float(f64::INFINITY)), serde_json::Value::Null);
    }

    #[test]
    fn datetime_renders_rfc3339() {
        assert_eq!(
            to_json(&Value::DateTime(0)),
            json!("1970-01-01T00:00:00.000Z")
        );
    }

    #[test]
    fn stringify_reaches_nested_lists() {
        let outer = RecordId::from_bytes([1; 12]);
        let inner_a = RecordId::from_bytes([2; 12]);
        let inner_b = RecordId::from_bytes([3; 12]);

        let mut doc = Map::new();
        doc.insert("_id", Value::Id(outer));
        doc.insert(
            "batches",
            Value::Array(vec![
                Value::Map([("_id".to_string(), Value::Id(inner_a))].into_iter().collect()),
                Value::Array(vec![Value::Map(
                    [("_id".to_string(), Value::Id(inner_b))].into_iter().collect(),
                )]),
            ]),
        );

        let rendered = to_json(&stringify_ids(Value::Map(doc)));
        assert_eq!(
            rendered,
            json!({
                "_id": outer.to_hex(),
                "batches": [
                    { "_id": inner_a.to_hex() },
                    [ { "_id": inner_b.to_hex() } ]
                ]
            })
        );
    }

    #[test]
    fn stringify_leaves_other_values() {
        let value = Value::Array(vec![Value::Integer(1), Value::from("x"), Value::Null]);
        assert_eq!(stringify_ids(value.clone()), value);
    }
}
