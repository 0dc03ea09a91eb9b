//! Conversion between BSON and document values.

use macon_document::{Map, RecordId, Value};
use mongodb::bson::{oid::ObjectId, Bson, DateTime, Document};

/// Converts a BSON value.
///
/// BSON kinds with no document counterpart (decimals, timestamps, binary,
/// regular expressions, code) are kept as their text rendering.
pub fn from_bson(bson: Bson) -> Value {
    match bson {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(n) => Value::Integer(i64::from(n)),
        Bson::Int64(n) => Value::Integer(n),
        Bson::Double(f) => Value::Float(f),
        Bson::String(s) => Value::Text(s),
        Bson::Array(items) => Value::Array(items.into_iter().map(from_bson).collect()),
        Bson::Document(doc) => Value::Map(from_document(doc)),
        Bson::ObjectId(oid) => Value::Id(RecordId::from_bytes(oid.bytes())),
        Bson::DateTime(dt) => Value::DateTime(dt.timestamp_millis()),
        other => Value::Text(other.to_string()),
    }
}

/// Converts a BSON document, keeping key order.
pub fn from_document(doc: Document) -> Map {
    doc.into_iter().map(|(k, v)| (k, from_bson(v))).collect()
}

/// Converts a document value to BSON.
///
/// Integers that fit 32 bits are stored as `Int32`, like the values the
/// database hands out for small numbers.
pub fn to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Integer(n) => match i32::try_from(*n) {
            Ok(small) => Bson::Int32(small),
            Err(_) => Bson::Int64(*n),
        },
        Value::Float(f) => Bson::Double(*f),
        Value::Text(s) => Bson::String(s.clone()),
        Value::Array(items) => Bson::Array(items.iter().map(to_bson).collect()),
        Value::Map(map) => Bson::Document(to_document(map)),
        Value::Id(id) => Bson::ObjectId(ObjectId::from_bytes(*id.as_bytes())),
        Value::DateTime(ms) => Bson::DateTime(DateTime::from_millis(*ms)),
    }
}

/// Converts a map to a BSON document, keeping key order.
pub fn to_document(map: &Map) -> Document {
    let mut doc = Document::new();
    for (key, value) in map.iter() {
        doc.insert(key, to_bson(value));
    }
    doc
}
