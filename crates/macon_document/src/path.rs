//! Dotted-path access into nested documents.
//!
//! Every segment of a path is treated as a map key. Arrays are leaves as far
//! as paths are concerned: `get` never indexes into one and `set` replaces one
//! with a map when it has to descend through it.

use crate::value::{Map, Value};

/// Separator between path segments.
pub const SEPARATOR: char = '.';

/// Returns the value at `path`, or `None` if it is missing.
///
/// A path is missing when any intermediate segment is absent or is not a
/// map, or when the final key is absent. This never fails.
pub fn get<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split(SEPARATOR)
        .try_fold(document, |current, segment| current.as_map()?.get(segment))
}

/// Writes `value` at `path`, creating intermediate maps as needed.
///
/// Any intermediate segment that is absent or holds a non-map value is
/// replaced by a fresh empty map; whatever was stored there is discarded.
/// The final segment is always overwritten. A non-map `document` is itself
/// replaced by a map.
pub fn set(document: &mut Value, path: &str, value: Value) {
    let (parents, last) = match path.rsplit_once(SEPARATOR) {
        Some((parents, last)) => (Some(parents), last),
        None => (None, path),
    };

    let mut current = ensure_map(document);
    if let Some(parents) = parents {
        for segment in parents.split(SEPARATOR) {
            current = ensure_map(current.slot(segment));
        }
    }
    current.insert(last, value);
}

/// Splits a path into its segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR)
}

fn ensure_map(value: &mut Value) -> &mut Map {
    if !matches!(value, Value::Map(_)) {
        *value = Value::empty_map();
    }
    match value {
        Value::Map(map) => map,
        _ => unreachable!("value was just replaced by a map"),
    }
}
