//! Conversion between values and controller memory.
//!
//! | type    | PLC type    | layout                                  |
//! |---------|-------------|-----------------------------------------|
//! | string  | STRING(n)   | `n + 1` bytes, NUL-terminated, padded   |
//! | bool    | BOOL        | 1 byte, 0 or 1                          |
//! | integer | INT         | 2 bytes, signed, little-endian          |
//! | float   | REAL        | 4 bytes, IEEE 754 single, little-endian |

use crate::error::{AdsError, AdsResult};
use macon_document::Value;
use macon_sync_engine::ValueType;

/// Default STRING capacity in characters.
pub const DEFAULT_STRING_CAPACITY: usize = 80;

/// Size in bytes of a variable of `value_type`.
pub fn size_of(value_type: ValueType, string_capacity: usize) -> usize {
    match value_type {
        ValueType::String => string_capacity + 1,
        ValueType::Bool => 1,
        ValueType::Integer => 2,
        ValueType::Float => 4,
    }
}

/// Encodes `value` for a variable of `value_type`.
///
/// The value is first converted with [`ValueType::coerce`]; values that do
/// not convert, integers outside the INT range and strings longer than the
/// capacity are type mismatches.
#[allow(clippy::cast_possible_truncation)]
pub fn encode(
    symbol: &str,
    value: &Value,
    value_type: ValueType,
    string_capacity: usize,
) -> AdsResult<Vec<u8>> {
    let mismatch = |found: String| AdsError::TypeMismatch {
        symbol: symbol.to_string(),
        expected: value_type,
        found,
    };
    let coerced = value_type
        .coerce(value)
        .ok_or_else(|| mismatch(value.kind().to_string()))?;

    match coerced {
        Value::Text(s) => {
            let bytes = s.as_bytes();
            if bytes.len() > string_capacity {
                return Err(mismatch(format!("string of {} bytes", bytes.len())));
            }
            let mut buf = vec![0u8; string_capacity + 1];
            buf[..bytes.len()].copy_from_slice(bytes);
            Ok(buf)
        }
        Value::Bool(b) => Ok(vec![u8::from(b)]),
        Value::Integer(n) => {
            let n = i16::try_from(n).map_err(|_| mismatch(format!("{n} outside INT range")))?;
            Ok(n.to_le_bytes().to_vec())
        }
        Value::Float(f) => Ok((f as f32).to_le_bytes().to_vec()),
        other => Err(mismatch(other.kind().to_string())),
    }
}

/// Decodes controller memory of a variable of `value_type`.
pub fn decode(symbol: &str, data: &[u8], value_type: ValueType) -> AdsResult<Value> {
    let expected = match value_type {
        ValueType::String => 1,
        other => size_of(other, 0),
    };
    if data.len() < expected {
        return Err(AdsError::TypeMismatch {
            symbol: symbol.to_string(),
            expected: value_type,
            found: format!("{} bytes", data.len()),
        });
    }

    Ok(match value_type {
        ValueType::String => {
            let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
            Value::Text(decode_text(&data[..end]))
        }
        ValueType::Bool => Value::Bool(data[0] != 0),
        ValueType::Integer => Value::Integer(i64::from(i16::from_le_bytes([data[0], data[1]]))),
        ValueType::Float => {
            Value::Float(f64::from(f32::from_le_bytes([data[0], data[1], data[2], data[3]])))
        }
    })
}

/// Controller strings are single-byte; bytes that are not UTF-8 are read as
/// Latin-1.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}
