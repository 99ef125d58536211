//! Low-level JSON writing into byte buffers

use super::SerializeError;
use crate::record::{FieldMap, Value};

/// Write `"key":`, preceded by a comma unless it is the first member
pub(crate) fn write_key(buf: &mut Vec<u8>, first: &mut bool, key: &str) -> Result<(), SerializeError> {
    if !*first {
        buf.push(b',');
    }
    *first = false;
    write_str(buf, key)?;
    buf.push(b':');
    Ok(())
}

pub(crate) fn write_str(buf: &mut Vec<u8>, s: &str) -> Result<(), SerializeError> {
    serde_json::to_writer(&mut *buf, s)?;
    Ok(())
}

pub(crate) fn write_member(buf: &mut Vec<u8>, first: &mut bool, key: &str, value: &str) -> Result<(), SerializeError> {
    write_key(buf, first, key)?;
    write_str(buf, value)
}

pub(crate) fn write_number<N: serde::Serialize>(buf: &mut Vec<u8>, n: N) -> Result<(), SerializeError> {
    serde_json::to_writer(&mut *buf, &n)?;
    Ok(())
}

/// Write a property value in its OData JSON wire form
pub(crate) fn write_value(buf: &mut Vec<u8>, value: &Value) -> Result<(), SerializeError> {
    match value {
        Value::Null => buf.extend_from_slice(b"null"),
        Value::Boolean(true) => buf.extend_from_slice(b"true"),
        Value::Boolean(false) => buf.extend_from_slice(b"false"),
        Value::Int(i) => write_number(buf, *i)?,
        Value::Double(d) if d.is_nan() => buf.extend_from_slice(b"\"NaN\""),
        Value::Double(d) if d.is_infinite() && *d > 0.0 => buf.extend_from_slice(b"\"INF\""),
        Value::Double(d) if d.is_infinite() => buf.extend_from_slice(b"\"-INF\""),
        Value::Double(d) => write_number(buf, *d)?,
        Value::Decimal(text) => {
            if text.parse::<serde_json::Number>().is_ok() {
                buf.extend_from_slice(text.as_bytes());
            } else {
                write_str(buf, text)?;
            }
        }
        Value::String(s) => write_str(buf, s)?,
        Value::Json(json) => serde_json::to_writer(&mut *buf, json)?,
        Value::Entity(map) => serde_json::to_writer(&mut *buf, &map.to_json())?,
        Value::Collection(items) => {
            let array: Vec<serde_json::Value> = items.iter().map(FieldMap::to_json).collect();
            serde_json::to_writer(&mut *buf, &array)?;
        }
        other => write_str(buf, &other.to_string())?,
    }
    Ok(())
}
