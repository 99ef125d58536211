//! Property values

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use uuid::Uuid;

use super::FieldMap;
use crate::metadata::PropertyType;

/// Current value of a property
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i64),
    Double(f64),
    /// Decimal kept in its textual form to avoid precision loss
    Decimal(String),
    String(String),
    Guid(Uuid),
    Date(NaiveDate),
    DateTimeOffset(DateTime<Utc>),
    Binary(Vec<u8>),
    /// Opaque JSON passed through unchanged
    Json(serde_json::Value),
    /// A single related or complex value
    Entity(Box<FieldMap>),
    /// A collection of related values
    Collection(Vec<FieldMap>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Canonical string form used for entity-tag digests.
    ///
    /// Integers render as base-10 digits, text is unchanged, instants render
    /// as Unix epoch seconds; everything else uses its display form.
    pub fn canonical_string(&self) -> String {
        match self {
            Value::Int(i) => i.to_string(),
            Value::String(s) => s.clone(),
            Value::DateTimeOffset(dt) => dt.timestamp().to_string(),
            other => other.to_string(),
        }
    }

    /// Literal form inside a key predicate, or `None` for values that cannot
    /// identify an entity.
    pub fn key_literal(&self, property_type: PropertyType) -> Option<String> {
        match self {
            Value::Null | Value::Entity(_) | Value::Collection(_) | Value::Json(_) => None,
            Value::String(s) if property_type.is_textual() => Some(quote_literal(s)),
            other if property_type.is_textual() => Some(quote_literal(&other.to_string())),
            other => Some(other.to_string()),
        }
    }

    /// Convert untyped JSON into a value. Objects become entities and arrays of
    /// objects become collections.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => match n.as_f64() {
                    Some(f) if n.is_f64() => Value::Double(f),
                    _ => Value::Decimal(n.to_string()),
                },
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Object(map) => Value::Entity(Box::new(FieldMap::from_json_object(map))),
            serde_json::Value::Array(items) if items.iter().all(|i| i.is_object()) && !items.is_empty() => {
                Value::Collection(
                    items
                        .into_iter()
                        .filter_map(|item| match item {
                            serde_json::Value::Object(map) => Some(FieldMap::from_json_object(map)),
                            _ => None,
                        })
                        .collect(),
                )
            }
            other => Value::Json(other),
        }
    }

    /// Reinterpret a loosely typed value according to the declared type.
    ///
    /// Values that do not parse as the declared type are returned unchanged.
    pub fn coerce(self, property_type: PropertyType) -> Value {
        match (self, property_type) {
            (Value::String(s), PropertyType::Guid) => match Uuid::parse_str(&s) {
                Ok(id) => Value::Guid(id),
                Err(_) => Value::String(s),
            },
            (Value::String(s), PropertyType::Date) => match NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
                Ok(date) => Value::Date(date),
                Err(_) => Value::String(s),
            },
            (Value::String(s), PropertyType::DateTimeOffset) => match DateTime::parse_from_rfc3339(&s) {
                Ok(dt) => Value::DateTimeOffset(dt.with_timezone(&Utc)),
                Err(_) => Value::String(s),
            },
            (Value::String(s), PropertyType::Binary) => {
                match URL_SAFE_NO_PAD.decode(&s).or_else(|_| STANDARD.decode(&s)) {
                    Ok(bytes) => Value::Binary(bytes),
                    Err(_) => Value::String(s),
                }
            }
            (Value::String(s), PropertyType::Int32 | PropertyType::Int64) => match s.parse::<i64>() {
                Ok(i) => Value::Int(i),
                Err(_) => Value::String(s),
            },
            (Value::String(s), PropertyType::Decimal) => Value::Decimal(s),
            (Value::Int(i), PropertyType::Double) => Value::Double(i as f64),
            (Value::Int(i), PropertyType::Decimal) => Value::Decimal(i.to_string()),
            (Value::Double(f), PropertyType::Decimal) => Value::Decimal(f.to_string()),
            (Value::Int(i), PropertyType::DateTimeOffset) => match DateTime::from_timestamp(i, 0) {
                Some(dt) => Value::DateTimeOffset(dt),
                None => Value::Int(i),
            },
            (Value::Json(serde_json::Value::Array(items)), PropertyType::Binary) => {
                let bytes: Option<Vec<u8>> = items
                    .iter()
                    .map(|i| i.as_u64().and_then(|b| u8::try_from(b).ok()))
                    .collect();
                match bytes {
                    Some(bytes) => Value::Binary(bytes),
                    None => Value::Json(serde_json::Value::Array(items)),
                }
            }
            (value, _) => value,
        }
    }
}

/// Single-quote a literal, doubling embedded single quotes
pub fn quote_literal(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "{}", s),
            Value::Guid(id) => write!(f, "{}", id.hyphenated()),
            Value::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Value::DateTimeOffset(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Binary(bytes) => write!(f, "{}", URL_SAFE_NO_PAD.encode(bytes)),
            Value::Json(json) => write!(f, "{}", json),
            Value::Entity(map) => write!(f, "{}", map.to_json()),
            Value::Collection(items) => {
                let array: Vec<serde_json::Value> = items.iter().map(FieldMap::to_json).collect();
                write!(f, "{}", serde_json::Value::Array(array))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Uuid> for Value {
    fn from(id: Uuid) -> Self {
        Value::Guid(id)
    }
}

impl From<NaiveDate> for Value {
    fn from(date: NaiveDate) -> Self {
        Value::Date(date)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTimeOffset(dt)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Binary(bytes)
    }
}

impl From<FieldMap> for Value {
    fn from(map: FieldMap) -> Self {
        Value::Entity(Box::new(map))
    }
}

impl From<Vec<FieldMap>> for Value {
    fn from(items: Vec<FieldMap>) -> Self {
        Value::Collection(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}
