//! Record abstraction consumed by the serializer and the entity-tag generator
//!
//! Records come in two shapes:
//! - [`FieldMap`]: a field-name to value map
//! - [`TypedRecord`]: a view over any `serde::Serialize` type
//!
//! Domain types may also implement [`Record`] directly.

mod value;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::metadata::PropertyDescriptor;

pub use value::{Value, quote_literal};

/// Read access to the current property values of one entity
pub trait Record {
    /// Value of a declared property, or `None` if the record does not carry it
    fn get(&self, property: &PropertyDescriptor) -> Option<Value>;
}

impl<R: Record + ?Sized> Record for &R {
    fn get(&self, property: &PropertyDescriptor) -> Option<Value> {
        (**self).get(property)
    }
}

impl<R: Record + ?Sized> Record for Box<R> {
    fn get(&self, property: &PropertyDescriptor) -> Option<Value> {
        (**self).get(property)
    }
}

/// Error while building a record view
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Record must serialize to a JSON object, found {0}")]
    NotAnObject(String),
}

/// Map view of a record, keyed by internal or wire property name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    fields: BTreeMap<String, Value>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Raw stored value without type coercion
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copy entries of `other` that are not already present
    pub fn merge_missing(&mut self, other: &FieldMap) {
        for (name, value) in &other.fields {
            self.fields
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }

    pub fn from_json_object(object: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            fields: object
                .into_iter()
                .map(|(k, v)| (k, Value::from_json(v)))
                .collect(),
        }
    }

    /// Plain JSON rendering in key order; used for display and opaque payloads
    pub fn to_json(&self) -> serde_json::Value {
        let object = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), value_to_json(v)))
            .collect();
        serde_json::Value::Object(object)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Record for FieldMap {
    fn get(&self, property: &PropertyDescriptor) -> Option<Value> {
        let value = self
            .fields
            .get(&property.name)
            .or_else(|| self.fields.get(&property.wire_name))?;
        Some(normalize(value.clone(), property))
    }
}

/// Typed view over a serializable domain value.
///
/// Property names resolve against the serialized field names, so a
/// `#[serde(rename = "...")]` attribute maps onto a descriptor's wire name.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRecord {
    fields: FieldMap,
}

impl TypedRecord {
    pub fn new<T: Serialize + ?Sized>(record: &T) -> Result<Self, RecordError> {
        match serde_json::to_value(record)? {
            serde_json::Value::Object(object) => Ok(Self {
                fields: FieldMap::from_json_object(object),
            }),
            other => Err(RecordError::NotAnObject(json_kind(&other).to_string())),
        }
    }

    /// Build typed views for a whole page of records
    pub fn collect<T: Serialize>(records: &[T]) -> Result<Vec<Self>, RecordError> {
        records.iter().map(Self::new).collect()
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn into_fields(self) -> FieldMap {
        self.fields
    }
}

impl Record for TypedRecord {
    fn get(&self, property: &PropertyDescriptor) -> Option<Value> {
        self.fields.get(property)
    }
}

fn normalize(value: Value, property: &PropertyDescriptor) -> Value {
    if property.is_collection() {
        return match value {
            Value::Json(serde_json::Value::Array(items)) if items.is_empty() => Value::Collection(Vec::new()),
            Value::Entity(one) => Value::Collection(vec![*one]),
            other => other,
        };
    }
    value.coerce(property.property_type)
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Double(d) => serde_json::Number::from_f64(*d)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(d.to_string())),
        Value::Json(json) => json.clone(),
        Value::Entity(map) => map.to_json(),
        Value::Collection(items) => serde_json::Value::Array(items.iter().map(FieldMap::to_json).collect()),
        other => serde_json::Value::String(other.to_string()),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
