//! Entity metadata view and its builder

use super::MetadataError;
use super::property::{Cardinality, PropertyDescriptor, PropertyType};
use crate::path::key::format_key_segment;
use crate::record::{Record, Value};

/// Immutable description of one entity type exposed through an entity set.
///
/// Property order is the wire order of emitted fields. Key order is the
/// order used when rendering composite key segments.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMetadata {
    namespace: String,
    entity_type: String,
    entity_set: String,
    properties: Vec<PropertyDescriptor>,
    keys: Vec<usize>,
    etag: Option<usize>,
}

impl EntityMetadata {
    /// Start building metadata for `namespace.entity_type`, exposed as `entity_set`
    pub fn builder(
        namespace: impl Into<String>,
        entity_type: impl Into<String>,
        entity_set: impl Into<String>,
    ) -> EntityMetadataBuilder {
        EntityMetadataBuilder {
            namespace: namespace.into(),
            entity_type: entity_type.into(),
            entity_set: entity_set.into(),
            properties: Vec::new(),
            keys: Vec::new(),
            etag: None,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn entity_set(&self) -> &str {
        &self.entity_set
    }

    /// Namespace-qualified type name, e.g. `ODataDemo.Product`
    pub fn qualified_type_name(&self) -> String {
        if self.namespace.is_empty() {
            self.entity_type.clone()
        } else {
            format!("{}.{}", self.namespace, self.entity_type)
        }
    }

    /// All declared properties in declaration order
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Key properties in declared key order
    pub fn key_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.keys.iter().map(|&idx| &self.properties[idx])
    }

    pub fn has_composite_key(&self) -> bool {
        self.keys.len() > 1
    }

    /// The concurrency-token property, if one is configured
    pub fn etag_property(&self) -> Option<&PropertyDescriptor> {
        self.etag.map(|idx| &self.properties[idx])
    }

    /// Look up a property by internal or wire name
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties
            .iter()
            .find(|p| p.wire_name == name)
            .or_else(|| self.properties.iter().find(|p| p.name == name))
    }

    pub fn navigation_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.iter().filter(|p| p.is_navigation())
    }

    pub fn structural_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.iter().filter(|p| !p.is_navigation())
    }

    /// Render the key predicate of `record` (the part between the parentheses
    /// of `Set(...)`).
    ///
    /// Returns `None` when any key property is missing or null.
    pub fn key_segment(&self, record: &dyn Record) -> Option<String> {
        let mut values: Vec<(&PropertyDescriptor, Value)> = Vec::with_capacity(self.keys.len());
        for prop in self.key_properties() {
            match record.get(prop) {
                Some(value) if !value.is_null() => values.push((prop, value)),
                _ => return None,
            }
        }
        format_key_segment(values.iter().map(|(p, v)| (*p, v)))
    }
}

/// Builder for [`EntityMetadata`]
#[derive(Debug, Clone)]
pub struct EntityMetadataBuilder {
    namespace: String,
    entity_type: String,
    entity_set: String,
    properties: Vec<PropertyDescriptor>,
    keys: Vec<String>,
    etag: Option<String>,
}

impl EntityMetadataBuilder {
    /// Declare a structural property
    pub fn property(self, name: impl Into<String>, property_type: PropertyType) -> Self {
        self.descriptor(PropertyDescriptor::new(name, property_type))
    }

    /// Declare a property from a prepared descriptor
    pub fn descriptor(mut self, descriptor: PropertyDescriptor) -> Self {
        self.properties.push(descriptor);
        self
    }

    /// Declare a navigation property
    pub fn navigation(
        self,
        name: impl Into<String>,
        target_entity: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        self.descriptor(PropertyDescriptor::navigation(
            name,
            target_entity,
            cardinality,
        ))
    }

    /// Append a property to the key; call order is key order
    pub fn key(mut self, name: impl Into<String>) -> Self {
        self.keys.push(name.into());
        self
    }

    /// Mark the concurrency-token property
    pub fn etag(mut self, name: impl Into<String>) -> Self {
        self.etag = Some(name.into());
        self
    }

    /// Validate and freeze the metadata
    pub fn build(self) -> Result<EntityMetadata, MetadataError> {
        let set = self.entity_set.clone();

        for (idx, prop) in self.properties.iter().enumerate() {
            let clash = self.properties[..idx]
                .iter()
                .any(|p| p.name == prop.name || p.wire_name == prop.wire_name);
            if clash {
                return Err(MetadataError::DuplicateProperty {
                    entity_set: set,
                    name: prop.wire_name.clone(),
                });
            }
        }

        if self.keys.is_empty() {
            return Err(MetadataError::MissingKey { entity_set: set });
        }

        let mut keys = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            let idx = self.structural_index(key)?;
            if keys.contains(&idx) {
                return Err(MetadataError::DuplicateProperty {
                    entity_set: set,
                    name: key.clone(),
                });
            }
            keys.push(idx);
        }

        let etag = match &self.etag {
            Some(name) => Some(self.structural_index(name)?),
            None => None,
        };

        Ok(EntityMetadata {
            namespace: self.namespace,
            entity_type: self.entity_type,
            entity_set: self.entity_set,
            properties: self.properties,
            keys,
            etag,
        })
    }

    fn structural_index(&self, name: &str) -> Result<usize, MetadataError> {
        let idx = self
            .properties
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| MetadataError::UnknownProperty {
                entity_set: self.entity_set.clone(),
                name: name.to_string(),
            })?;
        if self.properties[idx].is_navigation() {
            return Err(MetadataError::NavigationNotAllowed {
                entity_set: self.entity_set.clone(),
                name: name.to_string(),
            });
        }
        Ok(idx)
    }
}
