//! Property descriptors for entity metadata

use serde::{Deserialize, Serialize};

/// Declared EDM type of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Boolean,
    Int32,
    Int64,
    Double,
    Decimal,
    String,
    Guid,
    Date,
    DateTimeOffset,
    Binary,
    /// Structured value (complex type or related entity)
    Complex,
}

impl PropertyType {
    /// EDM type name as used in `@odata.type` annotations
    pub fn edm_name(&self) -> &'static str {
        match self {
            PropertyType::Boolean => "Edm.Boolean",
            PropertyType::Int32 => "Edm.Int32",
            PropertyType::Int64 => "Edm.Int64",
            PropertyType::Double => "Edm.Double",
            PropertyType::Decimal => "Edm.Decimal",
            PropertyType::String => "Edm.String",
            PropertyType::Guid => "Edm.Guid",
            PropertyType::Date => "Edm.Date",
            PropertyType::DateTimeOffset => "Edm.DateTimeOffset",
            PropertyType::Binary => "Edm.Binary",
            PropertyType::Complex => "Edm.ComplexType",
        }
    }

    /// Textual types are single-quoted in key segments
    pub fn is_textual(&self) -> bool {
        matches!(self, PropertyType::String)
    }
}

/// Multiplicity of a navigation property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

/// Target of a navigation property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationTarget {
    /// Entity type name of the related entity
    pub entity: String,
    pub cardinality: Cardinality,
}

/// A single declared property of an entity type.
///
/// `name` is the internal (model) name; `wire_name` is the name used in
/// JSON payloads and URLs. The two are equal unless explicitly renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    pub wire_name: String,
    pub property_type: PropertyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation: Option<NavigationTarget>,
}

impl PropertyDescriptor {
    /// Create a structural property whose wire name equals its internal name
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        let name = name.into();
        Self {
            wire_name: name.clone(),
            name,
            property_type,
            navigation: None,
        }
    }

    /// Create a navigation property pointing at another entity type
    pub fn navigation(
        name: impl Into<String>,
        target_entity: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        let name = name.into();
        Self {
            wire_name: name.clone(),
            name,
            property_type: PropertyType::Complex,
            navigation: Some(NavigationTarget {
                entity: target_entity.into(),
                cardinality,
            }),
        }
    }

    /// Override the JSON/URL name
    pub fn with_wire_name(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = wire_name.into();
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.navigation.is_some()
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self.navigation,
            Some(NavigationTarget {
                cardinality: Cardinality::Many,
                ..
            })
        )
    }

    /// Whether `name` refers to this property by internal or wire name
    pub fn answers_to(&self, name: &str) -> bool {
        self.wire_name == name || self.name == name
    }
}
