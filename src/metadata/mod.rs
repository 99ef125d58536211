//! Entity metadata
//!
//! Describes the entity types exposed by the service: declared properties in
//! wire order, the (possibly composite) key, the optional concurrency-token
//! property and navigation relations. Metadata is built once at startup and
//! is read-only afterwards.

mod entity;
mod property;
mod registry;

pub use entity::{EntityMetadata, EntityMetadataBuilder};
pub use property::{Cardinality, NavigationTarget, PropertyDescriptor, PropertyType};
pub use registry::MetadataRegistry;

/// Error while building or registering metadata
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetadataError {
    #[error("Entity set '{entity_set}' declares no key properties")]
    MissingKey { entity_set: String },
    #[error("Entity set '{entity_set}' has no property named '{name}'")]
    UnknownProperty { entity_set: String, name: String },
    #[error("Entity set '{entity_set}' declares '{name}' more than once")]
    DuplicateProperty { entity_set: String, name: String },
    #[error("Navigation property '{name}' of '{entity_set}' cannot be a key or concurrency token")]
    NavigationNotAllowed { entity_set: String, name: String },
    #[error("Entity set already registered: {0}")]
    DuplicateEntitySet(String),
    #[error("Entity type already registered: {0}")]
    DuplicateEntityType(String),
}
