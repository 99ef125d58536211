//! Registry of entity metadata views
//!
//! Built once during service initialization and shared (typically behind an
//! `Arc`) with the serializer. Lookups never mutate the registry.

use std::collections::HashMap;
use std::sync::Arc;

use super::MetadataError;
use super::entity::EntityMetadata;
use super::property::PropertyDescriptor;

#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    by_set: HashMap<String, Arc<EntityMetadata>>,
    set_by_type: HashMap<String, String>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity set. Entity set and entity type names must both be unique.
    pub fn register(&mut self, metadata: EntityMetadata) -> Result<Arc<EntityMetadata>, MetadataError> {
        let set = metadata.entity_set().to_string();
        if self.by_set.contains_key(&set) {
            return Err(MetadataError::DuplicateEntitySet(set));
        }
        let qualified = metadata.qualified_type_name();
        if self.set_by_type.contains_key(&qualified) {
            return Err(MetadataError::DuplicateEntityType(qualified));
        }

        tracing::debug!(entity_set = %set, entity_type = %qualified, "Registered entity metadata");

        let metadata = Arc::new(metadata);
        self.set_by_type.insert(qualified, set.clone());
        self.by_set.insert(set, Arc::clone(&metadata));
        Ok(metadata)
    }

    /// Builder-style registration
    pub fn with(mut self, metadata: EntityMetadata) -> Result<Self, MetadataError> {
        self.register(metadata)?;
        Ok(self)
    }

    pub fn entity_set(&self, name: &str) -> Option<&Arc<EntityMetadata>> {
        self.by_set.get(name)
    }

    /// Look up by entity type, qualified (`NS.Product`) or bare (`Product`).
    /// A bare name declared in more than one namespace resolves to nothing.
    pub fn entity_type(&self, name: &str) -> Option<&Arc<EntityMetadata>> {
        if let Some(set) = self.set_by_type.get(name) {
            return self.by_set.get(set);
        }
        let mut matches = self.by_set.values().filter(|m| m.entity_type() == name);
        let found = matches.next()?;
        if matches.next().is_some() {
            tracing::debug!(entity_type = %name, "Ambiguous bare entity type name");
            return None;
        }
        Some(found)
    }

    /// Resolve the metadata of a navigation property's target
    pub fn navigation_target(&self, property: &PropertyDescriptor) -> Option<&Arc<EntityMetadata>> {
        let target = property.navigation.as_ref()?;
        self.entity_type(&target.entity)
            .or_else(|| self.entity_set(&target.entity))
    }

    pub fn len(&self) -> usize {
        self.by_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_set.is_empty()
    }

    pub fn entity_sets(&self) -> impl Iterator<Item = &str> {
        self.by_set.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Cardinality, PropertyType};

    fn product() -> EntityMetadata {
        EntityMetadata::builder("Demo", "Product", "Products")
            .property("ID", PropertyType::Int64)
            .navigation("Category", "Category", Cardinality::One)
            .key("ID")
            .build()
            .unwrap()
    }

    fn category() -> EntityMetadata {
        EntityMetadata::builder("Demo", "Category", "Categories")
            .property("ID", PropertyType::Int64)
            .key("ID")
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_and_resolve_navigation() {
        let registry = MetadataRegistry::new()
            .with(product())
            .unwrap()
            .with(category())
            .unwrap();

        let products = registry.entity_set("Products").unwrap();
        let nav = products.property("Category").unwrap();
        let target = registry.navigation_target(nav).unwrap();
        assert_eq!(target.entity_set(), "Categories");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_entity_type_lookup_qualified_and_bare() {
        let registry = MetadataRegistry::new().with(category()).unwrap();
        assert!(registry.entity_type("Demo.Category").is_some());
        assert!(registry.entity_type("Category").is_some());
        assert!(registry.entity_type("Missing").is_none());
    }

    #[test]
    fn test_bare_name_shared_by_namespaces_is_ambiguous() {
        let shop = EntityMetadata::builder("Shop", "Product", "ShopProducts")
            .property("ID", PropertyType::Int64)
            .key("ID")
            .build()
            .unwrap();
        let registry = MetadataRegistry::new().with(product()).unwrap().with(shop).unwrap();

        assert_eq!(registry.entity_type("Demo.Product").unwrap().entity_set(), "Products");
        assert_eq!(registry.entity_type("Shop.Product").unwrap().entity_set(), "ShopProducts");
        assert!(registry.entity_type("Product").is_none());
    }

    #[test]
    fn test_duplicate_entity_set_rejected() {
        let mut registry = MetadataRegistry::new();
        registry.register(product()).unwrap();
        let err = registry.register(product()).unwrap_err();
        assert!(matches!(err, MetadataError::DuplicateEntitySet(_)));
    }
}
