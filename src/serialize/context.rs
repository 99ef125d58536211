//! Context URLs, entity ids and links

use crate::metadata::EntityMetadata;
use crate::query::Projection;

pub(crate) fn metadata_url(root: &str) -> String {
    format!("{}/$metadata", root)
}

/// `{root}/$metadata#Products(Name,Category())`
pub(crate) fn collection_context(root: &str, metadata: &EntityMetadata, projection: &Projection) -> String {
    format!(
        "{}#{}{}",
        metadata_url(root),
        metadata.entity_set(),
        projection_suffix(projection)
    )
}

/// `{root}/$metadata#Products/$entity`
pub(crate) fn entity_context(root: &str, metadata: &EntityMetadata, projection: &Projection) -> String {
    format!("{}/$entity", collection_context(root, metadata, projection))
}

/// `{root}/$metadata#Products/$delta`
pub(crate) fn delta_context(root: &str, metadata: &EntityMetadata) -> String {
    format!("{}#{}/$delta", metadata_url(root), metadata.entity_set())
}

/// `{root}/$metadata#Products(1)/Name`
pub(crate) fn property_context(root: &str, metadata: &EntityMetadata, key: &str, property: &str) -> String {
    format!(
        "{}#{}({})/{}",
        metadata_url(root),
        metadata.entity_set(),
        key,
        property
    )
}

pub(crate) fn reference_context(root: &str, collection: bool) -> String {
    if collection {
        format!("{}#Collection($ref)", metadata_url(root))
    } else {
        format!("{}#$ref", metadata_url(root))
    }
}

/// Canonical entity URL `{root}/{Set}({key})`
pub(crate) fn entity_id(root: &str, metadata: &EntityMetadata, key_segment: &str) -> String {
    format!("{}/{}({})", root, metadata.entity_set(), key_segment)
}

/// `{root}/{Set}?$deltatoken={token}`
pub(crate) fn delta_link(root: &str, entity_set: &str, token: &str) -> String {
    format!("{}/{}?$deltatoken={}", root, entity_set, token)
}

/// Parenthesized select/expand list, empty when nothing is projected
pub(crate) fn projection_suffix(projection: &Projection) -> String {
    if projection.is_empty() {
        return String::new();
    }
    format!("({})", projection_items(projection).join(","))
}

fn projection_items(projection: &Projection) -> Vec<String> {
    let mut items: Vec<String> = projection.select.clone().unwrap_or_default();
    for expansion in &projection.expand {
        let nested = projection_items(&expansion.projection).join(",");
        items.push(format!("{}({})", expansion.property, nested));
    }
    items
}
