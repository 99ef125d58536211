//! Entity tags
//!
//! Weak entity tags (`W/"<hex>"`) derived from an entity's concurrency-token
//! property, and the `If-Match` / `If-None-Match` comparisons used for
//! conditional requests. Everything here is a pure function of its inputs.

mod conditional;

use sha2::{Digest, Sha256};

use crate::metadata::EntityMetadata;
use crate::record::Record;

pub use conditional::{Method, Precondition, evaluate_preconditions};

const WEAK_PREFIX: &str = "W/";

/// Compute the entity tag of `record`.
///
/// Returns an empty string when the metadata has no concurrency-token
/// property or the record does not carry it.
pub fn generate(record: &dyn Record, metadata: &EntityMetadata) -> String {
    let Some(property) = metadata.etag_property() else {
        return String::new();
    };
    let Some(value) = record.get(property) else {
        tracing::debug!(
            entity_set = metadata.entity_set(),
            property = %property.name,
            "Record lacks concurrency token; no ETag"
        );
        return String::new();
    };
    from_canonical(&value.canonical_string())
}

/// Weak tag over an already canonicalized token value
pub fn from_canonical(canonical: &str) -> String {
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{}\"{:x}\"", WEAK_PREFIX, digest)
}

/// Strip a weak prefix and one pair of surrounding double quotes
pub fn parse(tag: &str) -> &str {
    let tag = tag.trim();
    let tag = tag.strip_prefix(WEAK_PREFIX).unwrap_or(tag);
    match tag.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        Some(inner) => inner,
        None => tag,
    }
}

/// `If-Match` evaluation: `true` when the request may proceed.
///
/// An empty header always passes, `*` passes when the entity has a tag, and
/// a (comma-separated list of) tag(s) passes when one equals `current`.
pub fn matches(if_match: &str, current: &str) -> bool {
    let if_match = if_match.trim();
    if if_match.is_empty() {
        return true;
    }
    if if_match == "*" {
        return !current.is_empty();
    }
    any_tag_equals(if_match, current)
}

/// `If-None-Match` evaluation: `true` when the request may proceed normally.
///
/// An empty header always passes, `*` passes only when the entity has no
/// tag, and a tag list passes when none of them equals `current`.
pub fn none_match(if_none_match: &str, current: &str) -> bool {
    let if_none_match = if_none_match.trim();
    if if_none_match.is_empty() {
        return true;
    }
    if if_none_match == "*" {
        return current.is_empty();
    }
    !any_tag_equals(if_none_match, current)
}

fn any_tag_equals(header: &str, current: &str) -> bool {
    let current = parse(current);
    split_tags(header).into_iter().any(|tag| parse(tag) == current)
}

/// Split a header value into tags on commas outside of quotes
fn split_tags(header: &str) -> Vec<&str> {
    let mut tags = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (idx, ch) in header.char_indices() {
        match ch {
            '"' => quoted = !quoted,
            ',' if !quoted => {
                tags.push(header[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    tags.push(header[start..].trim());
    tags.retain(|t| !t.is_empty());
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PropertyType;
    use crate::record::FieldMap;

    fn versioned() -> EntityMetadata {
        EntityMetadata::builder("NS", "Doc", "Docs")
            .property("ID", PropertyType::Int64)
            .property("Version", PropertyType::Int64)
            .key("ID")
            .etag("Version")
            .build()
            .unwrap()
    }

    #[test]
    fn test_generate_shape() {
        let tag = generate(&FieldMap::new().with("ID", 1_i64).with("Version", 3_i64), &versioned());
        assert!(tag.starts_with("W/\""));
        assert!(tag.ends_with('"'));
        assert_eq!(parse(&tag).len(), 64);
        assert!(parse(&tag).chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_generate_matches_digest_of_canonical_string() {
        let tag = generate(&FieldMap::new().with("Version", 3_i64), &versioned());
        assert_eq!(tag, from_canonical("3"));
    }

    #[test]
    fn test_missing_token_value_gives_empty_tag() {
        assert_eq!(generate(&FieldMap::new().with("ID", 1_i64), &versioned()), "");
    }

    #[test]
    fn test_parse_variants() {
        assert_eq!(parse("W/\"abc\""), "abc");
        assert_eq!(parse("\"abc\""), "abc");
        assert_eq!(parse("abc"), "abc");
        assert_eq!(parse("W/abc"), "abc");
        assert_eq!(parse("\"abc"), "\"abc");
    }

    #[test]
    fn test_tag_lists() {
        assert!(matches("W/\"a\", W/\"b\"", "W/\"b\""));
        assert!(!matches("W/\"a\", W/\"b\"", "W/\"c\""));
        assert!(!none_match("\"x\",\"a\"", "W/\"a\""));
    }
}
