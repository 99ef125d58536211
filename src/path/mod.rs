//! Resource path parsing
//!
//! Turns the part of a request URL after the service root into a
//! [`ParsedPath`]: entity set, key predicate, optional type cast, navigation
//! and property segments, and the `$count` / `$ref` / `$value` suffixes.
//!
//! ```rust
//! use odata_protocol_sdk::path::parse_path;
//!
//! let parsed = parse_path("Products(1)/Category/$ref").unwrap();
//! assert_eq!(parsed.entity_set, "Products");
//! assert_eq!(parsed.key.as_deref(), Some("1"));
//! assert_eq!(parsed.navigation_property.as_deref(), Some("Category"));
//! assert!(parsed.is_ref);
//! ```

mod error;
pub mod key;

use serde::Serialize;

pub use error::PathError;
pub use key::{KeyMap, format_key_segment};

use key::{KeyPredicate, parse_key_predicate};

/// Reserved suffix segments
pub const COUNT_SEGMENT: &str = "$count";
pub const REF_SEGMENT: &str = "$ref";
pub const VALUE_SEGMENT: &str = "$value";

/// Structured address produced from a resource path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedPath {
    pub entity_set: String,
    /// Single key literal. Also set when a named predicate has exactly one pair.
    pub key: Option<String>,
    /// Named key pairs in predicate order
    pub key_map: KeyMap,
    /// First addressed segment after the entity (and optional type cast)
    pub navigation_property: Option<String>,
    /// All addressed segments after the entity, starting with the navigation segment
    pub property_path: Vec<String>,
    /// Namespace-qualified type cast directly after the entity
    pub type_cast: Option<String>,
    pub is_count: bool,
    pub is_value: bool,
    pub is_ref: bool,
}

impl ParsedPath {
    pub fn has_key(&self) -> bool {
        self.key.is_some() || !self.key_map.is_empty()
    }

    pub fn is_composite_key(&self) -> bool {
        self.key_map.len() > 1
    }

    /// Property path joined with `/`
    pub fn property_path_display(&self) -> String {
        self.property_path.join("/")
    }

    /// Literal for a named key, falling back to the single literal
    pub fn key_value(&self, name: &str) -> Option<&str> {
        self.key_map.get(name).or(if self.key_map.is_empty() {
            self.key.as_deref()
        } else {
            None
        })
    }
}

/// Parse a resource path.
///
/// One leading `/` is stripped. Empty segments are tolerated only at the very
/// start or end; anywhere else they are an error.
pub fn parse_path(path: &str) -> Result<ParsedPath, PathError> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let raw: Vec<&str> = trimmed.split('/').collect();
    let last = raw.len() - 1;

    let mut segments: Vec<String> = Vec::with_capacity(raw.len());
    for (position, segment) in raw.iter().enumerate() {
        if segment.is_empty() {
            if position == 0 || position == last {
                continue;
            }
            tracing::debug!(path, position, "Rejected path with empty segment");
            return Err(PathError::EmptySegment { position });
        }
        segments.push(decode_segment(segment)?);
    }

    let Some((first, rest)) = segments.split_first() else {
        return Err(PathError::EmptyPath);
    };

    let mut parsed = ParsedPath::default();
    let (entity_set, predicate) = split_entity_segment(first)?;
    parsed.entity_set = entity_set.to_string();

    match predicate {
        None => {}
        Some(expr) => match parse_key_predicate(expr)? {
            KeyPredicate::Single(literal) => parsed.key = Some(literal),
            KeyPredicate::Named(keys) => {
                if keys.len() == 1 {
                    parsed.key = keys.iter().next().map(|(_, v)| v.to_string());
                }
                parsed.key_map = keys;
            }
        },
    }

    let mut remaining = rest.iter().peekable();
    if let Some(candidate) = remaining.peek() {
        if is_type_cast(candidate) {
            parsed.type_cast = Some(candidate.to_string());
            remaining.next();
        }
    }

    for segment in remaining {
        match segment.as_str() {
            COUNT_SEGMENT => parsed.is_count = true,
            REF_SEGMENT => parsed.is_ref = true,
            VALUE_SEGMENT => parsed.is_value = true,
            other => {
                if parsed.navigation_property.is_none() {
                    parsed.navigation_property = Some(other.to_string());
                }
                parsed.property_path.push(other.to_string());
            }
        }
    }

    Ok(parsed)
}

/// Type casts are namespace-qualified: contain a dot, no parentheses, don't
/// start with `$`, and the last dotted part starts with an uppercase letter.
pub fn is_type_cast(segment: &str) -> bool {
    if segment.starts_with('$') || segment.contains('(') || segment.contains(')') {
        return false;
    }
    match segment.rsplit_once('.') {
        Some((_, name)) => name.chars().next().is_some_and(char::is_uppercase),
        None => false,
    }
}

fn split_entity_segment(segment: &str) -> Result<(&str, Option<&str>), PathError> {
    let Some(open) = segment.find('(') else {
        if segment.contains(')') {
            return Err(PathError::UnbalancedParentheses {
                segment: segment.to_string(),
            });
        }
        return Ok((segment, None));
    };

    if !segment.ends_with(')') {
        return Err(PathError::UnbalancedParentheses {
            segment: segment.to_string(),
        });
    }
    let name = &segment[..open];
    if name.is_empty() {
        return Err(PathError::MissingEntitySet {
            segment: segment.to_string(),
        });
    }
    Ok((name, Some(&segment[open + 1..segment.len() - 1])))
}

fn decode_segment(segment: &str) -> Result<String, PathError> {
    if !segment.contains('%') {
        return Ok(segment.to_string());
    }
    urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| PathError::InvalidEncoding {
            segment: segment.to_string(),
        })
}
