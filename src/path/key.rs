//! Key predicates: parsing `(…)` expressions and rendering them back

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Serialize;

use super::error::PathError;
use crate::metadata::PropertyDescriptor;
use crate::record::Value;

/// Ordered `name -> literal` pairs of a named key predicate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeyMap {
    entries: Vec<(String, String)>,
}

impl KeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair. Returns `false` (and leaves the map unchanged) when the
    /// name is already present.
    pub fn insert(&mut self, name: impl Into<String>, literal: impl Into<String>) -> bool {
        let name = name.into();
        if self.entries.iter().any(|(n, _)| *n == name) {
            return false;
        }
        self.entries.push((name, literal.into()));
        true
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Order-independent view for comparisons
    pub fn to_sorted(&self) -> BTreeMap<&str, &str> {
        self.iter().collect()
    }
}

/// Parsed content of a key predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum KeyPredicate {
    Single(String),
    Named(KeyMap),
}

/// Parse the text between the parentheses of `Set(...)`
pub(crate) fn parse_key_predicate(expr: &str) -> Result<KeyPredicate, PathError> {
    if expr.trim().is_empty() {
        return Err(PathError::EmptyKey {
            segment: format!("({})", expr),
        });
    }

    let has_assignment = match find_unquoted(expr, '=') {
        Ok(found) => found.is_some(),
        Err(err) if opens_unclosed_quote(expr.trim()) => return Err(err),
        Err(_) => false,
    };
    if !has_assignment {
        return Ok(KeyPredicate::Single(strip_quotes(expr.trim()).into_owned()));
    }

    let mut keys = KeyMap::new();
    for pair in split_unquoted(expr, ',')? {
        let eq = find_unquoted(pair, '=')?.ok_or_else(|| PathError::InvalidKeyPair {
            pair: pair.to_string(),
        })?;
        let name = pair[..eq].trim();
        let raw_value = pair[eq + 1..].trim();
        if name.is_empty() || raw_value.is_empty() {
            return Err(PathError::InvalidKeyPair {
                pair: pair.to_string(),
            });
        }
        if !keys.insert(name, strip_quotes(raw_value)) {
            return Err(PathError::DuplicateKey {
                name: name.to_string(),
            });
        }
    }
    Ok(KeyPredicate::Named(keys))
}

/// Split on `delimiter` outside of quoted spans.
///
/// One open quote character is tracked at a time; a doubled quote inside a
/// quoted span closes and immediately reopens it, which keeps `'O''Neil'`
/// intact.
pub(crate) fn split_unquoted(input: &str, delimiter: char) -> Result<Vec<&str>, PathError> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (idx, ch) in input.char_indices() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => {}
            None if ch == '\'' || ch == '"' => quote = Some(ch),
            None if ch == delimiter => {
                parts.push(&input[start..idx]);
                start = idx + ch.len_utf8();
            }
            None => {}
        }
    }

    if quote.is_some() {
        return Err(PathError::UnterminatedQuote {
            segment: input.to_string(),
        });
    }
    parts.push(&input[start..]);
    Ok(parts)
}

fn find_unquoted(input: &str, needle: char) -> Result<Option<usize>, PathError> {
    let mut quote: Option<char> = None;
    for (idx, ch) in input.char_indices() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => {}
            None if ch == '\'' || ch == '"' => quote = Some(ch),
            None if ch == needle => return Ok(Some(idx)),
            None => {}
        }
    }
    if quote.is_some() {
        return Err(PathError::UnterminatedQuote {
            segment: input.to_string(),
        });
    }
    Ok(None)
}

/// A literal that opens a quote and never uses either quote character again.
/// Mismatched pairs such as `'abc"` do not count.
fn opens_unclosed_quote(literal: &str) -> bool {
    let mut chars = literal.chars();
    match chars.next() {
        Some('\'' | '"') => !chars.any(|c| c == '\'' || c == '"'),
        _ => false,
    }
}

/// Strip one matching pair of surrounding quotes. Mismatched quotes are kept.
/// Doubled single quotes inside a single-quoted literal collapse to one.
pub(crate) fn strip_quotes(literal: &str) -> Cow<'_, str> {
    let bytes = literal.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if first == last && (first == b'\'' || first == b'"') {
            let inner = &literal[1..literal.len() - 1];
            if first == b'\'' && inner.contains("''") {
                return Cow::Owned(inner.replace("''", "'"));
            }
            return Cow::Borrowed(inner);
        }
    }
    Cow::Borrowed(literal)
}

/// Render a key predicate from key properties and their values.
///
/// A single key renders as its bare literal; composite keys render as
/// `name=literal,...` in the given order. Names and literals are
/// percent-encoded for use in a URL, except for single quotes, so that
/// `parse_path` reads the same values back. Returns `None` if any value
/// cannot be rendered as a key literal.
pub fn format_key_segment<'a, I>(keys: I) -> Option<String>
where
    I: IntoIterator<Item = (&'a PropertyDescriptor, &'a Value)>,
{
    let mut rendered: Vec<(String, String)> = Vec::new();
    for (prop, value) in keys {
        let literal = value.key_literal(prop.property_type)?;
        rendered.push((encode_key_part(&prop.wire_name), encode_key_part(&literal)));
    }

    match rendered.len() {
        0 => None,
        1 => rendered.pop().map(|(_, literal)| literal),
        _ => Some(
            rendered
                .iter()
                .map(|(name, literal)| format!("{}={}", name, literal))
                .collect::<Vec<_>>()
                .join(","),
        ),
    }
}

// Quotes stay literal so doubled `''` survives decoding as two characters.
fn encode_key_part(part: &str) -> String {
    urlencoding::encode(part).replace("%27", "'")
}
