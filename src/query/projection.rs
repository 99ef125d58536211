//! `$select` / `$expand` projections

use super::QueryError;
use crate::metadata::PropertyDescriptor;

/// Which properties to emit and which navigations to embed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    /// Selected property names; `None` selects everything
    pub select: Option<Vec<String>>,
    pub expand: Vec<Expansion>,
}

/// One expanded navigation property with its nested projection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub property: String,
    /// Emit `<property>@odata.count`
    pub count: bool,
    pub projection: Projection,
}

impl Projection {
    /// Select all properties, expand nothing
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_select<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_expand(mut self, expansion: Expansion) -> Self {
        self.expand.push(expansion);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.select.is_none() && self.expand.is_empty()
    }

    /// Whether a structural property (or navigation link) should be emitted
    pub fn selects(&self, property: &PropertyDescriptor) -> bool {
        match &self.select {
            None => true,
            Some(names) => names.iter().any(|n| n == "*" || property.answers_to(n)),
        }
    }

    pub fn expansion(&self, property: &PropertyDescriptor) -> Option<&Expansion> {
        self.expand.iter().find(|e| property.answers_to(&e.property))
    }
}

impl Expansion {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            count: false,
            projection: Projection::default(),
        }
    }

    pub fn with_count(mut self, count: bool) -> Self {
        self.count = count;
        self
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }
}

/// Parse a `$select` value. `*` selects everything.
pub(crate) fn parse_select(value: &str) -> Result<Option<Vec<String>>, QueryError> {
    let names: Vec<String> = value
        .split(',')
        .map(|s| s.trim().to_string())
        .collect();
    if names.iter().any(String::is_empty) {
        return Err(QueryError::InvalidValue {
            option: "$select".to_string(),
            value: value.to_string(),
        });
    }
    if names.iter().any(|n| n == "*") {
        return Ok(None);
    }
    Ok(Some(names))
}

/// Parse a `$expand` value such as `Category($select=Name),Orders($count=true)`
pub(crate) fn parse_expand(value: &str) -> Result<Vec<Expansion>, QueryError> {
    let mut expansions = Vec::new();
    for item in split_top_level(value, ',')? {
        let item = item.trim();
        if item.is_empty() {
            return Err(QueryError::InvalidValue {
                option: "$expand".to_string(),
                value: value.to_string(),
            });
        }

        let (name, nested) = match item.find('(') {
            Some(open) if item.ends_with(')') => (&item[..open], Some(&item[open + 1..item.len() - 1])),
            Some(_) => return Err(QueryError::UnbalancedParentheses(item.to_string())),
            None => (item, None),
        };

        let mut expansion = Expansion::new(name.trim());
        if let Some(nested) = nested {
            apply_nested_options(&mut expansion, nested)?;
        }
        expansions.push(expansion);
    }
    Ok(expansions)
}

fn apply_nested_options(expansion: &mut Expansion, options: &str) -> Result<(), QueryError> {
    for option in split_top_level(options, ';')? {
        let option = option.trim();
        if option.is_empty() {
            continue;
        }
        let (name, value) = option
            .split_once('=')
            .ok_or_else(|| QueryError::InvalidValue {
                option: "$expand".to_string(),
                value: option.to_string(),
            })?;
        match name.trim() {
            "$select" => expansion.projection.select = parse_select(value)?,
            "$expand" => expansion.projection.expand = parse_expand(value)?,
            "$count" => expansion.count = super::parse_bool("$count", value)?,
            other => {
                tracing::debug!(option = other, "Ignoring unsupported nested expand option");
            }
        }
    }
    Ok(())
}

fn split_top_level(input: &str, delimiter: char) -> Result<Vec<&str>, QueryError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut start = 0;

    for (idx, ch) in input.char_indices() {
        match ch {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| QueryError::UnbalancedParentheses(input.to_string()))?;
            }
            c if c == delimiter && depth == 0 && !quoted => {
                parts.push(&input[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(QueryError::UnbalancedParentheses(input.to_string()));
    }
    parts.push(&input[start..]);
    Ok(parts)
}
