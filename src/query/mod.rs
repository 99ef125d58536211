//! System query options
//!
//! Parses the subset of system query options that shape a response:
//! `$select`, `$expand`, `$count`, `$index`, `$format`, `$top`, `$skip`,
//! `$skiptoken` and `$deltatoken`. Any other option is kept verbatim in
//! [`QueryOptions::custom`]. Filtering and ordering are left to the storage
//! layer.

mod level;
mod projection;

use thiserror::Error;

pub use level::MetadataLevel;
pub use projection::{Expansion, Projection};

/// Malformed system query option
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid value '{value}' for {option}")]
    InvalidValue { option: String, value: String },

    #[error("System query option {0} specified more than once")]
    DuplicateOption(String),

    #[error("Unbalanced parentheses in '{0}'")]
    UnbalancedParentheses(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid percent-encoding in '{0}'")]
    InvalidEncoding(String),
}

/// Parsed system query options of one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub projection: Projection,
    pub count: bool,
    pub index: bool,
    /// Raw `$format` value, if JSON was requested explicitly
    pub format: Option<String>,
    pub top: Option<usize>,
    pub skip: Option<usize>,
    pub skip_token: Option<String>,
    pub delta_token: Option<String>,
    /// Non-system options in request order
    pub custom: Vec<(String, String)>,
}

impl QueryOptions {
    /// Parse a query string, with or without the leading `?`
    pub fn parse(query: &str) -> Result<Self, QueryError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut options = QueryOptions::default();
        let mut seen: Vec<String> = Vec::new();

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (raw_name, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let name = decode(raw_name)?;
            let value = decode(raw_value)?;

            if name.starts_with('$') {
                if seen.contains(&name) {
                    return Err(QueryError::DuplicateOption(name));
                }
                seen.push(name.clone());
            }

            match name.as_str() {
                "$select" => options.projection.select = projection::parse_select(&value)?,
                "$expand" => options.projection.expand = projection::parse_expand(&value)?,
                "$count" => options.count = parse_bool("$count", &value)?,
                "$index" => options.index = value.is_empty() || parse_bool("$index", &value)?,
                "$format" => options.format = Some(parse_format(&value)?),
                "$top" => options.top = Some(parse_usize("$top", &value)?),
                "$skip" => options.skip = Some(parse_usize("$skip", &value)?),
                "$skiptoken" => options.skip_token = Some(value),
                "$deltatoken" => options.delta_token = Some(value),
                _ => options.custom.push((name, value)),
            }
        }

        Ok(options)
    }

    /// Resolve the metadata level from `$format` and an `Accept` header
    pub fn metadata_level(&self, accept: Option<&str>, default: MetadataLevel) -> MetadataLevel {
        MetadataLevel::negotiate(self.format.as_deref(), accept, default)
    }

    /// Row offset implied by `$skip` plus a numeric `$skiptoken`
    pub fn offset(&self) -> usize {
        let token = self
            .skip_token
            .as_deref()
            .and_then(|t| t.parse::<usize>().ok())
            .unwrap_or(0);
        self.skip.unwrap_or(0) + token
    }
}

fn decode(raw: &str) -> Result<String, QueryError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|d| d.into_owned())
        .map_err(|_| QueryError::InvalidEncoding(raw.to_string()))
}

pub(crate) fn parse_bool(option: &str, value: &str) -> Result<bool, QueryError> {
    match value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(QueryError::InvalidValue {
            option: option.to_string(),
            value: other.to_string(),
        }),
    }
}

fn parse_usize(option: &str, value: &str) -> Result<usize, QueryError> {
    value.trim().parse().map_err(|_| QueryError::InvalidValue {
        option: option.to_string(),
        value: value.to_string(),
    })
}

/// Only JSON is produced; accept `json` or an `application/json` media type
fn parse_format(value: &str) -> Result<String, QueryError> {
    let media = value.split(';').next().unwrap_or("").trim();
    if media.eq_ignore_ascii_case("json") || media.eq_ignore_ascii_case("application/json") {
        Ok(value.to_string())
    } else {
        Err(QueryError::UnsupportedFormat(value.to_string()))
    }
}
