//! Metadata level negotiation (`odata.metadata=none|minimal|full`)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Response verbosity. Ordered from least to most annotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataLevel {
    None,
    #[default]
    Minimal,
    Full,
}

impl MetadataLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataLevel::None => "none",
            MetadataLevel::Minimal => "minimal",
            MetadataLevel::Full => "full",
        }
    }

    /// Extract the `odata.metadata` (or bare `metadata`) parameter from a
    /// media type such as `application/json;odata.metadata=full`.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        media_type.split(';').skip(1).find_map(|param| {
            let (name, value) = param.split_once('=')?;
            let name = name.trim();
            if name.eq_ignore_ascii_case("odata.metadata") || name.eq_ignore_ascii_case("metadata") {
                value.trim().trim_matches('"').parse().ok()
            } else {
                None
            }
        })
    }

    /// Pick the level for a request. A present `$format` wins over `Accept`
    /// even without an `odata.metadata` parameter; anything unrecognised
    /// falls back to `default`.
    pub fn negotiate(format: Option<&str>, accept: Option<&str>, default: MetadataLevel) -> Self {
        if let Some(format) = format {
            return Self::from_media_type(format).unwrap_or(default);
        }
        if let Some(accept) = accept {
            for range in accept.split(',') {
                if let Some(level) = Self::from_media_type(range) {
                    return level;
                }
            }
        }
        default
    }
}

impl FromStr for MetadataLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(MetadataLevel::None),
            "minimal" => Ok(MetadataLevel::Minimal),
            "full" => Ok(MetadataLevel::Full),
            other => Err(format!("Unknown metadata level: {}", other)),
        }
    }
}

impl fmt::Display for MetadataLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
