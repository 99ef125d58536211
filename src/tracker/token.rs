//! Delta tokens
//!
//! A token is the URL-safe base64 (no padding) encoding of the compact JSON
//! object `{"s": <entity set>, "v": <version>}`. Callers treat it as opaque.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use super::error::TrackerError;

/// Cursor into an entity set's change log
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeltaToken {
    #[serde(rename = "s")]
    entity_set: String,
    #[serde(rename = "v")]
    version: i64,
}

impl DeltaToken {
    pub fn new(entity_set: impl Into<String>, version: i64) -> Self {
        Self {
            entity_set: entity_set.into(),
            version,
        }
    }

    pub fn entity_set(&self) -> &str {
        &self.entity_set
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn encode(&self) -> String {
        let json = serde_json::json!({ "s": self.entity_set, "v": self.version });
        URL_SAFE_NO_PAD.encode(json.to_string())
    }

    pub fn decode(token: &str) -> Result<Self, TrackerError> {
        let token = token.trim();
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| TrackerError::CorruptDeltaToken(e.to_string()))?;
        let decoded: DeltaToken = serde_json::from_slice(&bytes)
            .map_err(|e| TrackerError::CorruptDeltaToken(e.to_string()))?;
        if decoded.entity_set.is_empty() {
            return Err(TrackerError::CorruptDeltaToken("missing entity set".to_string()));
        }
        if decoded.version < 0 {
            return Err(TrackerError::CorruptDeltaToken(format!(
                "negative version {}",
                decoded.version
            )));
        }
        Ok(decoded)
    }
}

impl fmt::Display for DeltaToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for DeltaToken {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
