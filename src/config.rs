//! Service configuration
//!
//! Settings shared by the serializer and the change tracker. Loadable from
//! TOML:
//!
//! ```toml
//! service_root = "https://example.com/odata"
//! default_metadata = "minimal"
//! max_page_size = 100
//!
//! [buffer_pool]
//! max_retained = 32
//! max_buffer_capacity = 65536
//!
//! [change_tracking]
//! max_events_per_set = 10000
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::MetadataLevel;

/// Error while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error with {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Parse(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}

/// Top-level service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Absolute URL of the service root, without a trailing slash
    pub service_root: String,
    /// Metadata level used when the request does not ask for one
    pub default_metadata: MetadataLevel,
    /// Server-driven page size; full pages get an `@odata.nextLink`
    pub max_page_size: Option<usize>,
    pub buffer_pool: BufferPoolConfig,
    pub change_tracking: ChangeTrackingConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_root: "http://localhost/odata".to_string(),
            default_metadata: MetadataLevel::Minimal,
            max_page_size: None,
            buffer_pool: BufferPoolConfig::default(),
            change_tracking: ChangeTrackingConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn new(service_root: impl Into<String>) -> Self {
        Self::default().with_service_root(service_root)
    }

    pub fn with_service_root(mut self, service_root: impl Into<String>) -> Self {
        self.service_root = service_root.into();
        self
    }

    pub fn with_default_metadata(mut self, level: MetadataLevel) -> Self {
        self.default_metadata = level;
        self
    }

    pub fn with_max_page_size(mut self, size: usize) -> Self {
        self.max_page_size = Some(size);
        self
    }

    pub fn with_buffer_pool(mut self, pool: BufferPoolConfig) -> Self {
        self.buffer_pool = pool;
        self
    }

    pub fn with_change_tracking(mut self, tracking: ChangeTrackingConfig) -> Self {
        self.change_tracking = tracking;
        self
    }

    /// Service root with any trailing slashes removed
    pub fn normalized_root(&self) -> &str {
        self.service_root.trim_end_matches('/')
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = toml::from_str(content)?;
        if config.max_page_size == Some(0) {
            return Err(ConfigError::Parse("max_page_size must be positive".to_string()));
        }
        if config.change_tracking.max_events_per_set == Some(0) {
            return Err(ConfigError::Parse(
                "change_tracking.max_events_per_set must be positive".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

/// Limits for pooled serialization buffers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferPoolConfig {
    /// Idle buffers kept for reuse
    pub max_retained: usize,
    /// Buffers that grew beyond this many bytes are dropped on release
    pub max_buffer_capacity: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            max_retained: 64,
            max_buffer_capacity: 64 * 1024,
        }
    }
}

/// Change log retention
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeTrackingConfig {
    /// Events kept per entity set; `None` keeps everything
    pub max_events_per_set: Option<usize>,
}
