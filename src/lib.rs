//! OData Protocol SDK - protocol core for OData v4 services
//!
//! Provides:
//! - Resource path parsing (entity sets, key predicates, navigation, `$count`/`$ref`/`$value`)
//! - System query options and metadata-level negotiation
//! - JSON response serialization with `none`/`minimal`/`full` metadata
//! - Weak entity tags and `If-Match`/`If-None-Match` evaluation
//! - Per-entity-set change tracking with opaque delta tokens
//!
//! The crate performs no I/O of its own; records are supplied already
//! materialized by the storage layer.

pub mod config;
pub mod etag;
pub mod metadata;
pub mod path;
pub mod query;
pub mod record;
pub mod serialize;
pub mod tracker;

pub use config::{BufferPoolConfig, ChangeTrackingConfig, ConfigError, ServiceConfig};
pub use etag::{Method, Precondition, evaluate_preconditions};
pub use metadata::{
    Cardinality, EntityMetadata, EntityMetadataBuilder, MetadataError, MetadataRegistry, NavigationTarget,
    PropertyDescriptor, PropertyType,
};
pub use path::{KeyMap, ParsedPath, PathError, format_key_segment, parse_path};
pub use query::{Expansion, MetadataLevel, Projection, QueryError, QueryOptions};
pub use record::{FieldMap, Record, RecordError, TypedRecord, Value};
pub use serialize::{
    BufferPool, RenderOptions, ResponseHeaders, ResponseSerializer, SerializeError, SerializedResponse,
};
pub use tracker::{ChangeEvent, ChangeKind, ChangeTracker, DeltaToken, TrackerError, TrackerResult};
