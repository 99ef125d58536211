//! OData JSON response serialization
//!
//! [`ResponseSerializer`] renders entities, collections, change feeds,
//! references and single properties into [`SerializedResponse`]s. Entity
//! fields are written in metadata declaration order. Each entity of a
//! collection is rendered into a pooled scratch buffer and appended to the
//! envelope as bytes.

mod context;
mod entity;
mod json;
mod pool;

use std::io::Write;
use std::sync::Arc;

use thiserror::Error;

use crate::config::ServiceConfig;
use crate::metadata::{EntityMetadata, MetadataRegistry};
use crate::query::{MetadataLevel, Projection, QueryOptions};
use crate::record::{Record, Value};
use crate::tracker::{ChangeEvent, ChangeKind, DeltaToken};

use entity::EntityWriter;
use json::{write_key, write_member, write_number, write_value};

pub use pool::{BufferPool, PooledBuffer};

pub const ODATA_VERSION: &str = "4.0";

/// Error while rendering a response
#[derive(Error, Debug)]
pub enum SerializeError {
    #[error("Navigation property {property} targets unknown entity {target}")]
    UnknownEntity { property: String, target: String },

    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-request rendering options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub level: MetadataLevel,
    pub projection: Projection,
    /// Annotate each collection element with `@odata.index`
    pub index: bool,
    /// Total count for `@odata.count`
    pub count: Option<i64>,
    pub next_link: Option<String>,
    pub delta_link: Option<String>,
}

impl RenderOptions {
    pub fn new(level: MetadataLevel) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    /// Projection and `$index` from parsed query options
    pub fn from_query(query: &QueryOptions, level: MetadataLevel) -> Self {
        Self {
            level,
            projection: query.projection.clone(),
            index: query.index,
            ..Self::default()
        }
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn with_index(mut self, index: bool) -> Self {
        self.index = index;
        self
    }

    pub fn with_count(mut self, count: i64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_next_link(mut self, link: impl Into<String>) -> Self {
        self.next_link = Some(link.into());
        self
    }

    pub fn with_delta_link(mut self, link: impl Into<String>) -> Self {
        self.delta_link = Some(link.into());
        self
    }
}

/// Content headers of a rendered response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeaders {
    pub content_type: String,
    pub content_length: usize,
    pub odata_version: &'static str,
    pub etag: Option<String>,
}

impl ResponseHeaders {
    fn json(level: MetadataLevel, content_length: usize) -> Self {
        Self {
            content_type: format!("application/json;odata.metadata={};charset=utf-8", level),
            content_length,
            odata_version: ODATA_VERSION,
            etag: None,
        }
    }

    fn raw(content_type: &str, content_length: usize) -> Self {
        Self {
            content_type: content_type.to_string(),
            content_length,
            odata_version: ODATA_VERSION,
            etag: None,
        }
    }

    /// Header name/value pairs ready for an HTTP response
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("Content-Type", self.content_type.clone()),
            ("Content-Length", self.content_length.to_string()),
            ("OData-Version", self.odata_version.to_string()),
        ];
        if let Some(etag) = &self.etag {
            pairs.push(("ETag", etag.clone()));
        }
        pairs
    }
}

/// A rendered body with its headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedResponse {
    pub body: Vec<u8>,
    pub headers: ResponseHeaders,
}

impl SerializedResponse {
    fn new(body: Vec<u8>, mut headers: ResponseHeaders) -> Self {
        headers.content_length = body.len();
        Self { body, headers }
    }

    /// Body as text, if it is valid UTF-8
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Response to a HEAD request: headers of the full render, no body
    pub fn into_head(mut self) -> Self {
        self.body = Vec::new();
        self
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), SerializeError> {
        writer.write_all(&self.body)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<serde_json::Value, SerializeError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Renders OData JSON payloads for the entity sets of one service
#[derive(Debug)]
pub struct ResponseSerializer {
    registry: Arc<MetadataRegistry>,
    service_root: String,
    default_level: MetadataLevel,
    max_page_size: Option<usize>,
    pool: BufferPool,
}

impl ResponseSerializer {
    pub fn new(registry: Arc<MetadataRegistry>, config: &ServiceConfig) -> Self {
        Self {
            registry,
            service_root: config.normalized_root().to_string(),
            default_level: config.default_metadata,
            max_page_size: config.max_page_size,
            pool: BufferPool::from_config(&config.buffer_pool),
        }
    }

    pub fn registry(&self) -> &MetadataRegistry {
        &self.registry
    }

    pub fn service_root(&self) -> &str {
        &self.service_root
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Options for a request: level from `$format`/`Accept`, projection and
    /// `$index` from the query
    pub fn render_options(&self, query: &QueryOptions, accept: Option<&str>) -> RenderOptions {
        let level = query.metadata_level(accept, self.default_level);
        RenderOptions::from_query(query, level)
    }

    fn writer(&self, level: MetadataLevel) -> EntityWriter<'_> {
        EntityWriter {
            registry: &self.registry,
            root: &self.service_root,
            level,
        }
    }

    /// Render a collection envelope. An empty input renders `"value":[]`.
    pub fn render_collection<I>(
        &self,
        metadata: &EntityMetadata,
        records: I,
        options: &RenderOptions,
    ) -> Result<SerializedResponse, SerializeError>
    where
        I: IntoIterator,
        I::Item: Record,
    {
        let writer = self.writer(options.level);
        let mut body = Vec::with_capacity(256);
        let mut first = true;
        body.push(b'{');

        if options.level >= MetadataLevel::Minimal {
            let context = context::collection_context(&self.service_root, metadata, &options.projection);
            write_member(&mut body, &mut first, "@odata.context", &context)?;
        }
        if let Some(count) = options.count {
            write_key(&mut body, &mut first, "@odata.count")?;
            write_number(&mut body, count)?;
        }

        write_key(&mut body, &mut first, "value")?;
        body.push(b'[');
        let mut scratch = self.pool.acquire();
        let mut rendered = 0usize;
        for (position, record) in records.into_iter().enumerate() {
            scratch.clear();
            let index = options.index.then_some(position);
            writer.write(&mut scratch, metadata, &record, &options.projection, index)?;
            if position > 0 {
                body.push(b',');
            }
            body.extend_from_slice(&scratch);
            rendered += 1;
        }
        drop(scratch);
        body.push(b']');

        self.write_links(&mut body, &mut first, options)?;
        body.push(b'}');

        tracing::debug!(
            entity_set = metadata.entity_set(),
            entities = rendered,
            bytes = body.len(),
            level = %options.level,
            "Rendered collection"
        );
        Ok(SerializedResponse::new(body, ResponseHeaders::json(options.level, 0)))
    }

    /// Render a single entity. Carries the `ETag` header when the entity has one.
    pub fn render_entity(
        &self,
        metadata: &EntityMetadata,
        record: &dyn Record,
        options: &RenderOptions,
    ) -> Result<SerializedResponse, SerializeError> {
        let mut scratch = self.pool.acquire();
        self.writer(options.level)
            .write(&mut scratch, metadata, record, &options.projection, None)?;

        let mut body = Vec::with_capacity(scratch.len() + 128);
        let mut first = true;
        body.push(b'{');
        if options.level >= MetadataLevel::Minimal {
            let context = context::entity_context(&self.service_root, metadata, &options.projection);
            write_member(&mut body, &mut first, "@odata.context", &context)?;
        }
        // Splice the entity's members after the context
        if scratch.len() > 2 {
            if !first {
                body.push(b',');
            }
            body.extend_from_slice(&scratch[1..]);
        } else {
            body.push(b'}');
        }
        drop(scratch);

        let mut headers = ResponseHeaders::json(options.level, 0);
        let tag = crate::etag::generate(record, metadata);
        if !tag.is_empty() {
            headers.etag = Some(tag);
        }
        Ok(SerializedResponse::new(body, headers))
    }

    /// Render tracker events as a delta payload ending in an `@odata.deltaLink`
    /// for `token`.
    ///
    /// Added and updated entities render as entity objects; deleted ones as
    /// `@odata.removed` entries carrying their key values.
    pub fn render_changes(
        &self,
        metadata: &EntityMetadata,
        events: &[ChangeEvent],
        token: &DeltaToken,
        options: &RenderOptions,
    ) -> Result<SerializedResponse, SerializeError> {
        let writer = self.writer(options.level);
        let mut body = Vec::with_capacity(256);
        let mut first = true;
        body.push(b'{');

        if options.level >= MetadataLevel::Minimal {
            let context = context::delta_context(&self.service_root, metadata);
            write_member(&mut body, &mut first, "@odata.context", &context)?;
        }
        if let Some(count) = options.count {
            write_key(&mut body, &mut first, "@odata.count")?;
            write_number(&mut body, count)?;
        }

        write_key(&mut body, &mut first, "value")?;
        body.push(b'[');
        let mut scratch = self.pool.acquire();
        for (position, event) in events.iter().enumerate() {
            scratch.clear();
            match event.kind {
                ChangeKind::Deleted => self.write_removed(&mut scratch, &writer, metadata, event)?,
                ChangeKind::Added | ChangeKind::Updated => {
                    let payload = event.payload();
                    let index = options.index.then_some(position);
                    writer.write(&mut scratch, metadata, &payload, &options.projection, index)?;
                }
            }
            if position > 0 {
                body.push(b',');
            }
            body.extend_from_slice(&scratch);
        }
        drop(scratch);
        body.push(b']');

        if let Some(next) = &options.next_link {
            write_member(&mut body, &mut first, "@odata.nextLink", next)?;
        }
        let delta_link = self.delta_link(token);
        write_member(&mut body, &mut first, "@odata.deltaLink", &delta_link)?;
        body.push(b'}');

        tracing::debug!(
            entity_set = metadata.entity_set(),
            events = events.len(),
            version = token.version(),
            "Rendered change feed"
        );
        Ok(SerializedResponse::new(body, ResponseHeaders::json(options.level, 0)))
    }

    fn write_removed(
        &self,
        buf: &mut Vec<u8>,
        writer: &EntityWriter<'_>,
        metadata: &EntityMetadata,
        event: &ChangeEvent,
    ) -> Result<(), SerializeError> {
        buf.push(b'{');
        let mut first = true;
        write_key(buf, &mut first, "@odata.removed")?;
        buf.extend_from_slice(br#"{"reason":"deleted"}"#);
        if writer.level >= MetadataLevel::Minimal {
            if let Some(id) = writer.entity_id(metadata, &event.keys) {
                write_member(buf, &mut first, "@odata.id", &id)?;
            }
        }
        for property in metadata.key_properties() {
            let value = event.keys.get(property).unwrap_or(Value::Null);
            write_key(buf, &mut first, &property.wire_name)?;
            write_value(buf, &value)?;
        }
        buf.push(b'}');
        Ok(())
    }

    /// Render the entity ids of a collection (`.../$ref`). Records without a
    /// resolvable key are skipped.
    pub fn render_references<I>(
        &self,
        metadata: &EntityMetadata,
        records: I,
        options: &RenderOptions,
    ) -> Result<SerializedResponse, SerializeError>
    where
        I: IntoIterator,
        I::Item: Record,
    {
        let writer = self.writer(MetadataLevel::Minimal);
        let mut body = Vec::with_capacity(128);
        let mut first = true;
        body.push(b'{');
        if options.level >= MetadataLevel::Minimal {
            let context = context::reference_context(&self.service_root, true);
            write_member(&mut body, &mut first, "@odata.context", &context)?;
        }
        if let Some(count) = options.count {
            write_key(&mut body, &mut first, "@odata.count")?;
            write_number(&mut body, count)?;
        }

        write_key(&mut body, &mut first, "value")?;
        body.push(b'[');
        let mut emitted = 0usize;
        for record in records {
            let Some(id) = writer.entity_id(metadata, &record) else {
                continue;
            };
            if emitted > 0 {
                body.push(b',');
            }
            let mut item_first = true;
            body.push(b'{');
            write_member(&mut body, &mut item_first, "@odata.id", &id)?;
            body.push(b'}');
            emitted += 1;
        }
        body.push(b']');

        self.write_links(&mut body, &mut first, options)?;
        body.push(b'}');
        Ok(SerializedResponse::new(body, ResponseHeaders::json(options.level, 0)))
    }

    /// Render the id of a single entity (`.../Nav/$ref` to a single-valued navigation)
    pub fn render_reference(
        &self,
        metadata: &EntityMetadata,
        record: &dyn Record,
        options: &RenderOptions,
    ) -> Result<SerializedResponse, SerializeError> {
        let mut body = Vec::with_capacity(128);
        let mut first = true;
        body.push(b'{');
        if options.level >= MetadataLevel::Minimal {
            let context = context::reference_context(&self.service_root, false);
            write_member(&mut body, &mut first, "@odata.context", &context)?;
        }
        if let Some(id) = self.writer(MetadataLevel::Minimal).entity_id(metadata, record) {
            write_member(&mut body, &mut first, "@odata.id", &id)?;
        }
        body.push(b'}');
        Ok(SerializedResponse::new(body, ResponseHeaders::json(options.level, 0)))
    }

    /// Render one property of an entity as `{"@odata.context":..,"value":..}`
    pub fn render_property(
        &self,
        metadata: &EntityMetadata,
        record: &dyn Record,
        property: &str,
        options: &RenderOptions,
    ) -> Result<SerializedResponse, SerializeError> {
        let descriptor = metadata
            .property(property)
            .ok_or_else(|| SerializeError::UnknownProperty(property.to_string()))?;
        let value = record.get(descriptor).unwrap_or(Value::Null);

        let mut body = Vec::with_capacity(128);
        let mut first = true;
        body.push(b'{');
        if options.level >= MetadataLevel::Minimal {
            match metadata.key_segment(record) {
                Some(key) => {
                    let context =
                        context::property_context(&self.service_root, metadata, &key, &descriptor.wire_name);
                    write_member(&mut body, &mut first, "@odata.context", &context)?;
                }
                None => tracing::debug!(
                    entity_set = metadata.entity_set(),
                    property,
                    "Key not resolvable; omitting property context"
                ),
            }
        }
        write_key(&mut body, &mut first, "value")?;
        write_value(&mut body, &value)?;
        body.push(b'}');

        let mut headers = ResponseHeaders::json(options.level, 0);
        let tag = crate::etag::generate(record, metadata);
        if !tag.is_empty() {
            headers.etag = Some(tag);
        }
        Ok(SerializedResponse::new(body, headers))
    }

    /// Plain-text body for `.../$count`
    pub fn render_count(&self, count: i64) -> SerializedResponse {
        SerializedResponse::new(count.to_string().into_bytes(), ResponseHeaders::raw("text/plain", 0))
    }

    /// Raw body for `.../$value`: bytes for binaries, text otherwise.
    /// Null renders an empty body.
    pub fn render_raw_value(&self, value: &Value) -> SerializedResponse {
        match value {
            Value::Binary(bytes) => {
                SerializedResponse::new(bytes.clone(), ResponseHeaders::raw("application/octet-stream", 0))
            }
            Value::Null => SerializedResponse::new(Vec::new(), ResponseHeaders::raw("text/plain", 0)),
            other => SerializedResponse::new(
                other.to_string().into_bytes(),
                ResponseHeaders::raw("text/plain;charset=utf-8", 0),
            ),
        }
    }

    /// `@odata.nextLink` for a page of `returned` entities, or `None` when
    /// the page was not cut by the server page size.
    ///
    /// `raw_query` is the request's query string; `$skip`/`$skiptoken` are
    /// replaced by a `$skiptoken` for the next offset and all other options
    /// are kept.
    pub fn next_link(&self, metadata: &EntityMetadata, raw_query: &str, returned: usize) -> Option<String> {
        let page_size = self.max_page_size?;
        if returned < page_size {
            return None;
        }

        let raw_query = raw_query.strip_prefix('?').unwrap_or(raw_query);
        let mut offset = 0usize;
        let mut top: Option<usize> = None;
        let mut kept: Vec<&str> = Vec::new();
        for pair in raw_query.split('&').filter(|p| !p.is_empty()) {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            match name {
                "$skip" | "$skiptoken" => offset += value.parse::<usize>().unwrap_or(0),
                "$top" => {
                    top = value.parse().ok();
                    kept.push(pair);
                }
                _ => kept.push(pair),
            }
        }
        if top.is_some_and(|t| returned >= t) {
            return None;
        }

        kept.push("");
        let query = kept.join("&");
        Some(format!(
            "{}/{}?{}$skiptoken={}",
            self.service_root,
            metadata.entity_set(),
            query,
            offset + returned
        ))
    }

    /// `{root}/{Set}?$deltatoken=...` for a tracker token
    pub fn delta_link(&self, token: &DeltaToken) -> String {
        context::delta_link(&self.service_root, token.entity_set(), &token.encode())
    }

    fn write_links(&self, buf: &mut Vec<u8>, first: &mut bool, options: &RenderOptions) -> Result<(), SerializeError> {
        if let Some(next) = &options.next_link {
            write_member(buf, first, "@odata.nextLink", next)?;
        }
        if let Some(delta) = &options.delta_link {
            write_member(buf, first, "@odata.deltaLink", delta)?;
        }
        Ok(())
    }
}
