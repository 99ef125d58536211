//! Rendering of a single entity object
//!
//! Annotation matrix per metadata level:
//!
//! | annotation                    | none | minimal | full |
//! |-------------------------------|------|---------|------|
//! | `@odata.type`                 |      |         | yes  |
//! | `@odata.id`                   |      | key     | key  |
//! | `@odata.etag`                 |      | etag    | etag |
//! | `<nav>@odata.navigationLink`  |      |         | key  |
//!
//! "key" means emitted only when the entity's key resolves.

use super::SerializeError;
use super::context;
use super::json::{write_key, write_member, write_number, write_value};
use crate::etag;
use crate::metadata::{EntityMetadata, MetadataRegistry, PropertyDescriptor};
use crate::query::{Expansion, MetadataLevel, Projection};
use crate::record::{FieldMap, Record, Value};

pub(crate) struct EntityWriter<'a> {
    pub registry: &'a MetadataRegistry,
    pub root: &'a str,
    pub level: MetadataLevel,
}

impl EntityWriter<'_> {
    /// Append one entity object to `buf`
    pub fn write(
        &self,
        buf: &mut Vec<u8>,
        metadata: &EntityMetadata,
        record: &dyn Record,
        projection: &Projection,
        index: Option<usize>,
    ) -> Result<(), SerializeError> {
        buf.push(b'{');
        let mut first = true;

        let id = if self.level >= MetadataLevel::Minimal {
            self.entity_id(metadata, record)
        } else {
            None
        };

        if self.level == MetadataLevel::Full {
            let type_name = format!("#{}", metadata.qualified_type_name());
            write_member(buf, &mut first, "@odata.type", &type_name)?;
        }
        if self.level >= MetadataLevel::Minimal {
            if let Some(id) = &id {
                write_member(buf, &mut first, "@odata.id", id)?;
            }
            let tag = etag::generate(record, metadata);
            if !tag.is_empty() {
                write_member(buf, &mut first, "@odata.etag", &tag)?;
            }
        }
        if let Some(index) = index {
            write_key(buf, &mut first, "@odata.index")?;
            write_number(buf, index)?;
        }

        for property in metadata.properties() {
            if property.is_navigation() {
                if let Some(expansion) = projection.expansion(property) {
                    self.write_expanded(buf, &mut first, property, record, expansion)?;
                } else if self.level == MetadataLevel::Full && projection.selects(property) {
                    if let Some(id) = &id {
                        let key = format!("{}@odata.navigationLink", property.wire_name);
                        let link = format!("{}/{}", id, property.wire_name);
                        write_member(buf, &mut first, &key, &link)?;
                    }
                }
                continue;
            }

            if !projection.selects(property) {
                continue;
            }
            let value = record.get(property).unwrap_or(Value::Null);
            write_key(buf, &mut first, &property.wire_name)?;
            write_value(buf, &value)?;
        }

        buf.push(b'}');
        Ok(())
    }

    /// `{root}/{Set}({key})`, or `None` when the key does not resolve
    pub fn entity_id(&self, metadata: &EntityMetadata, record: &dyn Record) -> Option<String> {
        match metadata.key_segment(record) {
            Some(key) => Some(context::entity_id(self.root, metadata, &key)),
            None => {
                tracing::debug!(
                    entity_set = metadata.entity_set(),
                    "Key not resolvable; omitting id-dependent annotations"
                );
                None
            }
        }
    }

    fn write_expanded(
        &self,
        buf: &mut Vec<u8>,
        first: &mut bool,
        property: &PropertyDescriptor,
        record: &dyn Record,
        expansion: &Expansion,
    ) -> Result<(), SerializeError> {
        let target = self
            .registry
            .navigation_target(property)
            .ok_or_else(|| SerializeError::UnknownEntity {
                property: property.wire_name.clone(),
                target: property
                    .navigation
                    .as_ref()
                    .map(|n| n.entity.clone())
                    .unwrap_or_default(),
            })?;
        let value = record.get(property);

        if property.is_collection() {
            let items: Vec<FieldMap> = match value {
                Some(Value::Collection(items)) => items,
                Some(Value::Entity(one)) => vec![*one],
                _ => Vec::new(),
            };
            if expansion.count {
                write_key(buf, first, &format!("{}@odata.count", property.wire_name))?;
                write_number(buf, items.len() as i64)?;
            }
            write_key(buf, first, &property.wire_name)?;
            buf.push(b'[');
            for (position, item) in items.iter().enumerate() {
                if position > 0 {
                    buf.push(b',');
                }
                self.write(buf, target, item, &expansion.projection, None)?;
            }
            buf.push(b']');
        } else {
            let item: Option<FieldMap> = match value {
                Some(Value::Entity(one)) => Some(*one),
                Some(Value::Collection(items)) => items.into_iter().next(),
                _ => None,
            };
            if expansion.count {
                write_key(buf, first, &format!("{}@odata.count", property.wire_name))?;
                write_number(buf, i64::from(item.is_some()))?;
            }
            write_key(buf, first, &property.wire_name)?;
            match &item {
                Some(item) => self.write(buf, target, item, &expansion.projection, None)?,
                None => buf.extend_from_slice(b"null"),
            }
        }
        Ok(())
    }
}
