//! Change events

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::FieldMap;

/// Kind of change recorded for an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Updated,
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "added"),
            ChangeKind::Updated => write!(f, "updated"),
            ChangeKind::Deleted => write!(f, "deleted"),
        }
    }
}

/// One entry of an entity set's change log
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub entity_set: String,
    /// Key property values identifying the entity
    pub keys: FieldMap,
    /// Snapshot of the entity after the change, if one was recorded
    pub data: Option<FieldMap>,
    pub kind: ChangeKind,
    /// Strictly increasing, gap-free within the entity set
    pub version: i64,
}

impl ChangeEvent {
    /// Fields to render for this event: the snapshot with any missing key
    /// values filled in, or just the keys when no snapshot exists.
    pub fn payload(&self) -> FieldMap {
        match &self.data {
            Some(data) => {
                let mut payload = data.clone();
                payload.merge_missing(&self.keys);
                payload
            }
            None => self.keys.clone(),
        }
    }
}
