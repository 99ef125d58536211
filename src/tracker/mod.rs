//! Change tracking and delta tokens
//!
//! Keeps an append-only change log per entity set. Each recorded change
//! gets the next version number of its set; delta tokens capture a set and a
//! version, and [`ChangeTracker::changes_since`] replays everything recorded
//! after that version.
//!
//! Version increments and log appends happen under one write lock, so a
//! reader never sees a version without its event.

mod error;
mod event;
mod token;

use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock};

pub use error::{TrackerError, TrackerResult};
pub use event::{ChangeEvent, ChangeKind};
pub use token::DeltaToken;

use crate::config::ChangeTrackingConfig;
use crate::record::FieldMap;

#[derive(Debug, Default)]
struct ChangeLog {
    version: i64,
    /// Oldest version a token may carry and still be served
    floor: i64,
    events: VecDeque<ChangeEvent>,
}

/// Shared, thread-safe change log keyed by entity set
#[derive(Debug, Default)]
pub struct ChangeTracker {
    sets: RwLock<HashMap<String, ChangeLog>>,
    max_events_per_set: Option<usize>,
}

impl ChangeTracker {
    /// Tracker with an unbounded log
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ChangeTrackingConfig) -> Self {
        Self {
            sets: RwLock::new(HashMap::new()),
            max_events_per_set: config.max_events_per_set.map(|max| max.max(1)),
        }
    }

    /// Keep at most `max_events` per set; older events are compacted away
    pub fn with_retention(mut self, max_events: usize) -> Self {
        self.max_events_per_set = Some(max_events.max(1));
        self
    }

    /// Start tracking a set. Registering an already tracked set keeps its log.
    pub fn register_entity(&self, entity_set: &str) {
        let mut sets = self.sets.write().unwrap_or_else(PoisonError::into_inner);
        if !sets.contains_key(entity_set) {
            tracing::debug!(entity_set, "Registered entity set for change tracking");
            sets.insert(entity_set.to_string(), ChangeLog::default());
        }
    }

    pub fn is_registered(&self, entity_set: &str) -> bool {
        self.sets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(entity_set)
    }

    /// Append a change and return its version.
    ///
    /// `keys` and `data` are copied; later changes to the caller's maps do not
    /// affect the log.
    pub fn record_change(
        &self,
        entity_set: &str,
        keys: &FieldMap,
        data: Option<&FieldMap>,
        kind: ChangeKind,
    ) -> TrackerResult<i64> {
        let mut sets = self.sets.write().unwrap_or_else(PoisonError::into_inner);
        let log = sets
            .get_mut(entity_set)
            .ok_or_else(|| TrackerError::UnregisteredEntitySet(entity_set.to_string()))?;

        log.version += 1;
        let version = log.version;
        log.events.push_back(ChangeEvent {
            entity_set: entity_set.to_string(),
            keys: keys.clone(),
            data: data.cloned(),
            kind,
            version,
        });

        if let Some(max) = self.max_events_per_set {
            let mut dropped = 0usize;
            while log.events.len() > max {
                if let Some(oldest) = log.events.pop_front() {
                    log.floor = oldest.version;
                    dropped += 1;
                }
            }
            if dropped > 0 {
                tracing::info!(entity_set, dropped, floor = log.floor, "Compacted change log");
            }
        }

        tracing::debug!(entity_set, version, %kind, "Recorded change");
        Ok(version)
    }

    /// Token for the set's current version
    pub fn current_token(&self, entity_set: &str) -> TrackerResult<DeltaToken> {
        let sets = self.sets.read().unwrap_or_else(PoisonError::into_inner);
        let log = sets
            .get(entity_set)
            .ok_or_else(|| TrackerError::UnregisteredEntitySet(entity_set.to_string()))?;
        Ok(DeltaToken::new(entity_set, log.version))
    }

    pub fn current_version(&self, entity_set: &str) -> TrackerResult<i64> {
        self.current_token(entity_set).map(|t| t.version())
    }

    /// All events recorded after `token`, plus a token for the current version.
    ///
    /// Replaying the returned token yields only events recorded afterwards.
    pub fn changes_since(&self, token: &str) -> TrackerResult<(Vec<ChangeEvent>, DeltaToken)> {
        let token = DeltaToken::decode(token)?;
        self.changes_since_token(&token)
    }

    /// Same as [`changes_since`](Self::changes_since) for an already decoded token
    pub fn changes_since_token(&self, token: &DeltaToken) -> TrackerResult<(Vec<ChangeEvent>, DeltaToken)> {
        let sets = self.sets.read().unwrap_or_else(PoisonError::into_inner);
        let entity_set = token.entity_set();
        let log = sets.get(entity_set).ok_or_else(|| {
            tracing::warn!(entity_set, "Delta token references an untracked entity set");
            TrackerError::UnregisteredEntitySet(entity_set.to_string())
        })?;

        let since = token.version();
        if since > log.version {
            tracing::warn!(entity_set, since, current = log.version, "Delta token is ahead of the log");
            return Err(TrackerError::UnknownDeltaToken {
                entity_set: entity_set.to_string(),
                version: since,
                current: log.version,
            });
        }
        if since < log.floor {
            tracing::warn!(entity_set, since, floor = log.floor, "Delta token has expired");
            return Err(TrackerError::ExpiredDeltaToken {
                entity_set: entity_set.to_string(),
                version: since,
                floor: log.floor,
            });
        }

        let start = log.events.partition_point(|e| e.version <= since);
        let events: Vec<ChangeEvent> = log.events.range(start..).cloned().collect();
        Ok((events, DeltaToken::new(entity_set, log.version)))
    }

    /// Entity set a token refers to; fails for corrupt tokens and untracked sets
    pub fn entity_set_from_token(&self, token: &str) -> TrackerResult<String> {
        let token = DeltaToken::decode(token)?;
        if !self.is_registered(token.entity_set()) {
            return Err(TrackerError::UnregisteredEntitySet(token.entity_set().to_string()));
        }
        Ok(token.entity_set().to_string())
    }
}
