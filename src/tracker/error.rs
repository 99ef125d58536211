//! Error types for change tracking

use thiserror::Error;

/// Errors returned by the change tracker.
///
/// None of these degrade to an empty change set: an empty result must only
/// ever mean "fully synchronized".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// Operation on an entity set that was never registered
    #[error("Entity set is not tracked: {0}")]
    UnregisteredEntitySet(String),

    /// Token is not a valid encoding
    #[error("Corrupt delta token: {0}")]
    CorruptDeltaToken(String),

    /// Token refers to a version the set has not reached
    #[error("Unknown delta token for '{entity_set}': version {version} is ahead of {current}")]
    UnknownDeltaToken {
        entity_set: String,
        version: i64,
        current: i64,
    },

    /// Token predates the retained change window; the client must resynchronize
    #[error("Expired delta token for '{entity_set}': version {version} is older than {floor}")]
    ExpiredDeltaToken {
        entity_set: String,
        version: i64,
        floor: i64,
    },
}

pub type TrackerResult<T> = Result<T, TrackerError>;
