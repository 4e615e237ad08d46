//! Relay data types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// "Object finalized" notification delivered by the object store.
///
/// Only the fields the relay needs are decoded; the rest of the payload is ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEvent {
    pub bucket: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<String>,
}

impl StorageEvent {
    pub fn new(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            name: name.into(),
            generation: None,
        }
    }

    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// Identifies one remote object for the duration of an invocation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectReference {
    pub container: String,
    pub name: String,
}

impl From<&StorageEvent> for ObjectReference {
    fn from(event: &StorageEvent) -> Self {
        Self {
            container: event.bucket.clone(),
            name: event.name.clone(),
        }
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.name)
    }
}

/// Names derived from an object name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivedNames {
    /// Archive member name and local archive stem, e.g. `data.csv`.
    pub entry_name: String,
    /// Remote archive stem, e.g. `data`.
    pub base_name: String,
}

/// Why an event was skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    OtherBucket,
    OutsideWatchedFolder,
    EmptyEntryName,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IgnoreReason::OtherBucket => "object is in another bucket",
            IgnoreReason::OutsideWatchedFolder => "object is outside the watched folder",
            IgnoreReason::EmptyEntryName => "object name has nothing left after trimming",
        };
        f.write_str(s)
    }
}

/// Successful result of one invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Ignored {
        reason: IgnoreReason,
    },
    Delivered {
        local_archive: PathBuf,
        remote_path: String,
        bytes: usize,
    },
}

impl RunOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, RunOutcome::Delivered { .. })
    }
}
