//! Change events as delivered by the transport and forwarded to listeners.
//!
//! The multiplexer never looks inside the payloads; it only decides *when* an
//! event is forwarded. Consumers usually treat an event as a cue to re-fetch.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Kind of row-level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// A row was inserted.
    Created,
    /// A row was modified.
    Updated,
    /// A row was deleted.
    Removed,
}

/// One row-level change on a watched resource.
///
/// `new` is absent for [`ChangeKind::Removed`]; `old` depends on what the
/// change stream is configured to replicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    #[serde(default)]
    pub new: Option<JsonValue>,
    #[serde(default)]
    pub old: Option<JsonValue>,
}

impl ChangeEvent {
    pub fn created(new: JsonValue) -> Self {
        Self {
            kind: ChangeKind::Created,
            new: Some(new),
            old: None,
        }
    }

    pub fn updated(new: JsonValue, old: Option<JsonValue>) -> Self {
        Self {
            kind: ChangeKind::Updated,
            new: Some(new),
            old,
        }
    }

    pub fn removed(old: Option<JsonValue>) -> Self {
        Self {
            kind: ChangeKind::Removed,
            new: None,
            old,
        }
    }
}
