use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a recorded repository event. `Merge` is synthesized from a
/// `pull_request` delivery, it is never an upstream event type of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Push,
    PullRequest,
    Merge,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Push => write!(f, "push"),
            EventKind::PullRequest => write!(f, "pull_request"),
            EventKind::Merge => write!(f, "merge"),
        }
    }
}

/// Canonical, storage-ready representation of one webhook delivery.
///
/// Missing upstream fields degrade to defaults (`"unknown"` author, empty
/// branch) rather than failing; `timestamp_was_inferred` marks records whose
/// `event_timestamp` fell back to ingestion time because the upstream value
/// was absent or unparseable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub kind: EventKind,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_branch: Option<String>,
    pub to_branch: String,
    pub event_timestamp: DateTime<Utc>,
    pub timestamp_was_inferred: bool,
    pub received_at: DateTime<Utc>,
}
