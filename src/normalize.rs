//! Normalizes heterogeneous GitHub webhook payloads into [`EventRecord`]s.
//!
//! A delivery either produces one canonical record, is ignored (ping,
//! unsupported action, unknown event type), or is rejected because the
//! payload is not a JSON object. Missing sub-fields never fail; they degrade
//! to defaults per field.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::record::{EventKind, EventRecord};

/// Strict upstream timestamp shape tried before the general RFC 3339 parse.
const UTC_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// The decoded body was valid JSON but not an object.
    #[error("webhook payload is not a JSON object")]
    InvalidPayload,
}

/// Why a delivery produced no record. `Ping` is kept apart from the other
/// reasons so callers can acknowledge GitHub's configuration check without
/// implying an event was stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Ping,
    UnsupportedAction,
    UnknownEvent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Event(EventRecord),
    Ignored(IgnoreReason),
}

/// Maps one webhook delivery to at most one canonical record.
///
/// Dispatches on the `X-GitHub-Event` label, first match wins:
/// - `push` always yields a record;
/// - `pull_request` yields a record for `opened`, a synthetic `merge` record
///   for `closed` with the `merged` flag set, and is ignored otherwise
///   (`closed` without merge, `synchronize`, `labeled`, ...);
/// - `ping` and anything unrecognized are ignored, distinguishably.
///
/// Pure apart from two wall-clock reads: `received_at` and the timestamp
/// fallback in [`parse_event_timestamp`].
pub fn normalize(event_kind: &str, payload: &Value) -> Result<Outcome, NormalizeError> {
    if !payload.is_object() {
        return Err(NormalizeError::InvalidPayload);
    }

    match event_kind {
        "push" => {
            let (event_timestamp, timestamp_was_inferred) =
                parse_event_timestamp(str_at(payload, &["head_commit", "timestamp"]));
            Ok(Outcome::Event(EventRecord {
                kind: EventKind::Push,
                author: str_at(payload, &["pusher", "name"])
                    .unwrap_or("unknown")
                    .to_string(),
                from_branch: None,
                to_branch: branch_from_ref(str_at(payload, &["ref"]).unwrap_or("")),
                event_timestamp,
                timestamp_was_inferred,
                received_at: Utc::now(),
            }))
        }
        "pull_request" => {
            let author = str_at(payload, &["pull_request", "user", "login"])
                .unwrap_or("unknown")
                .to_string();
            let from_branch = str_at(payload, &["pull_request", "head", "ref"])
                .unwrap_or("")
                .to_string();
            let to_branch = str_at(payload, &["pull_request", "base", "ref"])
                .unwrap_or("")
                .to_string();

            let (kind, raw_timestamp) = match str_at(payload, &["action"]).unwrap_or("") {
                "opened" => (
                    EventKind::PullRequest,
                    str_at(payload, &["pull_request", "created_at"]),
                ),
                "closed" if bool_at(payload, &["pull_request", "merged"]) => (
                    EventKind::Merge,
                    str_at(payload, &["pull_request", "merged_at"]),
                ),
                _ => return Ok(Outcome::Ignored(IgnoreReason::UnsupportedAction)),
            };

            let (event_timestamp, timestamp_was_inferred) = parse_event_timestamp(raw_timestamp);
            Ok(Outcome::Event(EventRecord {
                kind,
                author,
                from_branch: Some(from_branch),
                to_branch,
                event_timestamp,
                timestamp_was_inferred,
                received_at: Utc::now(),
            }))
        }
        "ping" => Ok(Outcome::Ignored(IgnoreReason::Ping)),
        _ => Ok(Outcome::Ignored(IgnoreReason::UnknownEvent)),
    }
}

/// Parses an upstream event timestamp, falling back to the current instant.
///
/// Tries the canonical UTC shape first, then general RFC 3339 (fractional
/// seconds, explicit offsets). The returned flag is true when the fallback
/// fired, so stored records can be told apart from ones with a real upstream
/// timestamp.
pub fn parse_event_timestamp(raw: Option<&str>) -> (DateTime<Utc>, bool) {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return (Utc::now(), true);
    };
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, UTC_TIMESTAMP_FORMAT) {
        return (naive.and_utc(), false);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return (parsed.with_timezone(&Utc), false);
    }
    (Utc::now(), true)
}

/// Last `/`-separated segment of a ref path (`refs/heads/main` -> `main`).
/// An empty or malformed ref yields an empty branch, never an error.
fn branch_from_ref(git_ref: &str) -> String {
    git_ref.rsplit('/').next().unwrap_or("").to_string()
}

fn str_at<'a>(payload: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut node = payload;
    for key in path {
        node = node.get(key)?;
    }
    node.as_str()
}

fn bool_at(payload: &Value, path: &[&str]) -> bool {
    let mut node = payload;
    for key in path {
        match node.get(key) {
            Some(next) => node = next,
            None => return false,
        }
    }
    node.as_bool().unwrap_or(false)
}
