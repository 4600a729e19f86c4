//! Event metadata extraction.
//!
//! The branch an event refers to lives in a different place for each event
//! family, and some events carry none at all. Extraction never fails: fields
//! that cannot be found are left unset.

use serde::Serialize;
use serde_json::Value;

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;

pub const PUSH_EVENT: &str = "push";

/// What the hook resolver needs to know about an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventMetadata {
    pub event: String,

    #[serde(rename = "name")]
    pub repository_name: Option<String>,

    pub branch: Option<String>,
}

/// Derives event metadata from a provider payload.
pub fn extract(event: &str, payload: &Value) -> EventMetadata {
    // Legacy events may lack a repository object.
    let repository_name = payload
        .get("repository")
        .and_then(|repository| repository.get("name"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    EventMetadata {
        event: event.to_string(),
        repository_name,
        branch: extract_branch(event, payload),
    }
}

/// Finds the branch an event refers to.
///
/// Rules, first match wins:
/// 1. A `ref_type` field (create/delete events): `ref` when the type is
///    `"branch"`, nothing for tags.
/// 2. A `pull_request` object: the pull request's base (target) branch.
/// 3. A push event: `ref` with its `refs/<kind>/` prefix removed.
pub fn extract_branch(event: &str, payload: &Value) -> Option<String> {
    if let Some(ref_type) = payload.get("ref_type") {
        return match ref_type.as_str() {
            Some("branch") => payload.get("ref").and_then(Value::as_str).map(str::to_owned),
            _ => None,
        };
    }

    if let Some(pull_request) = payload.get("pull_request") {
        return pull_request
            .get("base")
            .and_then(|base| base.get("ref"))
            .and_then(Value::as_str)
            .map(str::to_owned);
    }

    if event == PUSH_EVENT {
        return payload
            .get("ref")
            .and_then(Value::as_str)
            .and_then(|full_ref| full_ref.splitn(3, '/').nth(2))
            .map(str::to_owned);
    }

    None
}

/// Returns `true` for a push that deletes a branch; those are never dispatched.
pub fn is_deleted_push(event: &str, payload: &Value) -> bool {
    event == PUSH_EVENT
        && payload
            .get("deleted")
            .and_then(Value::as_bool)
            .unwrap_or(false)
}
