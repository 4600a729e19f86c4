//! HTTP response type definitions

use std::collections::BTreeMap;

use hook_relay_core::{DispatchOutcome, ExecutionResult, HookReport};
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;

/// Body returned for an accepted webhook delivery.
///
/// # Example
///
/// ```json
/// {"msg": "pong"}
/// {"status": "done"}
/// {"push": {"returncode": 0, "stdout": "deployed\n", "stderr": ""}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WebhookResponse {
    Message { msg: String },
    Status { status: String },

    /// Per-hook results keyed by hook file name
    Results(BTreeMap<String, ExecutionResult>),
}

impl WebhookResponse {
    fn status(status: &str) -> Self {
        WebhookResponse::Status {
            status: status.to_string(),
        }
    }
}

impl From<DispatchOutcome> for WebhookResponse {
    fn from(outcome: DispatchOutcome) -> Self {
        match outcome {
            DispatchOutcome::Pong => WebhookResponse::Message {
                msg: "pong".to_string(),
            },
            DispatchOutcome::Skipped => WebhookResponse::status("skipped"),
            DispatchOutcome::NoOp => WebhookResponse::status("nop"),
            DispatchOutcome::Completed(HookReport::Done) => WebhookResponse::status("done"),
            DispatchOutcome::Completed(HookReport::Details(results)) => {
                WebhookResponse::Results(results)
            }
        }
    }
}

/// Health check response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status, always `"healthy"` while the process serves requests
    pub status: String,

    /// Service version
    pub version: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
