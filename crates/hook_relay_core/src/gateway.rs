//! The verification-and-dispatch pipeline.
//!
//! [`WebhookGateway::dispatch`] takes one received request through every stage:
//!
//! 1. Authenticate (address allowlist, signature)
//! 2. Answer `ping` events immediately
//! 3. Parse the JSON payload and back it up
//! 4. Extract event metadata; skip branch-deleting pushes
//! 5. Resolve hooks; report a no-op when none exist
//! 6. Run the hooks and aggregate their results

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::aggregator::{self, HookReport};
use crate::allowlist::AllowlistProvider;
use crate::authentication;
use crate::backup;
use crate::configuration::GatewaySettings;
use crate::errors::{GatewayError, GatewayResult};
use crate::executor::HookExecutor;
use crate::metadata;
use crate::request::{IncomingRequest, PING_EVENT};
use crate::resolver;

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;

/// How a dispatched request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handshake event acknowledged
    Pong,
    /// Branch-deleting push, intentionally not dispatched
    Skipped,
    /// No hook matched the event
    NoOp,
    /// Hooks ran
    Completed(HookReport),
}

/// Dispatches webhook deliveries to hook scripts.
pub struct WebhookGateway {
    settings: Arc<GatewaySettings>,
    allowlist: Arc<dyn AllowlistProvider>,
}

impl WebhookGateway {
    pub fn new(settings: Arc<GatewaySettings>, allowlist: Arc<dyn AllowlistProvider>) -> Self {
        Self {
            settings,
            allowlist,
        }
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Handles one request end to end.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Authentication`] when the request is refused
    /// - [`GatewayError::MalformedPayload`] when the body is not JSON
    /// - [`GatewayError::PayloadFile`] when the payload cannot be handed to hooks
    pub async fn dispatch(&self, request: &IncomingRequest) -> GatewayResult<DispatchOutcome> {
        let event = request.event_name();
        let delivery = request.delivery_id().unwrap_or("-");

        if let Err(e) =
            authentication::authenticate(request, &self.settings, self.allowlist.as_ref()).await
        {
            warn!(
                source_ip = %request.source_ip(),
                delivery,
                event = %event,
                error = %e,
                "request rejected"
            );
            return Err(e.into());
        }

        info!(delivery, event = %event, "event type detected");
        if event == PING_EVENT {
            return Ok(DispatchOutcome::Pong);
        }

        let payload: Value = serde_json::from_slice(request.body()).map_err(|e| {
            warn!(
                source_ip = %request.source_ip(),
                delivery,
                event = %event,
                "[400] request parsing failed"
            );
            GatewayError::MalformedPayload(e)
        })?;

        backup::backup_payload(self.settings.backup_dir(), event, &payload);

        let metadata = metadata::extract(event, &payload);
        info!(
            delivery,
            metadata = %serde_json::to_string(&metadata).unwrap_or_default(),
            "metadata extracted"
        );

        if metadata::is_deleted_push(event, &payload) {
            info!(
                repository = metadata.repository_name.as_deref().unwrap_or("-"),
                "skipping push-delete event"
            );
            return Ok(DispatchOutcome::Skipped);
        }

        self.settings.check_hooks_path();
        let hooks = resolver::resolve(&metadata, &self.settings.hooks_path);
        if hooks.is_empty() {
            info!(event = %event, "no hooks to run");
            return Ok(DispatchOutcome::NoOp);
        }

        let results = HookExecutor::new(self.settings.hook_timeout())
            .execute(&hooks, &payload, event)
            .await?;

        let failed = results.values().filter(|result| !result.success()).count();
        info!(hooks = results.len(), failed, "hooks executed");

        Ok(DispatchOutcome::Completed(aggregator::aggregate(
            results,
            self.settings.return_scripts_info,
        )))
    }
}
