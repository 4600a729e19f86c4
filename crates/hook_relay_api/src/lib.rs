//! HookRelay HTTP service
//!
//! This crate exposes the webhook pipeline from `hook_relay_core` over HTTP.
//! It owns everything that is specific to running as a network service:
//!
//! - Request/response translation and error mapping to status codes
//! - Routing, request tracing and timeouts
//! - Configuration loading, logging setup and reload on `SIGHUP`
//!
//! The dependency flows: HTTP API → business logic, never the reverse.

use std::sync::{Arc, PoisonError, RwLock};

use hook_relay_core::{
    AllowlistError, AllowlistProvider, GatewaySettings, GitHubMetaAllowlist, StaticAllowlist,
    WebhookGateway,
};

pub mod config;
pub mod errors;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod reload;
pub mod routes;
pub mod server;

pub use config::{AppConfig, ServerConfig};
pub use errors::{ApiError, ConfigError, ErrorResponse, LoggingError, ReloadError};
pub use logging::{LogLevel, LogLevelController};
pub use models::response::{HealthResponse, WebhookResponse};
pub use reload::ConfigReloader;
pub use server::ApiServer;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Largest request body accepted, matching the provider's payload cap.
pub const MAX_PAYLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Everything a request needs, built from one configuration snapshot.
pub struct GatewayContext {
    pub gateway: WebhookGateway,

    /// Take the source address from `X-Forwarded-For` when set
    pub trust_forwarded_for: bool,
}

impl GatewayContext {
    pub fn new(
        settings: GatewaySettings,
        allowlist: Arc<dyn AllowlistProvider>,
        trust_forwarded_for: bool,
    ) -> Self {
        Self {
            gateway: WebhookGateway::new(Arc::new(settings), allowlist),
            trust_forwarded_for,
        }
    }

    /// Builds a context that checks source addresses against the provider meta endpoint.
    ///
    /// The endpoint is only contacted when `github_ips_only` is enabled.
    pub fn build(
        settings: GatewaySettings,
        trust_forwarded_for: bool,
    ) -> Result<Self, AllowlistError> {
        let allowlist: Arc<dyn AllowlistProvider> = if settings.github_ips_only {
            Arc::new(GitHubMetaAllowlist::new(
                &settings.meta_url,
                settings.allowlist_cache_ttl(),
            )?)
        } else {
            Arc::new(StaticAllowlist::default())
        };

        Ok(Self::new(settings, allowlist, trust_forwarded_for))
    }
}

/// Application state shared across handlers.
///
/// Handlers take a [`snapshot`](AppState::snapshot) at the start of a request and
/// use it throughout, so a concurrent reload never changes settings mid-request.
#[derive(Clone)]
pub struct AppState {
    context: Arc<RwLock<Arc<GatewayContext>>>,
}

impl AppState {
    pub fn new(context: GatewayContext) -> Self {
        Self {
            context: Arc::new(RwLock::new(Arc::new(context))),
        }
    }

    pub fn snapshot(&self) -> Arc<GatewayContext> {
        self.context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swaps in a new context; requests already in flight keep the old one.
    pub fn replace(&self, context: GatewayContext) {
        *self
            .context
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(context);
    }
}
