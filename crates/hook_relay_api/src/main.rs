//! HookRelay webhook server
//!
//! Main binary for running the webhook gateway.
//!
//! # Environment Variables
//!
//! - `HOOK_RELAY_CONFIG`: Configuration file (default: config.toml)
//! - `HOOK_RELAY_HOST`: Host to bind to, overrides `server.host`
//! - `HOOK_RELAY_PORT`: Port to listen on, overrides `server.port`
//! - `RUST_LOG`: Log filter, takes precedence over `debug_level` at startup

use std::sync::Arc;

use hook_relay_api::{
    config::{self, AppConfig},
    logging, ApiServer, AppState, ConfigReloader, GatewayContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = config::config_path();
    let loaded = AppConfig::load_optional(&config_path)?;
    let found = loaded.is_some();
    let mut config = loaded.unwrap_or_default();

    let log_levels = Arc::new(logging::init_logging(config.debug_level)?);

    if found {
        tracing::info!("Loaded configuration from {}", config_path.display());
    } else {
        tracing::warn!(
            "Configuration file {} not found, using defaults",
            config_path.display()
        );
    }

    config.apply_env_overrides(|name| std::env::var(name).ok())?;
    config.gateway.check_hooks_path();

    let server_config = config.server.clone();
    let context = GatewayContext::build(config.gateway, server_config.trust_forwarded_for)?;
    let state = AppState::new(context);

    tracing::info!("Starting HookRelay {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Log level: {}", config.debug_level);

    ApiServer::new(server_config, state)
        .with_reloader(ConfigReloader::new(config_path, log_levels))
        .serve()
        .await
}
