//! Configuration reload on `SIGHUP`.
//!
//! A reload re-reads the configuration file, rebuilds the gateway context and
//! swaps it into the shared [`AppState`] once the new log level is applied.
//! Listener settings (`host`, `port`, `request_timeout_secs`) only take effect
//! on restart.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use crate::config::AppConfig;
use crate::errors::ReloadError;
use crate::logging::LogLevelController;
use crate::{AppState, GatewayContext};

#[cfg(test)]
#[path = "reload_tests.rs"]
mod tests;

/// Re-applies the configuration file to a running service.
pub struct ConfigReloader {
    path: PathBuf,
    log_levels: Arc<LogLevelController>,
}

impl ConfigReloader {
    pub fn new(path: impl Into<PathBuf>, log_levels: Arc<LogLevelController>) -> Self {
        Self {
            path: path.into(),
            log_levels,
        }
    }

    /// Loads the file and, if it is valid, makes it the active configuration.
    ///
    /// On error the active configuration is left untouched. A missing file is
    /// an error here, unlike at startup.
    pub fn reload(&self, state: &AppState) -> Result<(), ReloadError> {
        let config = AppConfig::load(&self.path)?;
        let debug_level = config.debug_level;

        config.gateway.check_hooks_path();
        let context = GatewayContext::build(config.gateway, config.server.trust_forwarded_for)?;
        self.log_levels.apply(debug_level)?;
        state.replace(context);

        info!(path = %self.path.display(), "configuration reloaded");
        Ok(())
    }

    /// Reloads on every `SIGHUP` until the process exits.
    #[cfg(unix)]
    pub async fn watch(self, state: AppState) {
        use tokio::signal::unix::{signal, SignalKind};

        let mut hangups = match signal(SignalKind::hangup()) {
            Ok(hangups) => hangups,
            Err(e) => {
                error!(error = %e, "failed to install SIGHUP handler; reload disabled");
                return;
            }
        };

        while hangups.recv().await.is_some() {
            info!(path = %self.path.display(), "received SIGHUP, reloading configuration");
            if let Err(e) = self.reload(&state) {
                error!(error = %e, "configuration reload failed; keeping current configuration");
            }
        }
    }

    #[cfg(not(unix))]
    pub async fn watch(self, _state: AppState) {}
}
