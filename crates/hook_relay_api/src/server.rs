//! HTTP server configuration and startup

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;

use crate::{config::ServerConfig, reload::ConfigReloader, routes, AppState};

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;

/// API server
pub struct ApiServer {
    config: ServerConfig,
    state: AppState,
    reloader: Option<ConfigReloader>,
}

impl ApiServer {
    /// Create a new API server with the given configuration.
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state,
            reloader: None,
        }
    }

    /// Reload the configuration through `reloader` whenever the process receives `SIGHUP`.
    pub fn with_reloader(mut self, reloader: ConfigReloader) -> Self {
        self.reloader = Some(reloader);
        self
    }

    /// Build the Axum router with all routes and middleware.
    pub fn router(&self) -> Router {
        routes::create_router(self.state.clone(), self.config.request_timeout())
    }

    /// Start the server and listen for requests.
    ///
    /// This method blocks until the server is shut down gracefully via
    /// CTRL+C (SIGINT) or SIGTERM signal.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured address is invalid or cannot be bound.
    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = self.config.socket_addr()?;

        tracing::info!("Starting webhook server on {}", addr);

        let listener = TcpListener::bind(addr).await?;
        let app = self.router();

        if let Some(reloader) = self.reloader {
            tokio::spawn(reloader.watch(self.state.clone()));
        }

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}

/// Wait for shutdown signal (CTRL+C or SIGTERM)
///
/// A signal whose handler cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install CTRL+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received CTRL+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}
