//! Service configuration.
//!
//! The configuration is a TOML file whose location is taken from
//! `HOOK_RELAY_CONFIG`, falling back to `config.toml` in the working directory.
//! Pipeline settings live at the top level; listener settings live in the
//! `[server]` table.
//!
//! # Example TOML Configuration
//!
//! ```toml
//! debug_level = "INFO"
//! hooks_path = "hooks"
//! enforce_secret = ""
//! github_ips_only = true
//! backup_path = ""
//! return_scripts_info = false
//! hook_timeout_secs = 300
//!
//! [server]
//! host = "0.0.0.0"
//! port = 5000
//! request_timeout_secs = 900
//! trust_forwarded_for = false
//! ```

use std::{
    fs,
    io::ErrorKind,
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use hook_relay_core::GatewaySettings;
use serde::Deserialize;
use tracing::debug;

use crate::errors::ConfigError;
use crate::logging::LogLevel;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "HOOK_RELAY_CONFIG";

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "config.toml";

/// Environment variable overriding `server.host`
pub const HOST_ENV: &str = "HOOK_RELAY_HOST";

/// Environment variable overriding `server.port`
pub const PORT_ENV: &str = "HOOK_RELAY_PORT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 900;

/// Listener configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Upper bound on the time spent serving one request
    pub request_timeout_secs: u64,

    /// Use the first `X-Forwarded-For` entry as the source address.
    /// Only enable behind a proxy that sets this header itself.
    pub trust_forwarded_for: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            trust_forwarded_for: false,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.host.parse().map_err(|_| ConfigError::InvalidHost {
            host: self.host.clone(),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Complete service configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Log verbosity: `DEBUG`, `INFO`, `WARNING`, `ERROR` or `CRITICAL`
    pub debug_level: LogLevel,

    pub server: ServerConfig,

    /// Settings consumed by the webhook pipeline
    #[serde(flatten)]
    pub gateway: GatewaySettings,
}

impl AppConfig {
    /// Loads configuration from a TOML file at the specified path.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NotFound`] if the file does not exist
    /// - [`ConfigError::Read`] if the file cannot be read
    /// - [`ConfigError::Parse`] if the file is not valid TOML for this schema
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading configuration from {:?}", path);

        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::NotFound {
                path: path.to_path_buf(),
            },
            _ => ConfigError::Read {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Like [`load`](Self::load), but a missing file yields `None` instead of an error.
    pub fn load_optional(path: &Path) -> Result<Option<Self>, ConfigError> {
        match Self::load(path) {
            Ok(config) => Ok(Some(config)),
            Err(ConfigError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Applies `HOOK_RELAY_HOST` and `HOOK_RELAY_PORT` as returned by `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(HOST_ENV) {
            self.server.host = host;
        }

        if let Some(port) = lookup(PORT_ENV) {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidOverride {
                name: PORT_ENV.to_string(),
                value: port,
            })?;
        }

        Ok(())
    }
}

/// Location of the configuration file, from `HOOK_RELAY_CONFIG` or the default.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILENAME))
}
