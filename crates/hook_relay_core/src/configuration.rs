//! Gateway settings.
//!
//! [`GatewaySettings`] is the part of the service configuration the pipeline
//! itself consumes. It is deserialized once at startup (and again on reload)
//! and shared read-only between requests.
//!
//! # Example TOML Configuration
//!
//! ```toml
//! hooks_path = "/srv/hooks"
//! enforce_secret = "s3cr3t"
//! github_ips_only = true
//! backup_path = "/var/lib/hook-relay/backup"
//! return_scripts_info = false
//! hook_timeout_secs = 300
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

#[cfg(test)]
#[path = "configuration_tests.rs"]
mod tests;

/// Default directory holding hook scripts, relative to the working directory.
pub const DEFAULT_HOOKS_PATH: &str = "hooks";

/// Provider endpoint publishing the webhook source address ranges.
pub const DEFAULT_META_URL: &str = "https://api.github.com/meta";

/// Default per-hook execution limit.
pub const DEFAULT_HOOK_TIMEOUT_SECS: u64 = 300;

/// Settings that drive authentication, hook resolution and execution.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Directory scanned for hook scripts
    pub hooks_path: PathBuf,

    /// Shared webhook secret. `None` disables signature enforcement.
    #[serde(deserialize_with = "deserialize_secret")]
    pub enforce_secret: Option<SecretString>,

    /// Only accept requests from the provider's published hook ranges
    pub github_ips_only: bool,

    /// Directory receiving a copy of every payload, when it exists
    #[serde(deserialize_with = "deserialize_optional_path")]
    pub backup_path: Option<PathBuf>,

    /// Return per-hook exit codes and output in the response
    pub return_scripts_info: bool,

    /// Per-hook execution limit in seconds, `0` disables the limit
    pub hook_timeout_secs: u64,

    /// URL of the provider meta endpoint listing hook source ranges
    pub meta_url: String,

    /// How long a fetched allowlist is reused, `0` fetches on every request
    pub allowlist_cache_secs: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            hooks_path: PathBuf::from(DEFAULT_HOOKS_PATH),
            enforce_secret: None,
            github_ips_only: true,
            backup_path: None,
            return_scripts_info: false,
            hook_timeout_secs: DEFAULT_HOOK_TIMEOUT_SECS,
            meta_url: DEFAULT_META_URL.to_string(),
            allowlist_cache_secs: 0,
        }
    }
}

impl GatewaySettings {
    /// The shared secret, if signature enforcement is enabled.
    pub fn secret(&self) -> Option<&SecretString> {
        self.enforce_secret.as_ref()
    }

    pub fn hook_timeout(&self) -> Option<Duration> {
        (self.hook_timeout_secs > 0).then(|| Duration::from_secs(self.hook_timeout_secs))
    }

    pub fn allowlist_cache_ttl(&self) -> Option<Duration> {
        (self.allowlist_cache_secs > 0).then(|| Duration::from_secs(self.allowlist_cache_secs))
    }

    pub fn backup_dir(&self) -> Option<&Path> {
        self.backup_path.as_deref()
    }

    /// Logs whether the hooks directory is usable.
    ///
    /// A missing directory is not an error: every request simply resolves no hooks.
    pub fn check_hooks_path(&self) -> bool {
        if self.hooks_path.is_dir() {
            debug!(hooks_path = %self.hooks_path.display(), "hooks path set");
            true
        } else {
            warn!(hooks_path = %self.hooks_path.display(), "hooks path not valid");
            false
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .filter(|secret| !secret.is_empty())
        .map(SecretString::from))
}

fn deserialize_optional_path<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|path| !path.is_empty()).map(PathBuf::from))
}
