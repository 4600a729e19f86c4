//! Provider source-address allowlists.
//!
//! The provider publishes the address ranges its webhook deliveries come from.
//! [`GitHubMetaAllowlist`] fetches them from the meta endpoint, optionally
//! reusing a successful fetch for a bounded time. A failed refresh is always
//! reported; a stale list is never served in its place.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ipnet::IpNet;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::errors::AllowlistError;

#[cfg(test)]
#[path = "allowlist_tests.rs"]
mod tests;

/// Timeout applied to a single meta endpoint request.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of the networks webhook deliveries may originate from.
///
/// Implementations MUST be thread-safe; the gateway shares one provider
/// between concurrently handled requests.
#[async_trait]
pub trait AllowlistProvider: Send + Sync {
    /// Returns the current set of allowed networks.
    async fn networks(&self) -> Result<Vec<IpNet>, AllowlistError>;
}

/// Fixed allowlist, used when the ranges are known up front.
#[derive(Debug, Clone, Default)]
pub struct StaticAllowlist {
    networks: Vec<IpNet>,
}

impl StaticAllowlist {
    pub fn new(networks: Vec<IpNet>) -> Self {
        Self { networks }
    }
}

#[async_trait]
impl AllowlistProvider for StaticAllowlist {
    async fn networks(&self) -> Result<Vec<IpNet>, AllowlistError> {
        Ok(self.networks.clone())
    }
}

/// Shape of the meta endpoint response; only the hook ranges are used.
#[derive(Debug, Deserialize)]
struct MetaResponse {
    #[serde(default)]
    hooks: Vec<String>,
}

#[derive(Debug)]
struct CachedNetworks {
    fetched_at: Instant,
    networks: Vec<IpNet>,
}

/// Allowlist backed by the provider's meta endpoint.
pub struct GitHubMetaAllowlist {
    client: reqwest::Client,
    url: Url,
    cache_ttl: Option<Duration>,
    cache: Mutex<Option<CachedNetworks>>,
}

impl GitHubMetaAllowlist {
    /// Creates a provider for `meta_url`.
    ///
    /// With `cache_ttl` set, a successful fetch is reused until it is older
    /// than the given duration. Without it every call fetches.
    ///
    /// # Errors
    ///
    /// Returns [`AllowlistError::InvalidUrl`] if `meta_url` does not parse and
    /// [`AllowlistError::Client`] if the HTTP client cannot be constructed.
    pub fn new(meta_url: &str, cache_ttl: Option<Duration>) -> Result<Self, AllowlistError> {
        let url = Url::parse(meta_url).map_err(|e| AllowlistError::InvalidUrl {
            url: meta_url.to_string(),
            message: e.to_string(),
        })?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("hook-relay/", env!("CARGO_PKG_VERSION")))
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| AllowlistError::Client {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            url,
            cache_ttl,
            cache: Mutex::new(None),
        })
    }

    async fn fetch(&self) -> Result<Vec<IpNet>, AllowlistError> {
        debug!(url = %self.url, "fetching provider allowlist");

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AllowlistError::Fetch {
                url: self.url.to_string(),
                message: e.to_string(),
            })?;

        let meta: MetaResponse =
            response
                .json()
                .await
                .map_err(|e| AllowlistError::InvalidResponse {
                    url: self.url.to_string(),
                    message: e.to_string(),
                })?;

        Ok(parse_networks(&meta.hooks))
    }
}

#[async_trait]
impl AllowlistProvider for GitHubMetaAllowlist {
    async fn networks(&self) -> Result<Vec<IpNet>, AllowlistError> {
        let Some(ttl) = self.cache_ttl else {
            return self.fetch().await;
        };

        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < ttl {
                return Ok(cached.networks.clone());
            }
        }

        // Drop the expired entry first so a failed refresh cannot leave it behind.
        *cache = None;
        let networks = self.fetch().await?;
        *cache = Some(CachedNetworks {
            fetched_at: Instant::now(),
            networks: networks.clone(),
        });
        Ok(networks)
    }
}

/// Parses CIDR blocks, accepting bare addresses as single-host networks.
///
/// Entries that do not parse are skipped with a warning.
pub fn parse_networks<S: AsRef<str>>(entries: &[S]) -> Vec<IpNet> {
    entries
        .iter()
        .filter_map(|entry| {
            let entry = entry.as_ref().trim();
            if let Ok(network) = entry.parse::<IpNet>() {
                return Some(network);
            }
            if let Ok(address) = entry.parse::<IpAddr>() {
                let prefix = if address.is_ipv4() { 32 } else { 128 };
                return IpNet::new(address, prefix).ok();
            }
            warn!(entry = %entry, "ignoring unparseable allowlist entry");
            None
        })
        .collect()
}

/// Returns `true` when `address` falls inside any of `networks`.
///
/// IPv4-mapped IPv6 addresses are compared as their IPv4 form.
pub fn is_allowed(address: IpAddr, networks: &[IpNet]) -> bool {
    let address = address.to_canonical();
    networks.iter().any(|network| network.contains(&address))
}
