//! Request authentication.
//!
//! Two independent checks guard the pipeline, both optional:
//!
//! 1. **Source address**: when `github_ips_only` is set, the request must come
//!    from one of the provider's published hook ranges. If the ranges cannot
//!    be retrieved the request is refused.
//! 2. **Signature**: when a shared secret is configured, the `X-Hub-Signature`
//!    header must carry `sha1=<hex digest>` of the HMAC-SHA1 of the raw body.
//!    The digest comparison is constant-time.
//!
//! SHA-1 is the only accepted algorithm. It is kept for compatibility with the
//! provider's legacy signature header and is not a recommendation.
//!
//! # Security
//!
//! Neither the secret nor the supplied signature is ever logged or placed in
//! an error message.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha1::Sha1;
use std::net::IpAddr;
use tracing::{debug, error, warn};

use crate::allowlist::{self, AllowlistProvider};
use crate::configuration::GatewaySettings;
use crate::errors::AuthenticationError;
use crate::request::IncomingRequest;

#[cfg(test)]
#[path = "authentication_tests.rs"]
mod tests;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature";

/// The only signature algorithm accepted in [`SIGNATURE_HEADER`].
pub const SUPPORTED_ALGORITHM: &str = "sha1";

type HmacSha1 = Hmac<Sha1>;

/// Runs the configured checks against `request`.
///
/// The address check runs before the signature check.
///
/// # Errors
///
/// Returns the first failing check as an [`AuthenticationError`].
pub async fn authenticate(
    request: &IncomingRequest,
    settings: &GatewaySettings,
    allowlist: &dyn AllowlistProvider,
) -> Result<(), AuthenticationError> {
    if settings.github_ips_only {
        debug!("checking valid IPs...");
        check_source_ip(request.source_ip(), allowlist).await?;
        debug!("checking valid IPs...done.");
    }

    if let Some(secret) = settings.secret() {
        debug!("checking webhook secret...");
        verify_signature(request.header(SIGNATURE_HEADER), request.body(), secret)?;
        debug!("checking webhook secret...done.");
    }

    Ok(())
}

/// Checks `source_ip` against the provider allowlist.
///
/// # Errors
///
/// - [`AuthenticationError::AllowlistUnavailable`] if the allowlist cannot be retrieved
/// - [`AuthenticationError::IpNotAllowed`] if no network contains the address
pub async fn check_source_ip(
    source_ip: IpAddr,
    allowlist: &dyn AllowlistProvider,
) -> Result<(), AuthenticationError> {
    let networks = allowlist.networks().await.map_err(|e| {
        error!(source_ip = %source_ip, error = %e, "[403] allowlist could not be retrieved");
        AuthenticationError::AllowlistUnavailable {
            reason: e.to_string(),
        }
    })?;

    if allowlist::is_allowed(source_ip, &networks) {
        Ok(())
    } else {
        error!(source_ip = %source_ip, "[403] IP not allowed");
        Err(AuthenticationError::IpNotAllowed { ip: source_ip })
    }
}

/// Verifies a `<algorithm>=<hex digest>` signature header over `body`.
///
/// # Errors
///
/// - [`AuthenticationError::MissingSignature`] if the header is absent
/// - [`AuthenticationError::MalformedSignature`] if the header has no `=`
/// - [`AuthenticationError::UnsupportedAlgorithm`] for anything but `sha1`
/// - [`AuthenticationError::InvalidSignature`] if the digest is not hex or does not match
pub fn verify_signature(
    header: Option<&str>,
    body: &[u8],
    secret: &SecretString,
) -> Result<(), AuthenticationError> {
    let Some(header) = header else {
        error!("[403] secret check failed: signature header mandatory");
        return Err(AuthenticationError::MissingSignature);
    };

    let Some((algorithm, digest)) = header.split_once('=') else {
        error!("[403] secret check failed: malformed signature header");
        return Err(AuthenticationError::MalformedSignature);
    };

    if algorithm != SUPPORTED_ALGORITHM {
        error!(algorithm = %algorithm, "[501] secret check failed: sha1 mandatory");
        return Err(AuthenticationError::UnsupportedAlgorithm {
            algorithm: algorithm.to_string(),
        });
    }

    let expected = hex::decode(digest).map_err(|_| {
        warn!("[403] secret check failed: digest is not hex");
        AuthenticationError::InvalidSignature
    })?;

    let mut mac = HmacSha1::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|_| AuthenticationError::InvalidSignature)?;
    mac.update(body);

    // `verify_slice` compares in constant time.
    mac.verify_slice(&expected).map_err(|_| {
        warn!("[403] secret check failed: signature mismatch");
        AuthenticationError::InvalidSignature
    })
}

/// Computes the signature header value the provider would send for `body`.
///
/// Useful for operators testing hooks by hand and for tests.
pub fn sign_payload(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha1::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(body);
    format!(
        "{}={}",
        SUPPORTED_ALGORITHM,
        hex::encode(mac.finalize().into_bytes())
    )
}
