//! Domain error types for the webhook pipeline.
//!
//! These errors never carry the shared secret or the signature supplied by the
//! sender, so they can be logged and returned to callers as-is.

use std::net::IpAddr;

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Reasons a request is refused before any payload processing happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    #[error("source address {ip} is not in the provider allowlist")]
    IpNotAllowed { ip: IpAddr },

    /// The allowlist could not be retrieved, so the source address could not be checked.
    #[error("provider allowlist unavailable: {reason}")]
    AllowlistUnavailable { reason: String },

    #[error("signature header is required")]
    MissingSignature,

    #[error("signature header is malformed, expected '<algorithm>=<hex digest>'")]
    MalformedSignature,

    #[error("signature algorithm '{algorithm}' is not supported")]
    UnsupportedAlgorithm { algorithm: String },

    #[error("signature does not match the request body")]
    InvalidSignature,
}

impl AuthenticationError {
    /// Returns `true` when the sender asked for a scheme this gateway does not implement.
    ///
    /// Every other variant is a plain authentication failure.
    pub fn is_unsupported_scheme(&self) -> bool {
        matches!(self, AuthenticationError::UnsupportedAlgorithm { .. })
    }
}

/// Errors raised while retrieving the provider's published address ranges.
#[derive(Error, Debug)]
pub enum AllowlistError {
    #[error("invalid allowlist URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("failed to build HTTP client: {message}")]
    Client { message: String },

    #[error("failed to fetch allowlist from {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("allowlist response from {url} is invalid: {message}")]
    InvalidResponse { url: String, message: String },
}

/// Errors that abort the dispatch of a single webhook request.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    #[error("request payload is not valid JSON: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    #[error("failed to prepare payload file: {0}")]
    PayloadFile(#[from] std::io::Error),
}

/// Result alias used across the pipeline.
pub type GatewayResult<T> = Result<T, GatewayError>;
