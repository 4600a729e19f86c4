//! Error handling and HTTP error conversion
//!
//! Pipeline errors from `hook_relay_core` are converted to HTTP responses at
//! this boundary. The response body never contains the shared secret, the
//! supplied signature, allowlist provider failures or internal I/O details.
//!
//! | Error                                        | Status |
//! |----------------------------------------------|--------|
//! | Any authentication failure                   | 403    |
//! | Unsupported signature algorithm, non-`POST`  | 501    |
//! | Payload is not JSON                          | 400    |
//! | Payload file could not be written            | 500    |

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hook_relay_core::{AllowlistError, AuthenticationError, GatewayError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Standard error response for all API errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Additional context (optional, type varies by error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Errors returned from request handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("method {method} is not implemented")]
    MethodNotImplemented { method: String },

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MethodNotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            ApiError::Gateway(GatewayError::Authentication(e)) if e.is_unsupported_scheme() => {
                StatusCode::NOT_IMPLEMENTED
            }
            ApiError::Gateway(GatewayError::Authentication(_)) => StatusCode::FORBIDDEN,
            ApiError::Gateway(GatewayError::MalformedPayload(_)) => StatusCode::BAD_REQUEST,
            ApiError::Gateway(GatewayError::PayloadFile(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::MethodNotImplemented { .. } => "MethodNotImplemented",
            ApiError::Gateway(GatewayError::Authentication(e)) if e.is_unsupported_scheme() => {
                "UnsupportedSignatureAlgorithm"
            }
            ApiError::Gateway(GatewayError::Authentication(_)) => "AuthenticationError",
            ApiError::Gateway(GatewayError::MalformedPayload(_)) => "InvalidPayload",
            ApiError::Gateway(GatewayError::PayloadFile(_)) => "InternalError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = convert_error(&self);

        log_error(&self, status);

        (status, Json(error_response)).into_response()
    }
}

/// Convert an API error to its HTTP status code and response body
fn convert_error(error: &ApiError) -> (StatusCode, ErrorResponse) {
    let status = error.status_code();
    let message = match error {
        ApiError::Gateway(GatewayError::Authentication(
            AuthenticationError::AllowlistUnavailable { .. },
        )) => "Source address could not be verified".to_string(),
        _ if status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED => {
            "An internal error occurred".to_string()
        }
        _ => error.to_string(),
    };

    (
        status,
        ErrorResponse {
            error: ErrorDetails {
                code: error.code().to_string(),
                message,
                details: None,
            },
        },
    )
}

/// Log error with appropriate level based on HTTP status
fn log_error(error: &ApiError, status: StatusCode) {
    match status {
        StatusCode::INTERNAL_SERVER_ERROR => {
            tracing::error!("API error: {} - {}", status, error);
        }
        StatusCode::BAD_REQUEST | StatusCode::FORBIDDEN => {
            tracing::warn!("API error: {} - {}", status, error);
        }
        _ => {
            tracing::info!("API error: {} - {}", status, error);
        }
    }
}

/// Errors raised while loading the service configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value '{value}' for {name}")]
    InvalidOverride { name: String, value: String },

    #[error("Invalid listen address '{host}'")]
    InvalidHost { host: String },
}

/// Errors raised while installing or changing the log filter.
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to install the tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),

    #[error("Failed to change the log filter: {0}")]
    Reload(#[from] tracing_subscriber::reload::Error),
}

/// Errors raised while applying a re-read configuration.
#[derive(Error, Debug)]
pub enum ReloadError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Allowlist(#[from] AllowlistError),

    #[error(transparent)]
    Logging(#[from] LoggingError),
}
