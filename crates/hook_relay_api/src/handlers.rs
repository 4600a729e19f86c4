//! HTTP request handlers
//!
//! Handlers translate HTTP requests into [`IncomingRequest`]s, hand them to the
//! gateway, and translate the outcome back into a response.

use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Method},
    Json,
};
use hook_relay_core::IncomingRequest;

use crate::{
    errors::ApiError,
    models::response::{HealthResponse, WebhookResponse},
    AppState,
};

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// POST /
///
/// Receives one webhook delivery. The body is passed to the pipeline as raw
/// bytes so the signature is checked against exactly what was sent.
pub async fn receive_webhook(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let context = state.snapshot();
    let source_ip = resolve_source_ip(peer.ip(), &headers, context.trust_forwarded_for);

    let header_pairs = headers.iter().filter_map(|(name, value)| {
        value
            .to_str()
            .ok()
            .map(|value| (name.as_str(), value.to_string()))
    });
    let request = IncomingRequest::new(source_ip, header_pairs, body.to_vec());

    let outcome = context.gateway.dispatch(&request).await?;

    Ok(Json(outcome.into()))
}

/// Any method other than `POST` on the webhook route.
pub async fn method_not_implemented(method: Method) -> ApiError {
    ApiError::MethodNotImplemented {
        method: method.to_string(),
    }
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// The address the request is attributed to.
///
/// With `trust_forwarded_for`, the first `X-Forwarded-For` entry wins when it is
/// a valid IP address; otherwise the peer address is used.
pub fn resolve_source_ip(peer: IpAddr, headers: &HeaderMap, trust_forwarded_for: bool) -> IpAddr {
    if !trust_forwarded_for {
        return peer;
    }

    headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse().ok())
        .unwrap_or(peer)
}
