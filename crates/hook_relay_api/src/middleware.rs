//! Request tracing middleware
//!
//! Every request runs inside a span carrying a request id, so log lines from
//! the pipeline can be correlated with the delivery that caused them.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use hook_relay_core::DELIVERY_HEADER;
use tracing::Instrument;

#[cfg(test)]
#[path = "middleware_tests.rs"]
mod tests;

/// Response header echoing the request id.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Request tracing middleware.
///
/// Uses the provider's delivery id as the request id when present, a fresh
/// UUID otherwise.
pub async fn tracing_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(DELIVERY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::info!(
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
        "Request started"
    );

    let span = tracing::info_span!("request", request_id = %request_id);
    let mut response = next.run(request).instrument(span).await;

    tracing::info!(
        request_id = %request_id,
        status = %response.status(),
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}
