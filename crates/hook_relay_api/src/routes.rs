//! HTTP routing configuration
//!
//! # Route Structure
//!
//! - `POST /`: receive a webhook delivery
//! - any other method on `/`: answered with 501
//! - `GET /health`: health check

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{handlers, middleware as api_middleware, AppState, MAX_PAYLOAD_BYTES};

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;

/// Create the complete router with all routes configured.
///
/// Request headers are deliberately left out of the trace spans; they carry
/// the webhook signature.
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route(
            "/",
            post(handlers::receive_webhook).fallback(handlers::method_not_implemented),
        )
        .route("/health", get(handlers::health_check))
        .layer(DefaultBodyLimit::max(MAX_PAYLOAD_BYTES))
        .layer(middleware::from_fn(api_middleware::tracing_middleware))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(trace_layer)
        .with_state(state)
}
