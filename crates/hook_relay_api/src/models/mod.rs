//! HTTP response models
//!
//! These types exist only in the HTTP layer and are built from pipeline
//! outcomes via `From`.

pub mod response;

pub use response::{HealthResponse, WebhookResponse};
