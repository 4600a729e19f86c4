//! # HookRelay Core
//!
//! This crate provides the verification-and-dispatch pipeline for HookRelay,
//! a gateway that runs operator-supplied scripts in response to source-control
//! webhook events.
//!
//! ## Overview
//!
//! A delivery goes through these stages, each in its own module:
//! 1. [`authentication`] - source address allowlist and HMAC signature checks
//! 2. [`metadata`] - event, repository and branch extraction from the payload
//! 3. [`resolver`] - ordered hook lookup, including child hooks
//! 4. [`executor`] - sequential hook execution with captured output
//! 5. [`aggregator`] - the report returned to the sender
//!
//! [`WebhookGateway`] runs the stages in order for one request.
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use hook_relay_core::{GatewaySettings, IncomingRequest, StaticAllowlist, WebhookGateway};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = GatewaySettings {
//!     github_ips_only: false,
//!     ..GatewaySettings::default()
//! };
//! let gateway = WebhookGateway::new(Arc::new(settings), Arc::new(StaticAllowlist::default()));
//!
//! let request = IncomingRequest::new(
//!     "127.0.0.1".parse()?,
//!     [("X-GitHub-Event", "push")],
//!     br#"{"ref":"refs/heads/main","repository":{"name":"myrepo"}}"#.to_vec(),
//! );
//! let outcome = gateway.dispatch(&request).await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Only request-level failures (authentication, malformed payload, payload file
//! I/O) are returned as [`GatewayError`]. Missing metadata and failing hooks are
//! part of a successful dispatch.

pub mod aggregator;
pub mod allowlist;
pub mod authentication;
pub mod backup;
pub mod configuration;
pub mod errors;
pub mod executor;
pub mod gateway;
pub mod metadata;
pub mod request;
pub mod resolver;

pub use aggregator::{aggregate, HookReport};
pub use allowlist::{AllowlistProvider, GitHubMetaAllowlist, StaticAllowlist};
pub use authentication::{authenticate, sign_payload, SIGNATURE_HEADER};
pub use configuration::GatewaySettings;
pub use errors::{AllowlistError, AuthenticationError, GatewayError, GatewayResult};
pub use executor::{ExecutionResult, HookExecutor, HookInvocation, PayloadFile};
pub use gateway::{DispatchOutcome, WebhookGateway};
pub use metadata::EventMetadata;
pub use request::{IncomingRequest, DELIVERY_HEADER, EVENT_HEADER, PING_EVENT};
pub use resolver::{HookCandidate, HookOrigin};
