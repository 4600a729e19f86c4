//! Inbound webhook request as seen by the pipeline.

use std::collections::HashMap;
use std::net::IpAddr;

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;

/// Header naming the provider event type.
pub const EVENT_HEADER: &str = "x-github-event";

/// Header carrying the provider's unique delivery id.
pub const DELIVERY_HEADER: &str = "x-github-delivery";

/// Event assumed when the sender does not name one.
pub const PING_EVENT: &str = "ping";

/// A received webhook delivery.
///
/// Header names are stored lower-cased so lookups are case-insensitive.
/// The body is kept exactly as received; signature verification runs over
/// these bytes, never over a re-serialized payload.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    source_ip: IpAddr,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl IncomingRequest {
    pub fn new<I, K, V>(source_ip: IpAddr, headers: I, body: impl Into<Vec<u8>>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.as_ref().to_ascii_lowercase(), value.into()))
            .collect();

        Self {
            source_ip,
            headers,
            body: body.into(),
        }
    }

    pub fn source_ip(&self) -> IpAddr {
        self.source_ip
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The event type named by the sender, `"ping"` when absent.
    pub fn event_name(&self) -> &str {
        self.header(EVENT_HEADER).unwrap_or(PING_EVENT)
    }

    pub fn delivery_id(&self) -> Option<&str> {
        self.header(DELIVERY_HEADER)
    }
}
