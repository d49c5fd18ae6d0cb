//! Common contract of the two transport variants.

use super::error::Result;
use super::protocol::{JsonRpcRequest, JsonRpcResponse};
use async_trait::async_trait;
use std::fmt;
use toolgate_application::Credentials;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportVariant {
    /// Variant A: one POST per call, JSON or event-stream reply
    Streamable,
    /// Variant B: long-lived event stream plus a POST side channel
    Sse,
}

impl TransportVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportVariant::Streamable => "streamable",
            TransportVariant::Sse => "sse",
        }
    }
}

impl fmt::Display for TransportVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An established transport that can exchange JSON-RPC messages.
#[async_trait]
pub trait McpSession: Send + Sync {
    fn variant(&self) -> TransportVariant;

    /// Send a request and wait for the reply with the same id.
    async fn request(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse>;

    /// Send a notification; no reply is read.
    async fn notify(&self, notification: &JsonRpcRequest) -> Result<()>;
}

/// Headers carrying the caller's credentials on every request.
pub fn credential_headers(credentials: &Credentials) -> Vec<(String, String)> {
    vec![
        ("authorization".to_string(), credentials.authorization()),
        ("x-entity-id".to_string(), credentials.entity_id.clone()),
        (
            "x-organization-id".to_string(),
            credentials.organization_id.clone(),
        ),
    ]
}

/// Shorten a response body for error messages.
pub(crate) fn preview(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    match text.char_indices().nth(200) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
