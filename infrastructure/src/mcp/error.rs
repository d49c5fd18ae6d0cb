//! Error types for the MCP transports

use std::time::Duration;
use thiserror::Error;

/// Result type alias for MCP transport operations
pub type Result<T> = std::result::Result<T, McpError>;

/// Errors inside a transport variant. These stay behind the negotiator;
/// callers only ever see `DiscoveryError` or `ToolCallError`.
#[derive(Error, Debug)]
pub enum McpError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("JSON-RPC error (code {code}): {message}")]
    Rpc { code: i64, message: String },

    #[error("{operation} timed out after {}ms", after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Event stream closed")]
    StreamClosed,

    #[error("Server never announced an endpoint")]
    MissingEndpoint,

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request already sent in this attempt: {0}")]
    LoopDetected(String),

    #[error("Tool '{tool}' reported an error: {message}")]
    ToolFailed { tool: String, message: String },
}

impl McpError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, McpError::Timeout { .. })
    }
}

impl From<reqwest::Error> for McpError {
    fn from(e: reqwest::Error) -> Self {
        McpError::Http(e.to_string())
    }
}
