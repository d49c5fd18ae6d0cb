//! Tool server configuration from TOML (`[discovery]` section)

use crate::mcp::NegotiatorConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw discovery configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDiscoveryConfig {
    /// Streamable HTTP endpoint of the tool server
    pub server_url: String,
    /// Event-stream subscription URL (derived from `server_url` when unset)
    pub sse_url: Option<String>,
    /// Per-call timeout for the streamable transport
    pub request_timeout_secs: u64,
    /// Budget for the whole streamable handshake
    pub streamable_timeout_secs: u64,
    /// Overall timeout for the event-stream transport
    pub sse_timeout_secs: u64,
    /// Longest single wait on a silent event stream
    pub sse_poll_timeout_secs: u64,
    /// Upper bound on `tools/list` pages
    pub max_tool_pages: usize,
    pub protocol_version: String,
    pub client_name: String,
}

impl Default for FileDiscoveryConfig {
    fn default() -> Self {
        let defaults = NegotiatorConfig::default();
        Self {
            server_url: defaults.server_url,
            sse_url: None,
            request_timeout_secs: defaults.request_timeout.as_secs(),
            streamable_timeout_secs: defaults.streamable_timeout.as_secs(),
            sse_timeout_secs: defaults.sse_timeout.as_secs(),
            sse_poll_timeout_secs: defaults.sse_poll_timeout.as_secs(),
            max_tool_pages: defaults.max_tool_pages,
            protocol_version: defaults.protocol_version,
            client_name: defaults.client_name,
        }
    }
}

impl FileDiscoveryConfig {
    pub fn to_negotiator_config(&self) -> NegotiatorConfig {
        NegotiatorConfig {
            server_url: self.server_url.clone(),
            sse_url: self.sse_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            streamable_timeout: Duration::from_secs(self.streamable_timeout_secs),
            sse_timeout: Duration::from_secs(self.sse_timeout_secs),
            sse_poll_timeout: Duration::from_secs(self.sse_poll_timeout_secs),
            max_tool_pages: self.max_tool_pages,
            protocol_version: self.protocol_version.clone(),
            client_name: self.client_name.clone(),
            ..NegotiatorConfig::default()
        }
    }
}
