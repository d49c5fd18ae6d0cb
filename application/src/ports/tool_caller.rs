//! Tool caller port
//!
//! The capability to invoke a named tool on the remote server and get its
//! raw result text back. Pre-requisite chains use it for their read-only
//! lookups; the Write Orchestrator uses it for the final write.
//!
//! The live implementation reuses the connection discovery negotiated
//! (`McpToolCaller` in the infrastructure layer); this core never opens a
//! separate invocation connection.

use async_trait::async_trait;
use thiserror::Error;
use toolgate_domain::ArgMap;

/// Error invoking a tool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolCallError {
    /// The server ran the tool and reported failure.
    #[error("Tool '{tool}' failed: {message}")]
    Remote { tool: String, message: String },

    /// The request never produced a result (connection, framing, status).
    #[error("Transport error calling '{tool}': {message}")]
    Transport { tool: String, message: String },

    #[error("Tool '{tool}' timed out")]
    Timeout { tool: String },

    #[error("Not connected to a tool server")]
    NotConnected,
}

impl ToolCallError {
    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ToolCallError::Remote { .. })
    }
}

/// Port for invoking remote tools.
#[async_trait]
pub trait ToolCaller: Send + Sync {
    /// Call `tool` with `args`, returning the raw result text.
    async fn call(&self, tool: &str, args: &ArgMap) -> Result<String, ToolCallError>;
}
