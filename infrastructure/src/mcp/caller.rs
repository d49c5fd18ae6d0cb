//! [`ToolCaller`] over the negotiated connection.

use super::error::McpError;
use super::negotiator::TransportNegotiator;
use async_trait::async_trait;
use std::sync::Arc;
use toolgate_application::{ToolCallError, ToolCaller};
use toolgate_domain::ArgMap;
use tracing::debug;

/// Routes tool calls through whichever transport discovery settled on.
pub struct McpToolCaller {
    negotiator: Arc<TransportNegotiator>,
}

impl McpToolCaller {
    pub fn new(negotiator: Arc<TransportNegotiator>) -> Self {
        Self { negotiator }
    }
}

#[async_trait]
impl ToolCaller for McpToolCaller {
    async fn call(&self, tool: &str, args: &ArgMap) -> Result<String, ToolCallError> {
        let connection = self
            .negotiator
            .connection()
            .ok_or(ToolCallError::NotConnected)?;
        debug!(tool = %tool, variant = %connection.variant(), "Calling tool");
        connection
            .call_tool(tool, args)
            .await
            .map_err(|e| to_call_error(tool, e))
    }
}

fn to_call_error(tool: &str, error: McpError) -> ToolCallError {
    let tool = tool.to_string();
    match error {
        McpError::ToolFailed { message, .. } => ToolCallError::Remote { tool, message },
        McpError::Rpc { code, message } => ToolCallError::Remote {
            tool,
            message: format!("{message} (code {code})"),
        },
        McpError::Timeout { .. } => ToolCallError::Timeout { tool },
        other => ToolCallError::Transport {
            tool,
            message: other.to_string(),
        },
    }
}
