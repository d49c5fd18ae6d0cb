//! JSON-RPC protocol types for MCP communication.
//!
//! # Protocol Overview
//!
//! - **Requests**: client → server, carry an `id` (`initialize`, `tools/list`, `tools/call`)
//! - **Notifications**: client → server, no `id` (`notifications/initialized`)
//! - **Responses**: server → client, `result` or `error`, correlated by `id`
//!
//! Servers may answer with a single object or a batch array; anything in the
//! payload that is not a response (server notifications, pings) is dropped.

use super::error::{McpError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use toolgate_domain::ToolDescriptor;

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_INITIALIZED: &str = "notifications/initialized";
pub const METHOD_TOOLS_LIST: &str = "tools/list";
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// Global request ID counter for JSON-RPC requests.
static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    REQUEST_ID.fetch_add(1, Ordering::SeqCst)
}

/// JSON-RPC request or notification
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a request with an auto-generated ID.
    pub fn request(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: Some(next_id()),
            method: method.into(),
            params,
        }
    }

    /// Creates a notification (no reply expected).
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: None,
            method: method.into(),
            params,
        }
    }

    /// Method plus canonical params, independent of the request id.
    pub fn signature(&self) -> String {
        match &self.params {
            Some(params) => format!("{}:{}", self.method, params),
            None => self.method.clone(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// JSON-RPC response
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// The numeric id, tolerating servers that echo it back as a string.
    pub fn id_u64(&self) -> Option<u64> {
        match self.id.as_ref()? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<Value> {
        if let Some(error) = self.error {
            return Err(McpError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// Parse a message payload into the responses it contains.
pub fn parse_responses(payload: &str) -> Result<Vec<JsonRpcResponse>> {
    let value: Value = serde_json::from_str(payload.trim())
        .map_err(|e| McpError::MalformedFrame(format!("invalid JSON payload: {e}")))?;
    let items = match value {
        Value::Array(items) => items,
        single => vec![single],
    };
    Ok(items
        .into_iter()
        .filter(|item| item.get("result").is_some() || item.get("error").is_some())
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// Find the response to `id` in a payload.
pub fn find_response(payload: &str, id: u64) -> Result<Option<JsonRpcResponse>> {
    Ok(parse_responses(payload)?
        .into_iter()
        .find(|r| r.id_u64() == Some(id)))
}

/// Params of the `initialize` request.
pub fn initialize_params(protocol_version: &str, client_name: &str, client_version: &str) -> Value {
    json!({
        "protocolVersion": protocol_version,
        "capabilities": {},
        "clientInfo": {
            "name": client_name,
            "version": client_version,
        }
    })
}

#[derive(Debug, Clone, Deserialize)]
struct WireTool {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "inputSchema")]
    input_schema: Option<Value>,
}

/// One page of a `tools/list` result.
#[derive(Debug, Clone)]
pub struct ToolsPage {
    pub tools: Vec<ToolDescriptor>,
    pub next_cursor: Option<String>,
}

/// Parse a `tools/list` result.
pub fn parse_tools_page(result: Value) -> Result<ToolsPage> {
    let tools = result
        .get("tools")
        .cloned()
        .ok_or_else(|| McpError::UnexpectedResponse("tools/list result has no 'tools'".into()))?;
    let tools: Vec<WireTool> = serde_json::from_value(tools)?;
    let next_cursor = result
        .get("nextCursor")
        .and_then(|c| c.as_str())
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    Ok(ToolsPage {
        tools: tools
            .into_iter()
            .map(|t| {
                ToolDescriptor::from_input_schema(
                    t.name,
                    t.description.unwrap_or_default(),
                    t.input_schema
                        .unwrap_or_else(|| json!({"type": "object", "properties": {}})),
                )
            })
            .collect(),
        next_cursor,
    })
}

/// Flatten a `tools/call` result to text.
///
/// Text content items are joined with newlines; other content items are
/// kept as JSON. `isError: true` becomes [`McpError::ToolFailed`].
pub fn call_result_text(tool: &str, result: Value) -> Result<String> {
    let is_error = result
        .get("isError")
        .and_then(|e| e.as_bool())
        .unwrap_or(false);

    let text = match result.get("content").and_then(|c| c.as_array()) {
        Some(items) => items
            .iter()
            .map(|item| match item.get("text").and_then(|t| t.as_str()) {
                Some(text) => text.to_string(),
                None => item.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        None => match result.get("structuredContent") {
            Some(structured) => structured.to_string(),
            None => result.to_string(),
        },
    };

    if is_error {
        return Err(McpError::ToolFailed {
            tool: tool.to_string(),
            message: text,
        });
    }
    Ok(text)
}
