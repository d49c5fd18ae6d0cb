//! Transport Negotiator
//!
//! Discovers a server's tools without knowing which transport it speaks:
//!
//! ```text
//! discover(credentials)
//!   ├─ Variant A (streamable)   per-call timeout, attempt budget
//!   │    ok ──────────────────────────────▶ catalog + connection
//!   │    HTTP error / bad frames / timeout / budget spent
//!   ▼
//!   ├─ Variant B (sse)          overall timeout, per-read poll timeout
//!   │    ok ──────────────────────────────▶ catalog + connection
//!   │    deadline ────────────────────────▶ DiscoveryError::Timeout
//!   ▼
//!   DiscoveryError::ServiceUnavailable { attempts }
//! ```
//!
//! The handshake is the same on both variants: `initialize`, the
//! `notifications/initialized` acknowledgement, then `tools/list` until the
//! server stops returning a cursor or `max_tool_pages` pages were read. The connection that succeeded is kept and
//! serves later `tools/call` requests.

use super::error::{McpError, Result};
use super::http::{HttpClient, ReqwestHttpClient};
use super::legacy_sse::{ReadWindow, SseSession};
use super::protocol::{
    JsonRpcRequest, JsonRpcResponse, METHOD_INITIALIZE, METHOD_INITIALIZED, METHOD_TOOLS_CALL,
    METHOD_TOOLS_LIST, call_result_text, initialize_params, parse_tools_page,
};
use super::session::{McpSession, TransportVariant};
use super::streamable::StreamableHttpSession;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use toolgate_application::{Credentials, DiscoveryError, ToolDiscoveryPort};
use toolgate_domain::{ArgMap, ToolDescriptor};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct NegotiatorConfig {
    /// Variant A endpoint
    pub server_url: String,
    /// Variant B subscription URL; derived from `server_url` when unset
    pub sse_url: Option<String>,
    /// Variant A per-call timeout, also each Variant B request
    pub request_timeout: Duration,
    /// Variant A budget for the whole handshake
    pub streamable_timeout: Duration,
    /// Variant B overall timeout
    pub sse_timeout: Duration,
    /// Variant B per-read poll timeout
    pub sse_poll_timeout: Duration,
    /// Upper bound on `tools/list` pages per attempt
    pub max_tool_pages: usize,
    pub protocol_version: String,
    pub client_name: String,
    pub client_version: String,
}

impl Default for NegotiatorConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080/mcp".to_string(),
            sse_url: None,
            request_timeout: Duration::from_secs(10),
            streamable_timeout: Duration::from_secs(30),
            sse_timeout: Duration::from_secs(25),
            sse_poll_timeout: Duration::from_secs(4),
            max_tool_pages: 50,
            protocol_version: "2024-11-05".to_string(),
            client_name: "toolgate".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl NegotiatorConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    pub fn with_sse_url(mut self, url: impl Into<String>) -> Self {
        self.sse_url = Some(url.into());
        self
    }

    /// Variant B subscription URL. Without an explicit one, a trailing
    /// `/mcp` is swapped for `/sse`, otherwise `/sse` is appended.
    pub fn resolved_sse_url(&self) -> String {
        if let Some(url) = &self.sse_url {
            return url.clone();
        }
        let base = self.server_url.trim_end_matches('/');
        match base.strip_suffix("/mcp") {
            Some(root) => format!("{root}/sse"),
            None => format!("{base}/sse"),
        }
    }

    fn read_window(&self) -> ReadWindow {
        ReadWindow {
            request_timeout: self.request_timeout,
            poll_timeout: self.sse_poll_timeout,
        }
    }
}

/// Refuses to send the same request twice within one discovery attempt.
///
/// Keyed by variant plus method and params, so a server that hands back the
/// same `tools/list` cursor forever fails the variant instead of looping.
#[derive(Debug, Default)]
struct LoopGuard {
    sent: HashSet<String>,
}

impl LoopGuard {
    fn admit(&mut self, variant: TransportVariant, request: &JsonRpcRequest) -> Result<()> {
        let key = format!("{variant}|{}", request.signature());
        if !self.sent.insert(key) {
            warn!(variant = %variant, method = %request.method, "Loop guard tripped");
            return Err(McpError::LoopDetected(request.signature()));
        }
        Ok(())
    }
}

/// A negotiated connection, reused for tool calls.
pub struct McpConnection {
    session: Box<dyn McpSession>,
}

impl McpConnection {
    fn new(session: Box<dyn McpSession>) -> Self {
        Self { session }
    }

    pub fn variant(&self) -> TransportVariant {
        self.session.variant()
    }

    /// Invoke `tools/call` and flatten the result to text.
    pub async fn call_tool(&self, tool: &str, args: &ArgMap) -> Result<String> {
        let request = JsonRpcRequest::request(
            METHOD_TOOLS_CALL,
            Some(json!({"name": tool, "arguments": Value::Object(args.clone())})),
        );
        let result = self.session.request(&request).await?.into_result()?;
        call_result_text(tool, result)
    }
}

pub struct TransportNegotiator {
    http: Arc<dyn HttpClient>,
    config: NegotiatorConfig,
    connection: RwLock<Option<Arc<McpConnection>>>,
}

impl TransportNegotiator {
    /// Negotiator over a reqwest client.
    pub fn new(config: NegotiatorConfig) -> Result<Self> {
        let http = Arc::new(ReqwestHttpClient::new(config.request_timeout)?);
        Ok(Self::with_http_client(config, http))
    }

    pub fn with_http_client(config: NegotiatorConfig, http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            config,
            connection: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &NegotiatorConfig {
        &self.config
    }

    /// Connection from the last successful discovery.
    pub fn connection(&self) -> Option<Arc<McpConnection>> {
        self.connection
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Try Variant A, then Variant B.
    pub async fn negotiate(
        &self,
        credentials: &Credentials,
    ) -> std::result::Result<(Arc<McpConnection>, Vec<ToolDescriptor>), DiscoveryError> {
        let mut guard = LoopGuard::default();
        let mut attempts = Vec::new();

        let streamable = tokio::time::timeout(
            self.config.streamable_timeout,
            self.try_streamable(credentials, &mut guard),
        )
        .await;
        match streamable {
            Ok(Ok(found)) => return Ok(found),
            Ok(Err(e)) => {
                warn!(variant = "streamable", error = %e, "Variant failed, falling back to SSE");
                attempts.push(format!("streamable: {e}"));
            }
            Err(_) => {
                let after = self.config.streamable_timeout.as_secs();
                warn!(variant = "streamable", after_secs = after, "Attempt budget spent, falling back to SSE");
                attempts.push(format!("streamable: timed out after {after}s"));
            }
        }

        let sse = tokio::time::timeout(
            self.config.sse_timeout,
            self.try_sse(credentials, &mut guard),
        )
        .await;
        match sse {
            Ok(Ok(found)) => Ok(found),
            Ok(Err(e)) if e.is_timeout() => {
                warn!(variant = "sse", error = %e, "Variant timed out");
                Err(DiscoveryError::Timeout {
                    after_secs: self.config.sse_timeout.as_secs(),
                })
            }
            Ok(Err(e)) => {
                warn!(variant = "sse", error = %e, "Variant failed");
                attempts.push(format!("sse: {e}"));
                Err(DiscoveryError::ServiceUnavailable { attempts })
            }
            Err(_) => {
                warn!(variant = "sse", "Overall SSE deadline passed");
                Err(DiscoveryError::Timeout {
                    after_secs: self.config.sse_timeout.as_secs(),
                })
            }
        }
    }

    async fn try_streamable(
        &self,
        credentials: &Credentials,
        guard: &mut LoopGuard,
    ) -> Result<(Arc<McpConnection>, Vec<ToolDescriptor>)> {
        debug!(url = %self.config.server_url, "Trying streamable HTTP");
        let session = StreamableHttpSession::new(
            self.http.clone(),
            &self.config.server_url,
            credentials,
            self.config.request_timeout,
        );
        let tools = handshake(&session, &self.config, guard).await?;
        Ok((Arc::new(McpConnection::new(Box::new(session))), tools))
    }

    async fn try_sse(
        &self,
        credentials: &Credentials,
        guard: &mut LoopGuard,
    ) -> Result<(Arc<McpConnection>, Vec<ToolDescriptor>)> {
        let url = self.config.resolved_sse_url();
        debug!(url = %url, "Trying SSE subscription");
        let session =
            SseSession::open(self.http.clone(), &url, credentials, self.config.read_window())
                .await?;
        let tools = handshake(&session, &self.config, guard).await?;
        Ok((Arc::new(McpConnection::new(Box::new(session))), tools))
    }
}

#[async_trait]
impl ToolDiscoveryPort for TransportNegotiator {
    async fn discover(
        &self,
        credentials: &Credentials,
    ) -> std::result::Result<Vec<ToolDescriptor>, DiscoveryError> {
        let (connection, tools) = self.negotiate(credentials).await?;
        info!(
            variant = %connection.variant(),
            tools = tools.len(),
            "Tool discovery complete"
        );
        *self
            .connection
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(connection);
        Ok(tools)
    }
}

async fn send_guarded(
    session: &dyn McpSession,
    guard: &mut LoopGuard,
    request: &JsonRpcRequest,
) -> Result<JsonRpcResponse> {
    guard.admit(session.variant(), request)?;
    session.request(request).await
}

async fn handshake(
    session: &dyn McpSession,
    config: &NegotiatorConfig,
    guard: &mut LoopGuard,
) -> Result<Vec<ToolDescriptor>> {
    let init = JsonRpcRequest::request(
        METHOD_INITIALIZE,
        Some(initialize_params(
            &config.protocol_version,
            &config.client_name,
            &config.client_version,
        )),
    );
    let server = send_guarded(session, guard, &init).await?.into_result()?;
    let server_info = server
        .get("serverInfo")
        .map(|info| info.to_string())
        .unwrap_or_default();
    debug!(variant = %session.variant(), server = %server_info, "Initialized");

    session
        .notify(&JsonRpcRequest::notification(METHOD_INITIALIZED, None))
        .await?;

    let mut tools = Vec::new();
    let mut cursor: Option<String> = None;
    for _ in 0..config.max_tool_pages {
        let params = cursor.as_ref().map(|c| json!({"cursor": c}));
        let list = JsonRpcRequest::request(METHOD_TOOLS_LIST, params);
        let page = parse_tools_page(send_guarded(session, guard, &list).await?.into_result()?)?;
        tools.extend(page.tools);
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => return Ok(tools),
        }
    }
    Err(McpError::UnexpectedResponse(format!(
        "tools/list still paging after {} pages",
        config.max_tool_pages
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::fake_server::{FakeServer, SseMode, StreamableMode};
    use crate::mcp::http::HttpMethod;

    fn negotiator(server: &Arc<FakeServer>) -> TransportNegotiator {
        TransportNegotiator::with_http_client(
            NegotiatorConfig::new(FakeServer::MCP_URL),
            server.clone(),
        )
    }

    fn creds() -> Credentials {
        Credentials::new("bearer tok-123", "ent-1", "org-1").unwrap()
    }

    #[test]
    fn test_sse_url_derivation() {
        assert_eq!(
            NegotiatorConfig::new("https://x.example.com/mcp").resolved_sse_url(),
            "https://x.example.com/sse"
        );
        assert_eq!(
            NegotiatorConfig::new("https://x.example.com/api/").resolved_sse_url(),
            "https://x.example.com/api/sse"
        );
        assert_eq!(
            NegotiatorConfig::new("https://x.example.com/mcp")
                .with_sse_url("https://y.example.com/events")
                .resolved_sse_url(),
            "https://y.example.com/events"
        );
    }

    #[tokio::test]
    async fn test_streamable_json() {
        let server = Arc::new(FakeServer::new(StreamableMode::Json, SseMode::Unavailable));
        let negotiator = negotiator(&server);

        let tools = negotiator.discover(&creds()).await.unwrap();
        assert_eq!(tools.len(), 3);
        assert_eq!(
            negotiator.connection().unwrap().variant(),
            TransportVariant::Streamable
        );
        assert!(server.requests_by(HttpMethod::Get).is_empty());

        let auth = server.header_values("authorization");
        assert!(!auth.is_empty());
        assert!(auth.iter().all(|v| v == "Bearer tok-123"));
        assert!(server.header_values("x-organization-id").iter().all(|v| v == "org-1"));
    }

    #[tokio::test]
    async fn test_streamable_event_stream_with_split_frames() {
        let server = Arc::new(FakeServer::new(StreamableMode::EventStream, SseMode::Unavailable));
        let tools = negotiator(&server).discover(&creds()).await.unwrap();
        assert_eq!(tools.len(), 3);
        assert!(tools.iter().any(|t| t.name == "create_payment"));
    }

    #[tokio::test]
    async fn test_paginated_tools_list() {
        let server = Arc::new(FakeServer::new(StreamableMode::Paged, SseMode::Unavailable));
        let tools = negotiator(&server).discover(&creds()).await.unwrap();
        assert_eq!(tools.len(), 3);
    }

    #[tokio::test]
    async fn test_http_error_falls_back_to_sse() {
        let server = Arc::new(FakeServer::new(StreamableMode::Status(405), SseMode::Normal));
        let negotiator = negotiator(&server);

        let tools = negotiator.discover(&creds()).await.unwrap();
        assert_eq!(tools.len(), 3);
        assert_eq!(server.requests_by(HttpMethod::Get).len(), 1);
        let connection = negotiator.connection().unwrap();
        assert_eq!(connection.variant(), TransportVariant::Sse);

        let text = connection.call_tool("get_invoice", &ArgMap::new()).await.unwrap();
        assert_eq!(text, "called get_invoice");
    }

    #[tokio::test]
    async fn test_sse_duplicate_replies_suppressed() {
        let server = Arc::new(FakeServer::new(StreamableMode::Status(404), SseMode::Duplicating));
        let negotiator = negotiator(&server);
        negotiator.discover(&creds()).await.unwrap();

        let connection = negotiator.connection().unwrap();
        assert_eq!(
            connection.call_tool("list_accounts", &ArgMap::new()).await.unwrap(),
            "called list_accounts"
        );
        assert_eq!(
            connection.call_tool("get_contact", &ArgMap::new()).await.unwrap(),
            "called get_contact"
        );
    }

    #[tokio::test]
    async fn test_both_variants_fail() {
        let server = Arc::new(FakeServer::new(StreamableMode::Status(503), SseMode::Unavailable));
        let err = negotiator(&server).discover(&creds()).await.unwrap_err();
        let DiscoveryError::ServiceUnavailable { attempts } = err else {
            panic!("expected service unavailable, got {err:?}");
        };
        assert_eq!(attempts.len(), 2);
        assert!(attempts[0].starts_with("streamable: HTTP status 503"));
        assert!(attempts[1].starts_with("sse: "));
    }

    #[tokio::test]
    async fn test_repeated_cursor_trips_loop_guard() {
        let server = Arc::new(FakeServer::new(StreamableMode::CyclingCursor, SseMode::Unavailable));
        let err = negotiator(&server).discover(&creds()).await.unwrap_err();
        let DiscoveryError::ServiceUnavailable { attempts } = err else {
            panic!("expected service unavailable");
        };
        assert!(attempts[0].contains("already sent"));
        assert_eq!(server.count_method("tools/list"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_sse_stream_times_out() {
        let server = Arc::new(FakeServer::new(StreamableMode::Status(404), SseMode::Silent));
        let err = negotiator(&server).discover(&creds()).await.unwrap_err();
        assert_eq!(err, DiscoveryError::Timeout { after_secs: 25 });
    }

    #[tokio::test]
    async fn test_endless_cursor_stops_at_page_cap() {
        let server = Arc::new(FakeServer::new(StreamableMode::EndlessCursor, SseMode::Unavailable));
        let err = negotiator(&server).discover(&creds()).await.unwrap_err();
        let DiscoveryError::ServiceUnavailable { attempts } = err else {
            panic!("expected service unavailable");
        };
        assert!(attempts[0].contains("still paging after 50 pages"), "{attempts:?}");
        assert_eq!(server.count_method("tools/list"), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_endless_streamable_falls_back_within_budget() {
        let server = Arc::new(FakeServer::new(
            StreamableMode::SlowEndlessCursor,
            SseMode::Normal,
        ));
        let negotiator = negotiator(&server);
        let started = tokio::time::Instant::now();

        let tools = negotiator.discover(&creds()).await.unwrap();
        assert_eq!(tools.len(), 3);
        assert_eq!(
            negotiator.connection().unwrap().variant(),
            TransportVariant::Sse
        );
        assert!(started.elapsed() < Duration::from_secs(60));
        assert!(server.count_method("tools/list") < 35);
    }

    #[tokio::test]
    async fn test_malformed_frame_falls_back_to_sse() {
        let server = Arc::new(FakeServer::new(StreamableMode::Malformed, SseMode::Normal));
        let negotiator = negotiator(&server);
        let tools = negotiator.discover(&creds()).await.unwrap();
        assert_eq!(tools.len(), 3);
        assert_eq!(
            negotiator.connection().unwrap().variant(),
            TransportVariant::Sse
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_streamable_falls_back() {
        let server = Arc::new(FakeServer::new(StreamableMode::Hang, SseMode::Normal));
        let negotiator = negotiator(&server);
        negotiator.discover(&creds()).await.unwrap();
        assert_eq!(
            negotiator.connection().unwrap().variant(),
            TransportVariant::Sse
        );
    }
}
