//! Scripted in-process MCP server for transport tests.

use super::error::Result;
use super::http::{BodyStream, HttpClient, HttpMethod, HttpReply, HttpRequest};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy)]
pub enum StreamableMode {
    Json,
    /// Replies as an event stream, response frame split across chunks
    EventStream,
    /// `tools/list` over two pages
    Paged,
    /// `tools/list` always returns the same cursor
    CyclingCursor,
    /// `tools/list` returns a fresh cursor every time
    EndlessCursor,
    /// Like `EndlessCursor`, each reply taking a second
    SlowEndlessCursor,
    /// Replies with an event stream whose frame is not JSON
    Malformed,
    Status(u16),
    /// Never answers
    Hang,
}

#[derive(Debug, Clone, Copy)]
pub enum SseMode {
    Unavailable,
    Normal,
    /// Every reply frame is sent twice
    Duplicating,
    /// Subscription accepted but nothing is ever sent
    Silent,
}

pub struct FakeServer {
    streamable: StreamableMode,
    sse: SseMode,
    requests: Mutex<Vec<HttpRequest>>,
    stream_tx: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
}

impl FakeServer {
    pub const MCP_URL: &'static str = "http://fake.test/mcp";
    const SSE_URL: &'static str = "http://fake.test/sse";
    const ENDPOINT: &'static str = "http://fake.test/messages?sessionId=s-1";

    pub fn new(streamable: StreamableMode, sse: SseMode) -> Self {
        Self {
            streamable,
            sse,
            requests: Mutex::new(Vec::new()),
            stream_tx: Mutex::new(None),
        }
    }

    pub fn requests_by(&self, method: HttpMethod) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }

    pub fn header_values(&self, name: &str) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .flat_map(|r| r.headers.clone())
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
            .collect()
    }

    /// Number of JSON-RPC messages sent with `method`.
    pub fn count_method(&self, method: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.body.as_ref())
            .filter_map(|b| serde_json::from_slice::<Value>(b).ok())
            .filter(|m| m["method"] == method)
            .count()
    }

    /// Paging modes only shape replies on the streamable endpoint.
    fn answer(&self, message: &Value, streamable: bool) -> Option<Value> {
        let id = message.get("id")?.clone();
        let method = message["method"].as_str().unwrap_or_default();
        let cursor = message["params"]["cursor"].as_str();
        let all = tools();
        let result = match method {
            "initialize" => json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "fake", "version": "0.0.1"}
            }),
            "tools/list" if !streamable => json!({"tools": all}),
            "tools/list" => match (self.streamable, cursor) {
                (StreamableMode::Paged, None) => {
                    json!({"tools": all[..2].to_vec(), "nextCursor": "p2"})
                }
                (StreamableMode::Paged, Some(_)) => json!({"tools": all[2..].to_vec()}),
                (StreamableMode::CyclingCursor, _) => {
                    json!({"tools": all[..1].to_vec(), "nextCursor": "again"})
                }
                (StreamableMode::EndlessCursor | StreamableMode::SlowEndlessCursor, cursor) => {
                    let page = cursor
                        .and_then(|c| c.trim_start_matches('c').parse::<u64>().ok())
                        .unwrap_or(0);
                    json!({"tools": all[..1].to_vec(), "nextCursor": format!("c{}", page + 1)})
                }
                _ => json!({"tools": all}),
            },
            "tools/call" => json!({
                "content": [{"type": "text", "text": format!("called {}", message["params"]["name"].as_str().unwrap_or_default())}]
            }),
            _ => {
                return Some(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {"code": -32601, "message": "method not found"}
                }));
            }
        };
        Some(json!({"jsonrpc": "2.0", "id": id, "result": result}))
    }

    async fn post_streamable(&self, message: Option<Value>) -> Result<HttpReply> {
        if let StreamableMode::Status(status) = self.streamable {
            return Ok(reply(status, "text/plain", vec![b"unavailable".to_vec()]));
        }
        if let StreamableMode::Hang = self.streamable {
            return std::future::pending().await;
        }
        if let StreamableMode::SlowEndlessCursor = self.streamable {
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        }
        if let StreamableMode::Malformed = self.streamable {
            return Ok(reply(
                200,
                "text/event-stream",
                vec![b"event: message\ndata: {not json\n\n".to_vec()],
            ));
        }
        let Some(response) = message.as_ref().and_then(|m| self.answer(m, true)) else {
            return Ok(reply(202, "text/plain", Vec::new()));
        };

        if let StreamableMode::EventStream = self.streamable {
            let frame = format!("event: message\ndata: {response}\n\n");
            let (head, tail) = frame.split_at(frame.len() / 2);
            let mut streamed = reply(
                200,
                "text/event-stream",
                vec![
                    b"event: message\ndata: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\"}\n\n"
                        .to_vec(),
                    head.as_bytes().to_vec(),
                    tail.as_bytes().to_vec(),
                ],
            );
            streamed.session_id = Some("sess-1".to_string());
            return Ok(streamed);
        }
        Ok(reply(
            200,
            "application/json",
            vec![response.to_string().into_bytes()],
        ))
    }

    fn subscribe(&self) -> HttpReply {
        if let SseMode::Unavailable = self.sse {
            return reply(404, "text/plain", vec![b"no sse here".to_vec()]);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        if !matches!(self.sse, SseMode::Silent) {
            let _ = tx.send(b"event: endpoint\n".to_vec());
            let _ = tx.send(b"data: /messages?sessionId=s-1\n\n".to_vec());
        }
        *self.stream_tx.lock().unwrap() = Some(tx);
        HttpReply {
            status: 200,
            content_type: Some("text/event-stream".to_string()),
            session_id: None,
            body: Box::new(ChannelBody(rx)),
        }
    }

    fn side_channel(&self, message: Option<Value>) -> HttpReply {
        if let Some(response) = message.as_ref().and_then(|m| self.answer(m, false))
            && let Some(tx) = self.stream_tx.lock().unwrap().as_ref()
        {
            let frame = format!("event: message\ndata: {response}\n\n").into_bytes();
            if let SseMode::Duplicating = self.sse {
                let _ = tx.send(frame.clone());
            }
            let _ = tx.send(frame);
        }
        reply(202, "text/plain", vec![b"Accepted".to_vec()])
    }
}

#[async_trait]
impl HttpClient for FakeServer {
    async fn send(&self, request: HttpRequest) -> Result<HttpReply> {
        self.requests.lock().unwrap().push(request.clone());
        let message: Option<Value> = request
            .body
            .as_ref()
            .and_then(|b| serde_json::from_slice(b).ok());

        match request.method {
            HttpMethod::Post if request.url == Self::MCP_URL => self.post_streamable(message).await,
            HttpMethod::Get if request.url == Self::SSE_URL => Ok(self.subscribe()),
            HttpMethod::Post if request.url == Self::ENDPOINT => Ok(self.side_channel(message)),
            _ => Ok(reply(404, "text/plain", vec![b"not found".to_vec()])),
        }
    }
}

fn tools() -> Vec<Value> {
    vec![
        json!({
            "name": "create_payment",
            "description": "Create a payment against an invoice",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "Amount": {"type": "number"},
                    "InvoiceID": {"type": "string"},
                    "AccountId": {"type": "string"}
                },
                "required": ["Amount"]
            }
        }),
        json!({
            "name": "get_invoice",
            "description": "Fetch an invoice",
            "inputSchema": {"type": "object", "properties": {"InvoiceID": {"type": "string"}}}
        }),
        json!({"name": "list_accounts", "description": "List accounts"}),
    ]
}

/// A 200 reply whose body arrives as `chunks`.
pub fn chunked_reply(content_type: &str, chunks: Vec<Vec<u8>>) -> HttpReply {
    reply(200, content_type, chunks)
}

fn reply(status: u16, content_type: &str, chunks: Vec<Vec<u8>>) -> HttpReply {
    HttpReply {
        status,
        content_type: Some(content_type.to_string()),
        session_id: None,
        body: Box::new(ChunkBody(chunks.into())),
    }
}

struct ChunkBody(VecDeque<Vec<u8>>);

#[async_trait]
impl BodyStream for ChunkBody {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.0.pop_front())
    }
}

struct ChannelBody(mpsc::UnboundedReceiver<Vec<u8>>);

#[async_trait]
impl BodyStream for ChannelBody {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.0.recv().await)
    }
}
