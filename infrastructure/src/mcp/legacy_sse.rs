//! Variant B: event-stream subscription with a POST side channel.
//!
//! ```text
//! client                                   server
//!   │ GET /sse  (Accept: text/event-stream)  │
//!   │◀──────────── event: endpoint ──────────│  data: /messages?sessionId=..
//!   │ POST endpoint {initialize, id: 1}      │
//!   │◀──────────── event: message ───────────│  data: {"id": 1, "result": ..}
//!   │ POST endpoint {initialized}            │
//!   │ POST endpoint {tools/list, id: 2}      │
//!   │◀──────────── event: message ───────────│  data: {"id": 2, "result": ..}
//! ```
//!
//! Replies arrive on the subscription, not on the POST, so they are matched
//! by id. Replies for other ids are parked until asked for; a reply id seen
//! twice is dropped. Requests are serialized and ids only grow, so replies
//! below the id being awaited belong to requests that already gave up and
//! are discarded. Each read waits at most `poll_timeout` so a silent stream
//! cannot stall past the request deadline.

use super::error::{McpError, Result};
use super::http::{BodyStream, HttpClient, HttpRequest, MAX_BODY_BYTES};
use super::protocol::{JsonRpcRequest, JsonRpcResponse, find_response, parse_responses};
use super::session::{McpSession, TransportVariant, credential_headers, preview};
use super::sse::{SseDecoder, SseFrame};
use async_trait::async_trait;
use reqwest::Url;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use toolgate_application::Credentials;
use tracing::{debug, trace, warn};

/// Read limits for one wait on the subscription.
#[derive(Debug, Clone, Copy)]
pub struct ReadWindow {
    /// Budget for a whole request, from send to reply
    pub request_timeout: Duration,
    /// Longest single wait for the next chunk
    pub poll_timeout: Duration,
}

struct EventStream {
    body: Box<dyn BodyStream>,
    decoder: SseDecoder,
    queued: VecDeque<SseFrame>,
    delivered: HashSet<u64>,
    parked: HashMap<u64, JsonRpcResponse>,
}

impl EventStream {
    fn new(body: Box<dyn BodyStream>) -> Self {
        Self {
            body,
            decoder: SseDecoder::new(),
            queued: VecDeque::new(),
            delivered: HashSet::new(),
            parked: HashMap::new(),
        }
    }

    async fn next_frame(&mut self, deadline: Instant, window: ReadWindow) -> Result<SseFrame> {
        loop {
            if let Some(frame) = self.queued.pop_front() {
                return Ok(frame);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(McpError::Timeout {
                    operation: "sse read",
                    after: window.request_timeout,
                });
            }
            let wait = window.poll_timeout.min(deadline - now);
            match tokio::time::timeout(wait, self.body.next_chunk()).await {
                Err(_) => trace!(wait_ms = wait.as_millis() as u64, "SSE poll elapsed"),
                Ok(Ok(Some(chunk))) => {
                    self.queued.extend(self.decoder.push(&chunk));
                    if self.decoder.pending_len() > MAX_BODY_BYTES {
                        return Err(McpError::MalformedFrame(format!(
                            "event-stream frame exceeds {MAX_BODY_BYTES} bytes"
                        )));
                    }
                }
                Ok(Ok(None)) => match self.decoder.finish() {
                    Some(frame) => self.queued.push_back(frame),
                    None => return Err(McpError::StreamClosed),
                },
                Ok(Err(e)) => return Err(e),
            }
        }
    }

    /// Record a reply; `None` for a duplicate or a reply without an id.
    fn accept(&mut self, response: JsonRpcResponse) -> Option<(u64, JsonRpcResponse)> {
        let id = response.id_u64()?;
        if !self.delivered.insert(id) {
            debug!(id, "Duplicate reply suppressed");
            return None;
        }
        Some((id, response))
    }

    async fn await_reply(
        &mut self,
        id: u64,
        deadline: Instant,
        window: ReadWindow,
    ) -> Result<JsonRpcResponse> {
        self.forget_before(id);
        loop {
            if let Some(response) = self.parked.remove(&id) {
                return Ok(response);
            }
            let frame = self.next_frame(deadline, window).await?;
            if !frame.is_message() {
                trace!(event = %frame.event, "Skipping frame");
                continue;
            }
            let responses = match parse_responses(&frame.data) {
                Ok(responses) => responses,
                Err(e) => {
                    warn!(error = %e, "Ignoring malformed message frame");
                    continue;
                }
            };
            for response in responses {
                if let Some(reply_id) = response.id_u64()
                    && reply_id < id
                {
                    debug!(id = reply_id, "Late reply discarded");
                    continue;
                }
                if let Some((reply_id, response)) = self.accept(response) {
                    self.parked.insert(reply_id, response);
                }
            }
        }
    }

    /// Drop bookkeeping for requests older than `id`.
    fn forget_before(&mut self, id: u64) {
        self.parked.retain(|reply_id, _| *reply_id >= id);
        self.delivered.retain(|reply_id| *reply_id >= id);
    }
}

pub struct SseSession {
    http: Arc<dyn HttpClient>,
    endpoint: String,
    headers: Vec<(String, String)>,
    window: ReadWindow,
    stream: Mutex<EventStream>,
}

impl SseSession {
    /// Subscribe to `sse_url` and wait for the endpoint announcement.
    pub async fn open(
        http: Arc<dyn HttpClient>,
        sse_url: &str,
        credentials: &Credentials,
        window: ReadWindow,
    ) -> Result<Self> {
        let headers = credential_headers(credentials);
        let mut request = HttpRequest::get(sse_url).header("accept", "text/event-stream");
        for (name, value) in &headers {
            request = request.header(name, value);
        }

        let reply = http.send(request).await?;
        if !reply.is_success() {
            let status = reply.status;
            let body = reply.read_all(MAX_BODY_BYTES).await.unwrap_or_default();
            return Err(McpError::HttpStatus {
                status,
                body: preview(&body),
            });
        }

        let mut stream = EventStream::new(reply.body);
        let deadline = Instant::now() + window.request_timeout;
        let announced = loop {
            match stream.next_frame(deadline, window).await {
                Ok(frame) if frame.is_endpoint() => break frame,
                Ok(frame) => trace!(event = %frame.event, "Frame before endpoint ignored"),
                Err(McpError::StreamClosed) => return Err(McpError::MissingEndpoint),
                Err(e) => return Err(e),
            }
        };
        let endpoint = resolve_endpoint(sse_url, announced.data.trim())?;
        debug!(endpoint = %endpoint, "SSE endpoint announced");

        Ok(Self {
            http,
            endpoint,
            headers,
            window,
            stream: Mutex::new(stream),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST a message to the side channel. Returns the reply body, which
    /// some servers use to answer inline.
    async fn post(&self, message: &JsonRpcRequest) -> Result<Vec<u8>> {
        let mut request = HttpRequest::post(&self.endpoint, message.to_bytes()?);
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        let reply = self.http.send(request).await?;
        let status = reply.status;
        let success = reply.is_success();
        let body = reply.read_all(MAX_BODY_BYTES).await?;
        if !success {
            return Err(McpError::HttpStatus {
                status,
                body: preview(&body),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl McpSession for SseSession {
    fn variant(&self) -> TransportVariant {
        TransportVariant::Sse
    }

    async fn request(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        let id = request
            .id
            .ok_or_else(|| McpError::UnexpectedResponse("request without id".into()))?;
        let deadline = Instant::now() + self.window.request_timeout;

        // Held across the POST so no other caller consumes our reply.
        let mut stream = self.stream.lock().await;
        let body = tokio::time::timeout_at(deadline, self.post(request))
            .await
            .map_err(|_| McpError::Timeout {
                operation: "sse post",
                after: self.window.request_timeout,
            })??;

        let inline = std::str::from_utf8(&body)
            .ok()
            .filter(|text| text.trim_start().starts_with(['{', '[']))
            .and_then(|text| find_response(text, id).ok().flatten());
        if let Some(response) = inline
            && let Some((_, response)) = stream.accept(response)
        {
            trace!(id, "Reply received inline");
            return Ok(response);
        }

        stream.await_reply(id, deadline, self.window).await
    }

    async fn notify(&self, notification: &JsonRpcRequest) -> Result<()> {
        tokio::time::timeout(self.window.request_timeout, self.post(notification))
            .await
            .map_err(|_| McpError::Timeout {
                operation: "sse notification",
                after: self.window.request_timeout,
            })??;
        Ok(())
    }
}

/// Resolve the announced endpoint against the subscription URL.
pub fn resolve_endpoint(sse_url: &str, announced: &str) -> Result<String> {
    let invalid = |reason: String| McpError::InvalidUrl {
        url: announced.to_string(),
        reason,
    };
    if announced.is_empty() {
        return Err(invalid("empty endpoint".into()));
    }
    let base = Url::parse(sse_url).map_err(|e| invalid(e.to_string()))?;
    let endpoint = base.join(announced).map_err(|e| invalid(e.to_string()))?;
    Ok(endpoint.to_string())
}
