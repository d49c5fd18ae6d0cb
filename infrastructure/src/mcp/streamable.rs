//! Variant A: streamable HTTP.
//!
//! Every JSON-RPC message is its own POST. The server answers a request
//! either with a plain JSON body or with an event stream whose frames carry
//! the reply (possibly preceded by notifications). A session id handed out
//! on `initialize` is echoed on later requests.

use super::error::{McpError, Result};
use super::http::{HEADER_SESSION_ID, HttpClient, HttpReply, HttpRequest, MAX_BODY_BYTES};
use super::protocol::{JsonRpcRequest, JsonRpcResponse, find_response};
use super::session::{McpSession, TransportVariant, credential_headers, preview};
use super::sse::{SseDecoder, SseFrame};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use toolgate_application::Credentials;
use tracing::{debug, trace};

pub struct StreamableHttpSession {
    http: Arc<dyn HttpClient>,
    url: String,
    headers: Vec<(String, String)>,
    request_timeout: Duration,
    session_id: Mutex<Option<String>>,
}

impl StreamableHttpSession {
    pub fn new(
        http: Arc<dyn HttpClient>,
        url: impl Into<String>,
        credentials: &Credentials,
        request_timeout: Duration,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            headers: credential_headers(credentials),
            request_timeout,
            session_id: Mutex::new(None),
        }
    }

    fn build(&self, body: Vec<u8>) -> HttpRequest {
        let mut request = HttpRequest::post(&self.url, body)
            .header("accept", "application/json, text/event-stream");
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        let session_id = self
            .session_id
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        match session_id {
            Some(id) => request.header(HEADER_SESSION_ID, id),
            None => request,
        }
    }

    async fn post(&self, message: &JsonRpcRequest) -> Result<HttpReply> {
        let reply = self.http.send(self.build(message.to_bytes()?)).await?;
        if let Some(id) = &reply.session_id {
            *self
                .session_id
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(id.clone());
        }
        if !reply.is_success() {
            let status = reply.status;
            let body = reply.read_all(MAX_BODY_BYTES).await.unwrap_or_default();
            return Err(McpError::HttpStatus {
                status,
                body: preview(&body),
            });
        }
        Ok(reply)
    }

    async fn exchange(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        let id = request
            .id
            .ok_or_else(|| McpError::UnexpectedResponse("request without id".into()))?;
        let reply = self.post(request).await?;

        if reply.is_event_stream() {
            debug!(method = %request.method, "Reading streamed reply");
            return read_streamed_reply(reply, id, MAX_BODY_BYTES).await;
        }

        let body = reply.read_all(MAX_BODY_BYTES).await?;
        find_response(&String::from_utf8_lossy(&body), id)?.ok_or_else(|| {
            McpError::UnexpectedResponse(format!("no reply with id {id}: {}", preview(&body)))
        })
    }
}

#[async_trait]
impl McpSession for StreamableHttpSession {
    fn variant(&self) -> TransportVariant {
        TransportVariant::Streamable
    }

    async fn request(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        tokio::time::timeout(self.request_timeout, self.exchange(request))
            .await
            .map_err(|_| McpError::Timeout {
                operation: "streamable request",
                after: self.request_timeout,
            })?
    }

    async fn notify(&self, notification: &JsonRpcRequest) -> Result<()> {
        tokio::time::timeout(self.request_timeout, self.post(notification))
            .await
            .map_err(|_| McpError::Timeout {
                operation: "streamable notification",
                after: self.request_timeout,
            })??;
        Ok(())
    }
}

/// Read frames until one carries the reply to `id`. An unterminated frame
/// larger than `limit` bytes fails the read.
async fn read_streamed_reply(
    mut reply: HttpReply,
    id: u64,
    limit: usize,
) -> Result<JsonRpcResponse> {
    let mut decoder = SseDecoder::new();
    while let Some(chunk) = reply.body.next_chunk().await? {
        for frame in decoder.push(&chunk) {
            if let Some(response) = match_frame(&frame, id)? {
                return Ok(response);
            }
        }
        if decoder.pending_len() > limit {
            return Err(McpError::MalformedFrame(format!(
                "event-stream frame exceeds {limit} bytes"
            )));
        }
    }
    if let Some(frame) = decoder.finish()
        && let Some(response) = match_frame(&frame, id)?
    {
        return Ok(response);
    }
    Err(McpError::StreamClosed)
}

fn match_frame(frame: &SseFrame, id: u64) -> Result<Option<JsonRpcResponse>> {
    if !frame.is_message() || frame.data.trim().is_empty() {
        trace!(event = %frame.event, "Skipping frame");
        return Ok(None);
    }
    find_response(&frame.data, id)
}
