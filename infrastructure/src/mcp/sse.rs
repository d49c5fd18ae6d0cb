//! Server-sent event framing.
//!
//! Frames are separated by a blank line (`\n\n` or `\r\n\r\n`). Chunks from
//! the network rarely line up with frame boundaries, so [`SseDecoder`] keeps
//! the unterminated tail in a carry-over buffer and only emits complete
//! frames.

/// One decoded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// `event:` field, `message` when absent
    pub event: String,
    /// `data:` lines joined with `\n`
    pub data: String,
    pub id: Option<String>,
}

impl SseFrame {
    pub fn is_endpoint(&self) -> bool {
        self.event == "endpoint"
    }

    pub fn is_message(&self) -> bool {
        self.event == "message"
    }
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no boundary
    scanned: usize,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();
        // A boundary is at most 4 bytes, so it can start up to 3 bytes
        // before the end of the previous scan.
        let mut from = self.scanned.saturating_sub(3);
        while let Some((start, len)) = find_boundary(&self.buffer, from) {
            let block: Vec<u8> = self.buffer.drain(..start + len).take(start).collect();
            if let Some(frame) = parse_block(&block) {
                frames.push(frame);
            }
            from = 0;
        }
        self.scanned = self.buffer.len();
        frames
    }

    /// Flush the trailing frame at end of stream, if any.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let block = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        parse_block(&block)
    }

    /// Bytes held back waiting for a frame boundary.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Decode a complete body in one go.
pub fn decode_all(body: &[u8]) -> Vec<SseFrame> {
    let mut decoder = SseDecoder::new();
    let mut frames = decoder.push(body);
    frames.extend(decoder.finish());
    frames
}

fn find_boundary(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    (from..buf.len()).find_map(|i| {
        let rest = &buf[i..];
        if rest.starts_with(b"\r\n\r\n") {
            Some((i, 4))
        } else if rest.starts_with(b"\n\n") || rest.starts_with(b"\r\r") {
            Some((i, 2))
        } else {
            None
        }
    })
}

fn parse_block(block: &[u8]) -> Option<SseFrame> {
    let text = String::from_utf8_lossy(block);
    let mut event = None;
    let mut data: Vec<&str> = Vec::new();
    let mut id = None;

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data.push(value),
            "id" => id = Some(value.to_string()),
            _ => {}
        }
    }

    if data.is_empty() && event.is_none() {
        return None;
    }
    Some(SseFrame {
        event: event.unwrap_or_else(|| "message".to_string()),
        data: data.join("\n"),
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: mess").is_empty());
        assert!(decoder.push(b"age\ndata: {\"id\":1,").is_empty());
        let frames = decoder.push(b"\"result\":{}}\n\nevent: endpoint\ndata: /msg");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "message");
        assert_eq!(frames[0].data, r#"{"id":1,"result":{}}"#);
        assert!(decoder.pending_len() > 0);

        let frames = decoder.push(b"?session=abc\n\n");
        assert!(frames[0].is_endpoint());
        assert_eq!(frames[0].data, "/msg?session=abc");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_frame_fed_byte_by_byte() {
        let body = b"event: message\r\ndata: {\"id\":7}\r\n\r\ndata: tail\n\n";
        let mut decoder = SseDecoder::new();
        let mut frames = Vec::new();
        for byte in body {
            frames.extend(decoder.push(std::slice::from_ref(byte)));
        }
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data, r#"{"id":7}"#);
        assert_eq!(frames[1].data, "tail");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_crlf_boundary_split_between_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: a\r\n\r").is_empty());
        let frames = decoder.push(b"\ndata: b\r\n\r\n");
        assert_eq!(
            frames.iter().map(|f| f.data.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_multiline_data_comments_and_id() {
        let frames = decode_all(b": keep-alive\n\nid: 42\ndata: line1\ndata:line2\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "line1\nline2");
        assert_eq!(frames[0].id.as_deref(), Some("42"));
    }

    #[test]
    fn test_trailing_frame_flushed_on_finish() {
        let frames = decode_all(b"event: message\ndata: {\"id\":3}");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, r#"{"id":3}"#);
    }
}
