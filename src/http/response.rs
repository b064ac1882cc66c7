//! Response encoding for the client-facing HTTP/1.1 surface.

use axum::http::StatusCode;
use bytes::{BufMut, Bytes, BytesMut};

/// Reason phrase of the quorum-failure response. Shares status 504 with a replica's own
/// gateway timeout and differs from it only here.
pub const NOT_ENOUGH_REPLICAS: &str = "Not Enough Replicas";

/// Terminating chunk of a chunked body.
pub const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    /// Overrides the canonical reason phrase.
    pub reason: Option<&'static str>,
    pub headers: Vec<(&'static str, String)>,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            reason: None,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn ok(body: Bytes) -> Self {
        Self::new(StatusCode::OK).with_body(body)
    }

    pub fn not_enough_replicas() -> Self {
        let mut response = Self::new(StatusCode::GATEWAY_TIMEOUT);
        response.reason = Some(NOT_ENOUGH_REPLICAS);
        response
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn is_not_enough_replicas(&self) -> bool {
        self.status == StatusCode::GATEWAY_TIMEOUT && self.reason == Some(NOT_ENOUGH_REPLICAS)
    }

    pub fn reason_phrase(&self) -> &str {
        self.reason
            .or_else(|| self.status.canonical_reason())
            .unwrap_or("Unknown")
    }

    /// Status line, headers and (unless `include_body` is false, as for HEAD) the body.
    pub fn encode(&self, keep_alive: bool, include_body: bool) -> Bytes {
        let mut buf = BytesMut::with_capacity(128 + self.body.len());
        self.put_head(&mut buf, keep_alive);
        put_header(&mut buf, "Content-Length", &self.body.len().to_string());
        buf.put_slice(b"\r\n");
        if include_body {
            buf.put_slice(&self.body);
        }
        buf.freeze()
    }

    /// Status line and headers of a chunked response. The body is ignored; it follows as
    /// chunks.
    pub fn encode_chunked_head(&self, keep_alive: bool) -> Bytes {
        let mut buf = BytesMut::with_capacity(128);
        self.put_head(&mut buf, keep_alive);
        put_header(&mut buf, "Transfer-Encoding", "chunked");
        buf.put_slice(b"\r\n");
        buf.freeze()
    }

    fn put_head(&self, buf: &mut BytesMut, keep_alive: bool) {
        buf.put_slice(b"HTTP/1.1 ");
        buf.put_slice(self.status.as_str().as_bytes());
        buf.put_u8(b' ');
        buf.put_slice(self.reason_phrase().as_bytes());
        buf.put_slice(b"\r\n");
        for (name, value) in &self.headers {
            put_header(buf, name, value);
        }
        put_header(
            buf,
            "Connection",
            if keep_alive { "keep-alive" } else { "close" },
        );
    }
}

/// Frames `data` as one chunk of a chunked body. `data` must not be empty; an empty chunk
/// terminates the body.
pub fn encode_chunk(data: &[u8]) -> Bytes {
    debug_assert!(!data.is_empty());
    let mut buf = BytesMut::with_capacity(data.len() + 12);
    buf.put_slice(format!("{:x}\r\n", data.len()).as_bytes());
    buf.put_slice(data);
    buf.put_slice(b"\r\n");
    buf.freeze()
}

fn put_header(buf: &mut BytesMut, name: &str, value: &str) {
    buf.put_slice(name.as_bytes());
    buf.put_slice(b": ");
    buf.put_slice(value.as_bytes());
    buf.put_slice(b"\r\n");
}
