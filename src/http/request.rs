//! Request parsing for the client-facing HTTP/1.1 surface.
//!
//! Only what the entity API needs: request line, headers, a `Content-Length` body and the
//! query string. The head itself is parsed by `httparse`. Requests are decoded straight off the socket by `RequestCodec`, so several
//! pipelined requests may be parsed before the first one is answered.

use crate::replication::protocol::MAX_VALUE_BYTES;

use axum::http::{Method, Version};
use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;

const DEFAULT_MAX_HEAD_BYTES: usize = 16 * 1024;
const MAX_HEADERS: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("malformed request: {0}")]
    Malformed(&'static str),

    #[error("request head exceeds {0} bytes")]
    HeadTooLarge(usize),

    #[error("request body of {0} bytes exceeds the limit")]
    BodyTooLarge(usize),

    #[error("invalid request head: {0}")]
    Parse(#[from] httparse::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub version: Version,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Request {
    /// Builds a request from its parts; `target` is the raw request target (path and query).
    pub fn new(method: Method, target: &str, version: Version) -> Result<Self, RequestError> {
        let url = reqwest::Url::parse("http://localhost")
            .and_then(|base| base.join(target))
            .map_err(|_| RequestError::Malformed("invalid request target"))?;

        Ok(Self {
            method,
            path: url.path().to_string(),
            version,
            query: url.query_pairs().into_owned().collect(),
            headers: Vec::new(),
            body: Bytes::new(),
        })
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    /// First value of header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Every value of header `name`, in arrival order.
    pub fn headers<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// First value of query parameter `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whether the connection may be reused after this request is answered.
    pub fn keep_alive(&self) -> bool {
        let connection = self.header("Connection");
        match self.version {
            Version::HTTP_10 => {
                connection.is_some_and(|value| value.eq_ignore_ascii_case("keep-alive"))
            }
            _ => !connection.is_some_and(|value| value.eq_ignore_ascii_case("close")),
        }
    }
}

/// Splits an inbound byte stream into `Request`s.
///
/// The head is parsed by `httparse`; framing is decided here from `Content-Length` only.
#[derive(Debug, Clone)]
pub struct RequestCodec {
    max_head_bytes: usize,
    max_body_bytes: usize,
}

impl Default for RequestCodec {
    fn default() -> Self {
        Self {
            max_head_bytes: DEFAULT_MAX_HEAD_BYTES,
            max_body_bytes: MAX_VALUE_BYTES,
        }
    }
}

impl Decoder for RequestCodec {
    type Item = Request;
    type Error = RequestError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Request>, RequestError> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut parsed = httparse::Request::new(&mut headers);
        let head_len = match parsed.parse(&src[..])? {
            httparse::Status::Complete(head_len) => head_len,
            httparse::Status::Partial => {
                if src.len() > self.max_head_bytes {
                    return Err(RequestError::HeadTooLarge(self.max_head_bytes));
                }
                return Ok(None);
            }
        };
        if head_len > self.max_head_bytes {
            return Err(RequestError::HeadTooLarge(self.max_head_bytes));
        }

        let mut request = to_request(&parsed)?;
        if request
            .header("Transfer-Encoding")
            .is_some_and(|value| !value.eq_ignore_ascii_case("identity"))
        {
            return Err(RequestError::Malformed("chunked request bodies are not supported"));
        }
        let content_length = content_length(&request)?;
        if content_length > self.max_body_bytes {
            return Err(RequestError::BodyTooLarge(content_length));
        }

        let total = head_len + content_length;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(total);
        request.body = frame.split_off(head_len).freeze();
        Ok(Some(request))
    }
}

fn to_request(parsed: &httparse::Request<'_, '_>) -> Result<Request, RequestError> {
    let method = parsed
        .method
        .ok_or(RequestError::Malformed("missing method"))?;
    let method = Method::from_bytes(method.as_bytes())
        .map_err(|_| RequestError::Malformed("invalid method"))?;
    let version = match parsed.version {
        Some(0) => Version::HTTP_10,
        Some(1) => Version::HTTP_11,
        _ => return Err(RequestError::Malformed("unsupported protocol version")),
    };
    let target = parsed
        .path
        .filter(|target| target.starts_with('/'))
        .ok_or(RequestError::Malformed("request target must be a path"))?;

    let mut request = Request::new(method, target, version)?;
    for header in parsed.headers.iter() {
        let value = std::str::from_utf8(header.value)
            .map_err(|_| RequestError::Malformed("header value is not UTF-8"))?;
        request = request.with_header(header.name, value.trim());
    }
    Ok(request)
}

/// Body length from every `Content-Length` header. Each must be plain digits and all must
/// agree; anything else would let a body be read as the next pipelined request.
fn content_length(request: &Request) -> Result<usize, RequestError> {
    let mut length = None;
    for value in request.headers("Content-Length") {
        if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(RequestError::Malformed("invalid Content-Length"));
        }
        let value = value
            .parse::<usize>()
            .map_err(|_| RequestError::Malformed("invalid Content-Length"))?;
        match length {
            Some(previous) if previous != value => {
                return Err(RequestError::Malformed("conflicting Content-Length headers"));
            }
            _ => length = Some(value),
        }
    }
    Ok(length.unwrap_or(0))
}
