//! Streaming Session
//!
//! Per-connection state machine that keeps responses in request order while requests are
//! pipelined and while a streamed response drains under backpressure.
//!
//! The session never touches a socket. It writes into a `Transport`, which only has to say
//! whether it can take more bytes right now, and it tells its driver which request to hand
//! to the handler next. That keeps every transition testable in memory.
//!
//! ## States
//! - `Idle`: nothing in flight.
//! - `Dispatching`: one request handed to the handler, its response not yet sent.
//! - `RespondingPlain`: a whole response being written (transient).
//! - `RespondingStreamed`: a `ChunkSource` attached and draining.
//! - `Closing`: terminal; the connection closes once buffered output is flushed.
//!
//! ## Ordering
//! At most one request is being handled at a time. Requests that arrive meanwhile wait in
//! a FIFO, and the next one is dispatched only after the current response, streamed or not,
//! has been written completely.

use super::chunk::ChunkSource;
use super::request::Request;
use super::response::{LAST_CHUNK, Response, encode_chunk};

use axum::http::StatusCode;
use bytes::Bytes;
use std::collections::VecDeque;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("out of order response")]
    OutOfOrderResponse,

    #[error("a streamed response is already in progress")]
    StreamAlreadyActive,

    #[error("connection is closing")]
    Closed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Output side of a connection as the session sees it.
pub trait Transport {
    /// True while the transport cannot accept more bytes without blocking.
    fn is_backpressured(&self) -> bool;

    /// Queues `bytes` for writing. A write is atomic from the session's point of view.
    fn write(&mut self, bytes: Bytes) -> Result<(), SessionError>;

    /// Closes the connection once everything written so far has been flushed.
    fn schedule_close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Dispatching,
    RespondingPlain,
    RespondingStreamed,
    Closing,
}

/// A pipelined entry: a parsed request, the marker that the peer stopped sending, or the
/// marker that it sent something unparsable.
#[derive(Debug)]
enum Pipelined {
    Request(Request),
    Fin,
    Reject,
}

/// What the session needs to remember about the request it is answering.
#[derive(Debug, Clone, Copy)]
struct Handling {
    keep_alive: bool,
    include_body: bool,
}

impl Handling {
    fn of(request: &Request) -> Self {
        Self {
            keep_alive: request.keep_alive(),
            include_body: request.method != axum::http::Method::HEAD,
        }
    }
}

pub struct StreamingSession {
    state: SessionState,
    handling: Option<Handling>,
    pipeline: VecDeque<Pipelined>,
    active: Option<Box<dyn ChunkSource>>,
    chunk_size: usize,
    requests_processed: u64,
}

impl StreamingSession {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            state: SessionState::Idle,
            handling: None,
            pipeline: VecDeque::new(),
            active: None,
            chunk_size: chunk_size.max(1),
            requests_processed: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Requests parsed but not yet dispatched.
    pub fn queued(&self) -> usize {
        self.pipeline.len()
    }

    pub fn requests_processed(&self) -> u64 {
        self.requests_processed
    }

    /// Accepts a freshly parsed request. Returns it back if it should be dispatched now;
    /// otherwise it is queued behind the request currently being answered.
    pub fn on_request(&mut self, request: Request) -> Option<Request> {
        match self.state {
            SessionState::Closing => {
                tracing::debug!("Dropping request received after close");
                None
            }
            SessionState::Idle => {
                self.handling = Some(Handling::of(&request));
                self.state = SessionState::Dispatching;
                Some(request)
            }
            _ => {
                self.pipeline.push_back(Pipelined::Request(request));
                None
            }
        }
    }

    /// The peer will send nothing more. Closes now if idle, otherwise after every queued
    /// request has been answered.
    pub fn on_eof(&mut self, out: &mut impl Transport) {
        match self.state {
            SessionState::Idle => self.close(out),
            SessionState::Closing => {}
            _ => self.pipeline.push_back(Pipelined::Fin),
        }
    }

    /// The peer sent bytes that are not a request. Answers 400 and closes, after every
    /// request queued before them has been answered.
    pub fn on_malformed(&mut self, out: &mut impl Transport) {
        match self.state {
            SessionState::Idle => self.reject(out),
            SessionState::Closing => {}
            _ => self.pipeline.push_back(Pipelined::Reject),
        }
    }

    /// Writes a complete response for the request being handled and returns the next
    /// request to dispatch, if any.
    pub fn send_response(
        &mut self,
        response: Response,
        out: &mut impl Transport,
    ) -> Result<Option<Request>, SessionError> {
        if self.active.is_some() {
            return Err(SessionError::OutOfOrderResponse);
        }
        let Some(handling) = self.handling.take() else {
            return Err(SessionError::OutOfOrderResponse);
        };
        self.requests_processed += 1;

        self.state = SessionState::RespondingPlain;
        out.write(response.encode(handling.keep_alive, handling.include_body))?;

        if !handling.keep_alive {
            self.close(out);
            return Ok(None);
        }
        Ok(self.advance(out))
    }

    /// Starts a chunked response for the request being handled. `head` supplies the status
    /// line and headers; its body is ignored. Drains as much of `source` as the transport
    /// accepts right away; the rest goes out from `on_writable`.
    ///
    /// Returns the next request to dispatch, which is only ever `Some` when `source` was
    /// fully drained here.
    pub fn send_streamed(
        &mut self,
        head: Response,
        source: Box<dyn ChunkSource>,
        out: &mut impl Transport,
    ) -> Result<Option<Request>, SessionError> {
        if self.active.is_some() {
            return Err(SessionError::StreamAlreadyActive);
        }
        let Some(handling) = self.handling else {
            return Err(SessionError::OutOfOrderResponse);
        };
        self.requests_processed += 1;

        out.write(head.encode_chunked_head(handling.keep_alive))?;
        self.active = Some(source);
        self.state = SessionState::RespondingStreamed;
        self.drain(out)
    }

    /// The transport can accept bytes again. Resumes an attached stream, if any.
    pub fn on_writable(&mut self, out: &mut impl Transport) -> Result<Option<Request>, SessionError> {
        if self.active.is_none() {
            return Ok(None);
        }
        self.drain(out)
    }

    fn drain(&mut self, out: &mut impl Transport) -> Result<Option<Request>, SessionError> {
        let chunk_size = self.chunk_size;
        let Some(source) = self.active.as_mut() else {
            return Ok(None);
        };

        while !out.is_backpressured() && source.remaining() > 0 {
            let chunk = source.next_chunk(chunk_size);
            out.write(encode_chunk(&chunk))?;
        }
        if source.remaining() > 0 {
            return Ok(None);
        }

        out.write(Bytes::from_static(LAST_CHUNK))?;
        self.active = None;
        let keep_alive = self.handling.take().is_some_and(|handling| handling.keep_alive);
        if !keep_alive {
            self.close(out);
            return Ok(None);
        }
        Ok(self.advance(out))
    }

    fn advance(&mut self, out: &mut impl Transport) -> Option<Request> {
        match self.pipeline.pop_front() {
            None => {
                self.state = SessionState::Idle;
                None
            }
            Some(Pipelined::Fin) => {
                self.close(out);
                None
            }
            Some(Pipelined::Reject) => {
                self.reject(out);
                None
            }
            Some(Pipelined::Request(request)) => {
                self.handling = Some(Handling::of(&request));
                self.state = SessionState::Dispatching;
                Some(request)
            }
        }
    }

    fn reject(&mut self, out: &mut impl Transport) {
        let response = Response::new(StatusCode::BAD_REQUEST).encode(false, true);
        if let Err(e) = out.write(response) {
            tracing::debug!("Could not answer malformed request: {}", e);
        }
        self.close(out);
    }

    fn close(&mut self, out: &mut impl Transport) {
        if !self.pipeline.is_empty() {
            tracing::debug!("Discarding {} pipelined entries on close", self.pipeline.len());
            self.pipeline.clear();
        }
        self.state = SessionState::Closing;
        out.schedule_close();
    }
}

/// In-memory `Transport` the connection driver flushes to the socket.
///
/// Counts as backpressured once more than `high_watermark` bytes are waiting.
#[derive(Debug)]
pub struct OutputBuffer {
    queue: VecDeque<Bytes>,
    buffered: usize,
    high_watermark: usize,
    close_scheduled: bool,
}

impl OutputBuffer {
    pub fn new(high_watermark: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            buffered: 0,
            high_watermark,
            close_scheduled: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffered == 0
    }

    pub fn buffered(&self) -> usize {
        self.buffered
    }

    /// Next bytes to hand to the socket.
    pub fn front(&self) -> Option<Bytes> {
        self.queue.front().cloned()
    }

    /// Drops the first `n` buffered bytes after the socket accepted them.
    pub fn consume(&mut self, mut n: usize) {
        while n > 0 {
            let Some(front) = self.queue.front_mut() else {
                break;
            };
            if n < front.len() {
                let _ = front.split_to(n);
                self.buffered -= n;
                break;
            }
            n -= front.len();
            self.buffered -= front.len();
            self.queue.pop_front();
        }
    }

    /// Close was scheduled and every byte has been flushed.
    pub fn is_finished(&self) -> bool {
        self.close_scheduled && self.is_empty()
    }
}

impl Transport for OutputBuffer {
    fn is_backpressured(&self) -> bool {
        self.buffered > self.high_watermark
    }

    fn write(&mut self, bytes: Bytes) -> Result<(), SessionError> {
        if self.close_scheduled {
            return Err(SessionError::Closed);
        }
        if !bytes.is_empty() {
            self.buffered += bytes.len();
            self.queue.push_back(bytes);
        }
        Ok(())
    }

    fn schedule_close(&mut self) {
        self.close_scheduled = true;
    }
}
