//! Connection Driver
//!
//! Accepts client connections and runs one task per connection that moves bytes between the
//! socket and its `StreamingSession`:
//! - parsed requests go into the session, which says when to dispatch them;
//! - a finished handler's reply goes back into the session, which writes it in order;
//! - every time the socket takes bytes, the session gets a chance to pull more chunks.
//!
//! Bytes that do not parse as a request end the read side: the client gets a 400 after the
//! responses it is already owed, then the connection closes.
//!
//! Reading pauses while too many requests are queued, so a client pipelining faster than it
//! reads cannot grow the queue without bound.

use super::chunk::ChunkSource;
use super::request::{Request, RequestCodec, RequestError};
use super::response::Response;
use super::session::{OutputBuffer, SessionState, StreamingSession};

use anyhow::Result;
use axum::http::StatusCode;
use futures::FutureExt;
use futures::StreamExt;
use futures::future::OptionFuture;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::codec::FramedRead;

/// A handler's answer to one request.
pub enum Reply {
    Plain(Response),
    /// `head` carries status and headers; the body comes from `source` in chunks.
    Streamed {
        head: Response,
        source: Box<dyn ChunkSource>,
    },
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain(response) => f.debug_tuple("Plain").field(response).finish(),
            Self::Streamed { head, source } => f
                .debug_struct("Streamed")
                .field("head", head)
                .field("remaining", &source.remaining())
                .finish(),
        }
    }
}

pub trait RequestHandler: Send + Sync + 'static {
    fn handle(&self, request: Request) -> impl Future<Output = Reply> + Send;
}

/// Per-connection limits.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub chunk_size: usize,
    pub write_high_watermark: usize,
    pub max_pipeline_depth: usize,
}

type InFlight<'a> = Pin<Box<dyn Future<Output = Reply> + Send + 'a>>;

pub async fn run<H: RequestHandler>(
    listener: TcpListener,
    handler: Arc<H>,
    settings: ConnectionSettings,
) -> Result<()> {
    tracing::info!("Client server listening on {}", listener.local_addr()?);

    loop {
        let (socket, peer) = listener.accept().await?;
        let handler = handler.clone();
        tokio::spawn(async move {
            tracing::debug!("Accepted connection from {}", peer);
            match serve_connection(socket, handler.as_ref(), settings).await {
                Ok(processed) => {
                    tracing::debug!("Connection from {} closed after {} requests", peer, processed)
                }
                Err(e) => tracing::debug!("Connection from {} failed: {}", peer, e),
            }
        });
    }
}

/// Serves one connection until either side closes it. Returns the number of requests
/// answered.
pub async fn serve_connection<S, H>(
    socket: S,
    handler: &H,
    settings: ConnectionSettings,
) -> Result<u64>
where
    S: AsyncRead + AsyncWrite + Unpin,
    H: RequestHandler,
{
    let (reader, mut writer) = tokio::io::split(socket);
    let mut requests = FramedRead::new(reader, RequestCodec::default());
    let mut session = StreamingSession::new(settings.chunk_size);
    let mut out = OutputBuffer::new(settings.write_high_watermark);
    let mut in_flight: Option<InFlight<'_>> = None;
    let mut read_closed = false;

    loop {
        if out.is_finished() {
            break;
        }

        let pending_write = out.front();
        let can_read = !read_closed
            && session.state() != SessionState::Closing
            && session.queued() < settings.max_pipeline_depth;

        tokio::select! {
            Some(reply) = OptionFuture::from(in_flight.as_mut()), if in_flight.is_some() => {
                in_flight = None;
                let next = match reply {
                    Reply::Plain(response) => session.send_response(response, &mut out)?,
                    Reply::Streamed { head, source } => session.send_streamed(head, source, &mut out)?,
                };
                if let Some(request) = next {
                    in_flight = Some(dispatch(handler, request));
                }
            }

            written = write_front(&mut writer, pending_write.as_ref()), if pending_write.is_some() => {
                out.consume(written?);
                if let Some(request) = session.on_writable(&mut out)? {
                    in_flight = Some(dispatch(handler, request));
                }
            }

            frame = requests.next(), if can_read => match frame {
                Some(Ok(request)) => {
                    if let Some(request) = session.on_request(request) {
                        in_flight = Some(dispatch(handler, request));
                    }
                }
                Some(Err(RequestError::Io(e))) => {
                    tracing::debug!("Stopped reading: {}", e);
                    read_closed = true;
                    session.on_eof(&mut out);
                }
                Some(Err(e)) => {
                    tracing::debug!("Rejecting malformed request: {}", e);
                    read_closed = true;
                    session.on_malformed(&mut out);
                }
                None => {
                    read_closed = true;
                    session.on_eof(&mut out);
                }
            },

            else => break,
        }
    }

    writer.flush().await?;
    let _ = writer.shutdown().await;
    Ok(session.requests_processed())
}

async fn write_front<W: AsyncWrite + Unpin>(
    writer: &mut W,
    pending: Option<&bytes::Bytes>,
) -> std::io::Result<usize> {
    let Some(pending) = pending else {
        return Ok(0);
    };
    let written = writer.write(pending).await?;
    if written == 0 {
        return Err(std::io::ErrorKind::WriteZero.into());
    }
    Ok(written)
}

/// Runs the handler with panics mapped to 500, so a failing request never takes the
/// connection's ordering down with it.
fn dispatch<'a, H: RequestHandler>(handler: &'a H, request: Request) -> InFlight<'a> {
    Box::pin(
        AssertUnwindSafe(handler.handle(request))
            .catch_unwind()
            .map(|result| {
                result.unwrap_or_else(|_| {
                    tracing::error!("Request handler panicked");
                    Reply::Plain(Response::new(StatusCode::INTERNAL_SERVER_ERROR))
                })
            }),
    )
}
