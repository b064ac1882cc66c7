//! Client HTTP Module
//!
//! The client-facing HTTP/1.1 surface of a node.
//!
//! ## Core Concepts
//! - **Pipelining**: a client may send several requests before reading any response; the
//!   responses still go out strictly in request order.
//! - **Streamed responses**: range reads and scans are written as chunked bodies pulled from
//!   a `ChunkSource` only while the socket keeps up (backpressure), never buffered whole.
//! - **Composition over transport internals**: the `StreamingSession` is a plain state
//!   machine over a `Transport`; the connection driver in `server` owns the socket.
//!
//! ## Submodules
//! - **`request`** / **`response`**: wire format.
//! - **`chunk`**: chunk sources and byte-range resolution.
//! - **`session`**: the per-connection ordering and streaming state machine.
//! - **`server`**: accept loop and per-connection driver.
//! - **`router`**: maps requests onto the coordinator and local scans.

pub mod chunk;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod session;

pub use chunk::{ChunkSource, ScanChunkSource, SliceChunkSource};
pub use request::{Request, RequestCodec};
pub use response::Response;
pub use router::EntityRouter;
pub use server::{ConnectionSettings, Reply, RequestHandler};
pub use session::{OutputBuffer, SessionError, SessionState, StreamingSession, Transport};
