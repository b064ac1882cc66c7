//! Replicated Key-Value Node Library
//!
//! This library crate defines the modules that make up one node of a replicated key-value
//! store. It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! - **`config`**: Command line configuration: listen address, fixed cluster list, limits.
//! - **`cluster`**: The static replica set and deterministic replica selection per key.
//! - **`storage`**: The node-local ordered storage engine (values, tombstones, timestamps).
//! - **`replication`**: Fan-out of client operations to replicas and the quorum merge of
//!   their answers, plus the internal API peers call.
//! - **`http`**: The client-facing HTTP/1.1 server: pipelined requests, in-order responses
//!   and backpressure-aware streamed bodies.

pub mod cluster;
pub mod config;
pub mod http;
pub mod replication;
pub mod storage;
