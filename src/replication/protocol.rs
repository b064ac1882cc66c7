//! Replica Protocol
//!
//! Endpoint paths and header names shared by the client-facing server, the coordinator's
//! replica calls and the internal replica API.

use super::types::NO_TIMESTAMP;

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Public point operations on a single key.
pub const ENDPOINT_ENTITY: &str = "/v0/entity";
/// Public streamed range scan over this node's local data.
pub const ENDPOINT_ENTITIES: &str = "/v0/entities";
/// Internal point operations, applied to the receiving node's storage only.
pub const ENDPOINT_INTERNAL_ENTITY: &str = "/internal/v0/entity";
/// Internal node summary.
pub const ENDPOINT_INTERNAL_STATUS: &str = "/internal/v0/status";

// --- Limits ---

/// Largest value a client may write. The client codec and the internal replica API both
/// enforce it, so a write one accepts is never refused by the other.
pub const MAX_VALUE_BYTES: usize = 16 * 1024 * 1024;

// --- Headers ---

/// Write time of the entry a replica answered with, or of the write being replicated.
pub const TIMESTAMP_HEADER: &str = "X-Entity-Timestamp";

/// Parses a timestamp header value. A missing header means `NO_TIMESTAMP`; a present but
/// unparsable one is an error.
pub fn parse_timestamp(value: Option<&str>) -> Result<i64, std::num::ParseIntError> {
    match value {
        Some(value) => value.trim().parse(),
        None => Ok(NO_TIMESTAMP),
    }
}

// --- Data Transfer Objects ---

/// Summary returned by the internal status endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct NodeStatusResponse {
    pub url: String,
    pub cluster: Vec<String>,
    /// Stored entries, tombstones included.
    pub entries: usize,
}
