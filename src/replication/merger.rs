//! Quorum Merge
//!
//! Reduces the answers of every contacted replica to the single response the client sees.
//! Pure and side-effect free: safe to call from any thread once all slots are resolved.
//!
//! ## Rules
//! - **Reads** succeed when at least `ack` replicas answered conclusively (200 or 404). The
//!   answer with the highest `X-Entity-Timestamp` wins; an answer without a timestamp
//!   (`NO_TIMESTAMP`) never beats a timestamped one.
//! - **Writes** succeed when at least `ack` replicas answered 2xx. Bodies are ignored.
//! - Anything short of `ack` is "504 Not Enough Replicas", whatever the cause.

use super::types::{NO_TIMESTAMP, Operation, ReplicaResponse};
use crate::http::response::Response;

use axum::http::StatusCode;

/// Merges one slot per contacted replica (`None` = no answer) under the `ack` requirement.
///
/// Slot order does not matter except as the tie-break between equally recent answers.
pub fn merge(operation: Operation, responses: &[Option<ReplicaResponse>], ack: usize) -> Response {
    debug_assert!(
        ack >= 1 && ack <= responses.len(),
        "ack {} outside 1..={}",
        ack,
        responses.len()
    );

    match operation {
        Operation::Get => merge_reads(responses, ack),
        Operation::Put => merge_writes(responses, ack, StatusCode::CREATED),
        Operation::Delete => merge_writes(responses, ack, StatusCode::ACCEPTED),
    }
}

fn merge_reads(responses: &[Option<ReplicaResponse>], ack: usize) -> Response {
    let successful = responses
        .iter()
        .flatten()
        .filter(|response| response.is_read_success())
        .count();
    if successful < ack {
        return Response::not_enough_replicas();
    }

    match latest(responses) {
        Some(selected) => to_client_response(selected),
        None => Response::not_enough_replicas(),
    }
}

/// The answer with the strictly greatest timestamp, first wins on ties. Falls back to the
/// first conclusive answer when nobody reported a timestamp.
fn latest(responses: &[Option<ReplicaResponse>]) -> Option<&ReplicaResponse> {
    let mut max_timestamp = NO_TIMESTAMP;
    let mut selected = None;
    for response in responses.iter().flatten() {
        if response.timestamp > max_timestamp {
            max_timestamp = response.timestamp;
            selected = Some(response);
        }
    }

    selected.or_else(|| {
        responses
            .iter()
            .flatten()
            .find(|response| response.is_read_success())
    })
}

fn to_client_response(selected: &ReplicaResponse) -> Response {
    match selected.status.as_u16() {
        200 => Response::ok(selected.body.clone()),
        // not found, bad request, entity too large, too many requests, gateway timeout
        404 | 400 | 413 | 429 | 504 => Response::new(selected.status),
        _ => Response::new(StatusCode::SERVICE_UNAVAILABLE),
    }
}

fn merge_writes(responses: &[Option<ReplicaResponse>], ack: usize, success: StatusCode) -> Response {
    let successful = responses
        .iter()
        .flatten()
        .filter(|response| response.is_write_success())
        .count();
    if successful < ack {
        return Response::not_enough_replicas();
    }
    Response::new(success)
}
