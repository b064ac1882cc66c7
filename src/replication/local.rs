use super::types::{NO_TIMESTAMP, Operation, ReplicaRequest, ReplicaResponse};
use crate::storage::{Dao, Entry};

use axum::http::StatusCode;

/// Applies a replica operation to this node's storage.
///
/// Reads answer 404 for tombstones too, but keep the tombstone's timestamp so a recent
/// delete can shadow an older value held by another replica.
pub fn apply(dao: &dyn Dao, request: &ReplicaRequest) -> ReplicaResponse {
    if request.key.is_empty() {
        return ReplicaResponse::new(StatusCode::BAD_REQUEST);
    }

    let result = match request.operation {
        Operation::Get => dao.get(&request.key).map(|entry| match entry {
            Some(Entry {
                value: Some(value),
                timestamp,
            }) => ReplicaResponse::new(StatusCode::OK)
                .with_body(value)
                .with_timestamp(timestamp),
            Some(Entry {
                value: None,
                timestamp,
            }) => ReplicaResponse::new(StatusCode::NOT_FOUND).with_timestamp(timestamp),
            None => ReplicaResponse::new(StatusCode::NOT_FOUND).with_timestamp(NO_TIMESTAMP),
        }),
        Operation::Put => dao
            .upsert(
                request.key.clone(),
                Entry::value(request.body.clone(), request.timestamp),
            )
            .map(|_| ReplicaResponse::new(StatusCode::CREATED)),
        Operation::Delete => dao
            .upsert(request.key.clone(), Entry::tombstone(request.timestamp))
            .map(|_| ReplicaResponse::new(StatusCode::ACCEPTED)),
    };

    result.unwrap_or_else(|e| {
        tracing::error!("Local {:?} failed: {}", request.operation, e);
        ReplicaResponse::new(StatusCode::INTERNAL_SERVER_ERROR)
    })
}
