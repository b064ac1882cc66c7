use super::local;
use super::protocol::{
    ENDPOINT_INTERNAL_ENTITY, ENDPOINT_INTERNAL_STATUS, MAX_VALUE_BYTES, NodeStatusResponse,
    TIMESTAMP_HEADER, parse_timestamp,
};
use super::types::{NO_TIMESTAMP, Operation, ReplicaRequest, ReplicaResponse};
use crate::cluster::Topology;
use crate::storage::Dao;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Extension, Query},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct EntityQuery {
    pub id: Option<String>,
}

/// Internal replica API: applies operations to this node's storage only, never fans out.
pub fn router(dao: Arc<dyn Dao>, topology: Arc<Topology>) -> Router {
    Router::new()
        .route(
            ENDPOINT_INTERNAL_ENTITY,
            get(handle_internal_get)
                .put(handle_internal_put)
                .delete(handle_internal_delete),
        )
        .route(ENDPOINT_INTERNAL_STATUS, get(handle_status))
        .layer(DefaultBodyLimit::max(MAX_VALUE_BYTES))
        .layer(Extension(dao))
        .layer(Extension(topology))
}

pub async fn handle_internal_get(
    Extension(dao): Extension<Arc<dyn Dao>>,
    Query(query): Query<EntityQuery>,
) -> Response {
    handle_internal(dao, Operation::Get, query, None, Bytes::new())
}

pub async fn handle_internal_put(
    Extension(dao): Extension<Arc<dyn Dao>>,
    Query(query): Query<EntityQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_internal(dao, Operation::Put, query, Some(headers), body)
}

pub async fn handle_internal_delete(
    Extension(dao): Extension<Arc<dyn Dao>>,
    Query(query): Query<EntityQuery>,
    headers: HeaderMap,
) -> Response {
    handle_internal(dao, Operation::Delete, query, Some(headers), Bytes::new())
}

pub async fn handle_status(
    Extension(dao): Extension<Arc<dyn Dao>>,
    Extension(topology): Extension<Arc<Topology>>,
) -> (StatusCode, Json<Option<NodeStatusResponse>>) {
    match dao.len() {
        Ok(entries) => (
            StatusCode::OK,
            Json(Some(NodeStatusResponse {
                url: topology.local_node().url.clone(),
                cluster: topology.nodes().iter().map(|node| node.url.clone()).collect(),
                entries,
            })),
        ),
        Err(e) => {
            tracing::error!("Failed to read storage size: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(None))
        }
    }
}

fn handle_internal(
    dao: Arc<dyn Dao>,
    operation: Operation,
    query: EntityQuery,
    headers: Option<HeaderMap>,
    body: Bytes,
) -> Response {
    let Some(id) = query.id.filter(|id| !id.trim().is_empty()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let timestamp = match headers {
        Some(headers) => {
            let header = headers
                .get(TIMESTAMP_HEADER)
                .and_then(|value| value.to_str().ok());
            match parse_timestamp(header) {
                Ok(timestamp) if timestamp != NO_TIMESTAMP => timestamp,
                _ => {
                    tracing::warn!("Replicated {:?} without a valid timestamp", operation);
                    return StatusCode::BAD_REQUEST.into_response();
                }
            }
        }
        None => NO_TIMESTAMP,
    };

    let request = ReplicaRequest {
        operation,
        key: Bytes::from(id.into_bytes()),
        body,
        timestamp,
    };
    tracing::debug!("Internal {:?} for {} bytes key", operation, request.key.len());

    into_http(local::apply(dao.as_ref(), &request))
}

fn into_http(replica: ReplicaResponse) -> Response {
    let mut response = (replica.status, replica.body).into_response();
    if replica.timestamp != NO_TIMESTAMP {
        response.headers_mut().insert(
            TIMESTAMP_HEADER,
            HeaderValue::from(replica.timestamp),
        );
    }
    response
}
