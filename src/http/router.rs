//! Client-facing request routing.
//!
//! `/v0/entity` goes through the coordinator (replicated, quorum-merged); `/v0/entities`
//! streams a scan of this node's local data. Input is validated before any replica is
//! contacted.

use super::chunk::{RangeError, ScanChunkSource, SliceChunkSource, parse_byte_range};
use super::request::Request;
use super::response::Response;
use super::server::{Reply, RequestHandler};
use crate::replication::protocol::{ENDPOINT_ENTITIES, ENDPOINT_ENTITY};
use crate::replication::{Coordinator, Operation, ReplicaClient, ReplicationParams};
use crate::storage::Dao;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use bytes::Bytes;
use std::sync::Arc;

pub struct EntityRouter<C> {
    coordinator: Coordinator<C>,
    dao: Arc<dyn Dao>,
}

impl<C: ReplicaClient> EntityRouter<C> {
    pub fn new(coordinator: Coordinator<C>, dao: Arc<dyn Dao>) -> Self {
        Self { coordinator, dao }
    }

    async fn route(&self, request: Request) -> Result<Reply> {
        match request.path.as_str() {
            ENDPOINT_ENTITY => Ok(self.entity(request).await),
            ENDPOINT_ENTITIES if request.method == Method::GET => self.entities(&request),
            ENDPOINT_ENTITIES => Ok(plain(StatusCode::METHOD_NOT_ALLOWED)),
            _ => Ok(unknown_path(&request.method)),
        }
    }

    async fn entity(&self, request: Request) -> Reply {
        let Some(operation) = Operation::from_method(&request.method) else {
            return plain(StatusCode::METHOD_NOT_ALLOWED);
        };
        let Some(id) = request.param("id").filter(|id| !id.trim().is_empty()) else {
            return plain(StatusCode::BAD_REQUEST);
        };
        let params = match ReplicationParams::parse(
            request.param("ack"),
            request.param("from"),
            self.coordinator.topology().size(),
        ) {
            Ok(params) => params,
            Err(e) => {
                tracing::debug!("Rejected replication parameters: {}", e);
                return plain(StatusCode::BAD_REQUEST);
            }
        };

        let key = Bytes::copy_from_slice(id.as_bytes());
        let body = match operation {
            Operation::Put => request.body.clone(),
            _ => Bytes::new(),
        };
        let range = match operation {
            Operation::Get => request.header("Range"),
            _ => None,
        };

        let response = self.coordinator.execute(operation, key, body, params).await;
        match range {
            Some(range) if response.status == StatusCode::OK => partial(response.body, range),
            _ => Reply::Plain(response),
        }
    }

    fn entities(&self, request: &Request) -> Result<Reply> {
        let Some(start) = request.param("start").filter(|start| !start.is_empty()) else {
            return Ok(plain(StatusCode::BAD_REQUEST));
        };
        let end = request.param("end").filter(|end| !end.is_empty());

        let records = self
            .dao
            .range(start.as_bytes(), end.map(|end| end.as_bytes()))?;
        tracing::debug!("Streaming {} entries from local scan", records.len());

        Ok(Reply::Streamed {
            head: Response::new(StatusCode::OK),
            source: Box::new(ScanChunkSource::new(records)),
        })
    }
}

impl<C: ReplicaClient> RequestHandler for EntityRouter<C> {
    async fn handle(&self, request: Request) -> Reply {
        match self.route(request).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Request failed: {}", e);
                plain(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

fn plain(status: StatusCode) -> Reply {
    Reply::Plain(Response::new(status))
}

/// Unrouted GET/PUT/DELETE are treated as bad requests, anything else as a method problem.
fn unknown_path(method: &Method) -> Reply {
    if Operation::from_method(method).is_some() {
        plain(StatusCode::BAD_REQUEST)
    } else {
        plain(StatusCode::METHOD_NOT_ALLOWED)
    }
}

fn partial(value: Bytes, range_header: &str) -> Reply {
    let len = value.len();
    match parse_byte_range(range_header, len) {
        Ok(range) => Reply::Streamed {
            head: Response::new(StatusCode::PARTIAL_CONTENT).with_header(
                "Content-Range",
                format!("bytes {}-{}/{}", range.start, range.end - 1, len),
            ),
            source: Box::new(SliceChunkSource::with_range(value, range)),
        },
        Err(RangeError::Unsatisfiable(len)) => Reply::Plain(
            Response::new(StatusCode::RANGE_NOT_SATISFIABLE)
                .with_header("Content-Range", format!("bytes */{}", len)),
        ),
        Err(RangeError::Malformed) => plain(StatusCode::BAD_REQUEST),
    }
}
