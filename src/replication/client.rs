use super::local;
use super::protocol::{ENDPOINT_INTERNAL_ENTITY, TIMESTAMP_HEADER, parse_timestamp};
use super::types::{Operation, ReplicaRequest, ReplicaResponse};
use crate::cluster::{ClusterNode, Topology};
use crate::storage::Dao;

use anyhow::{Result, anyhow};
use std::future::Future;
use std::sync::Arc;

/// One call to one replica.
///
/// An `Err` means "no usable answer" (transport failure, malformed reply); the coordinator
/// records it as an absent slot.
pub trait ReplicaClient: Send + Sync + 'static {
    fn call(
        &self,
        node: &ClusterNode,
        request: &ReplicaRequest,
    ) -> impl Future<Output = Result<ReplicaResponse>> + Send;
}

/// Serves calls addressed to this node from local storage and everything else over HTTP
/// through the peer's internal replica API.
pub struct ClusterClient {
    topology: Arc<Topology>,
    dao: Arc<dyn Dao>,
    http_client: reqwest::Client,
}

impl ClusterClient {
    pub fn new(topology: Arc<Topology>, dao: Arc<dyn Dao>) -> Self {
        Self {
            topology,
            dao,
            http_client: reqwest::Client::new(),
        }
    }

    async fn call_remote(
        &self,
        node: &ClusterNode,
        request: &ReplicaRequest,
    ) -> Result<ReplicaResponse> {
        let url = format!("{}{}", node.internal_url, ENDPOINT_INTERNAL_ENTITY);
        // Client keys arrive as UTF-8 query values, so this is lossless in practice.
        let id = String::from_utf8_lossy(&request.key).into_owned();

        let mut builder = self
            .http_client
            .request(request.operation.method(), url)
            .query(&[("id", id)]);
        if request.operation.is_write() {
            builder = builder.header(TIMESTAMP_HEADER, request.timestamp.to_string());
        }
        if request.operation == Operation::Put {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let timestamp = {
            let header = response
                .headers()
                .get(TIMESTAMP_HEADER)
                .map(|value| value.to_str())
                .transpose()
                .map_err(|e| anyhow!("Malformed timestamp header from {}: {}", node.url, e))?;
            parse_timestamp(header)
                .map_err(|e| anyhow!("Malformed timestamp header from {}: {}", node.url, e))?
        };
        let body = response.bytes().await?;

        Ok(ReplicaResponse::new(status)
            .with_body(body)
            .with_timestamp(timestamp))
    }
}

impl ReplicaClient for ClusterClient {
    async fn call(&self, node: &ClusterNode, request: &ReplicaRequest) -> Result<ReplicaResponse> {
        if self.topology.is_local(node) {
            return Ok(local::apply(self.dao.as_ref(), request));
        }
        self.call_remote(node, request).await
    }
}
