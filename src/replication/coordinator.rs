//! Replica Fan-out
//!
//! Sends one operation to every selected replica at once and waits at most the configured
//! timeout for each. Whatever has not answered by then is an absent slot; the merge decides
//! what that means for the client.

use super::client::ReplicaClient;
use super::merger;
use super::types::{NO_TIMESTAMP, Operation, ReplicaRequest, ReplicaResponse, ReplicationParams, now_ms};
use crate::cluster::{ClusterNode, Topology};
use crate::http::response::Response;

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

pub struct Coordinator<C> {
    topology: Arc<Topology>,
    client: C,
    timeout: Duration,
}

impl<C: ReplicaClient> Coordinator<C> {
    pub fn new(topology: Arc<Topology>, client: C, timeout: Duration) -> Self {
        Self {
            topology,
            client,
            timeout,
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Runs `operation` on the `params.from` replicas of `key` and merges their answers.
    ///
    /// `params` must already be validated against the cluster size.
    pub async fn execute(
        &self,
        operation: Operation,
        key: Bytes,
        body: Bytes,
        params: ReplicationParams,
    ) -> Response {
        let replicas = self.topology.replicas_for(&key, params.from);
        let request = ReplicaRequest {
            operation,
            key,
            body,
            timestamp: if operation.is_write() {
                now_ms()
            } else {
                NO_TIMESTAMP
            },
        };

        let responses = self.fan_out(&replicas, &request).await;
        let response = merger::merge(operation, &responses, params.ack);

        tracing::debug!(
            "{:?} ack={} from={} answered={} -> {}",
            operation,
            params.ack,
            params.from,
            responses.iter().flatten().count(),
            response.status
        );
        response
    }

    async fn fan_out(
        &self,
        replicas: &[&ClusterNode],
        request: &ReplicaRequest,
    ) -> Vec<Option<ReplicaResponse>> {
        let calls = replicas.iter().map(|node| async move {
            match tokio::time::timeout(self.timeout, self.client.call(node, request)).await {
                Ok(Ok(response)) => Some(response),
                Ok(Err(e)) => {
                    tracing::warn!("Replica call to {} failed: {}", node.url, e);
                    None
                }
                Err(_) => {
                    tracing::warn!(
                        "Replica call to {} timed out after {:?}",
                        node.url,
                        self.timeout
                    );
                    None
                }
            }
        });

        futures::future::join_all(calls).await
    }
}
