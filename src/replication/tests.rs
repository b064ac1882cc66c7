//! Replication Module Tests
//!
//! Validates the quorum merge and the fan-out around it.
//!
//! ## Test Scopes
//! - **Merge**: ack thresholds, last-write-wins selection, status mapping, order independence.
//! - **Parameters**: `ack`/`from` defaults and bounds.
//! - **Local replica**: storage-backed answers, tombstone timestamps.
//! - **Coordinator**: fan-out with failing and slow replicas, via a stub client.
//! - **Internal API**: handler status codes and timestamp headers.
//! - **Remote replicas**: `ClusterClient` against the internal API served on loopback.

#[cfg(test)]
mod tests {
    use crate::cluster::{ClusterNode, Topology};
    use crate::config::INTERNAL_PORT_OFFSET;
    use crate::replication::handlers::{
        self, EntityQuery, handle_internal_delete, handle_internal_get, handle_internal_put,
        handle_status,
    };
    use crate::replication::local;
    use crate::replication::protocol::{ENDPOINT_INTERNAL_ENTITY, MAX_VALUE_BYTES, TIMESTAMP_HEADER};
    use crate::replication::types::ParamsError;
    use crate::replication::{
        ClusterClient, Coordinator, NO_TIMESTAMP, Operation, ReplicaClient, ReplicaRequest,
        ReplicaResponse, ReplicationParams, merge,
    };
    use crate::storage::{Dao, MemoryDao};

    use anyhow::{Result, anyhow};
    use axum::Router;
    use axum::extract::{Extension, Query};
    use axum::http::{HeaderMap, HeaderValue, StatusCode};
    use axum::routing::get;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn ok(body: &'static str, timestamp: i64) -> Option<ReplicaResponse> {
        Some(
            ReplicaResponse::new(StatusCode::OK)
                .with_body(Bytes::from_static(body.as_bytes()))
                .with_timestamp(timestamp),
        )
    }

    fn status(code: StatusCode) -> Option<ReplicaResponse> {
        Some(ReplicaResponse::new(code))
    }

    fn urls(count: u16) -> Vec<String> {
        (0..count)
            .map(|i| format!("http://127.0.0.1:{}", 8080 + i))
            .collect()
    }

    // ============================================================
    // MERGE: QUORUM THRESHOLD
    // ============================================================

    #[test]
    fn test_all_absent_is_not_enough_replicas_for_every_operation() {
        let responses = vec![None, None, None];
        for operation in [Operation::Get, Operation::Put, Operation::Delete] {
            let response = merge(operation, &responses, 1);
            assert!(
                response.is_not_enough_replicas(),
                "{:?} should fail the quorum",
                operation
            );
        }
    }

    #[test]
    fn test_read_errors_do_not_count_toward_ack() {
        let responses = vec![
            status(StatusCode::BAD_REQUEST),
            status(StatusCode::BAD_REQUEST),
            status(StatusCode::BAD_REQUEST),
        ];
        let response = merge(Operation::Get, &responses, 1);
        assert!(response.is_not_enough_replicas());
    }

    #[test]
    fn test_not_found_counts_as_read_success() {
        let responses = vec![
            status(StatusCode::NOT_FOUND),
            None,
            status(StatusCode::NOT_FOUND),
        ];
        let response = merge(Operation::Get, &responses, 2);
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_put_quorum() {
        let created = || status(StatusCode::CREATED);

        let response = merge(Operation::Put, &[created(), None, created()], 2);
        assert_eq!(response.status, StatusCode::CREATED);
        assert!(!response.is_not_enough_replicas());

        let response = merge(Operation::Put, &[created(), None, None], 2);
        assert!(response.is_not_enough_replicas());
    }

    #[test]
    fn test_delete_quorum() {
        let accepted = || status(StatusCode::ACCEPTED);

        let response = merge(Operation::Delete, &[accepted(), accepted(), None], 2);
        assert_eq!(response.status, StatusCode::ACCEPTED);

        let response = merge(
            Operation::Delete,
            &[accepted(), status(StatusCode::INTERNAL_SERVER_ERROR), None],
            2,
        );
        assert!(response.is_not_enough_replicas());
    }

    #[test]
    fn test_not_enough_replicas_differs_from_replica_gateway_timeout() {
        let forwarded = merge(
            Operation::Get,
            &[
                Some(ReplicaResponse::new(StatusCode::GATEWAY_TIMEOUT).with_timestamp(3)),
                status(StatusCode::NOT_FOUND),
            ],
            1,
        );
        assert_eq!(forwarded.status, StatusCode::GATEWAY_TIMEOUT);
        assert!(!forwarded.is_not_enough_replicas());
        assert_eq!(forwarded.reason_phrase(), "Gateway Timeout");

        let quorum = merge(Operation::Get, &[None, None], 1);
        assert_eq!(quorum.status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(quorum.reason_phrase(), "Not Enough Replicas");
    }

    // ============================================================
    // MERGE: LAST-WRITE-WINS
    // ============================================================

    #[test]
    fn test_newest_timestamp_wins() {
        let response = merge(Operation::Get, &[ok("old", 5), ok("new", 7)], 1);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, Bytes::from_static(b"new"));
    }

    #[test]
    fn test_newer_tombstone_shadows_older_value() {
        let tombstone = Some(ReplicaResponse::new(StatusCode::NOT_FOUND).with_timestamp(9));
        let response = merge(Operation::Get, &[ok("value", 4), tombstone], 2);
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_untimed_answer_never_beats_timed_one() {
        let responses = vec![
            ok("untimed", NO_TIMESTAMP),
            ok("timed", 0),
            status(StatusCode::NOT_FOUND),
        ];
        let response = merge(Operation::Get, &responses, 3);
        assert_eq!(response.body, Bytes::from_static(b"timed"));
    }

    #[test]
    fn test_all_untimed_picks_one_of_the_answers() {
        let responses = vec![ok("value", NO_TIMESTAMP), status(StatusCode::NOT_FOUND)];
        let response = merge(Operation::Get, &responses, 2);
        assert!(
            response.status == StatusCode::OK || response.status == StatusCode::NOT_FOUND,
            "unexpected status {}",
            response.status
        );

        let reversed: Vec<_> = responses.into_iter().rev().collect();
        let response = merge(Operation::Get, &reversed, 2);
        assert!(response.status == StatusCode::OK || response.status == StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_untimed_fallback_skips_inconclusive_answers() {
        let responses = vec![
            status(StatusCode::INTERNAL_SERVER_ERROR),
            status(StatusCode::NOT_FOUND),
        ];
        let response = merge(Operation::Get, &responses, 1);
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_read_merge_is_order_independent() {
        let base = vec![
            ok("a", 3),
            None,
            Some(ReplicaResponse::new(StatusCode::NOT_FOUND).with_timestamp(8)),
            ok("c", 11),
            status(StatusCode::NOT_FOUND),
        ];
        let expected = merge(Operation::Get, &base, 2);
        assert_eq!(expected.body, Bytes::from_static(b"c"));

        // Every rotation and its reverse.
        for shift in 0..base.len() {
            let mut rotated = base.clone();
            rotated.rotate_left(shift);
            assert_eq!(merge(Operation::Get, &rotated, 2), expected);

            rotated.reverse();
            assert_eq!(merge(Operation::Get, &rotated, 2), expected);
        }
    }

    // ============================================================
    // MERGE: STATUS MAPPING
    // ============================================================

    #[test]
    fn test_forwarded_statuses() {
        for code in [
            StatusCode::BAD_REQUEST,
            StatusCode::PAYLOAD_TOO_LARGE,
            StatusCode::TOO_MANY_REQUESTS,
        ] {
            let responses = vec![
                Some(ReplicaResponse::new(code).with_timestamp(10)),
                status(StatusCode::NOT_FOUND),
            ];
            assert_eq!(merge(Operation::Get, &responses, 1).status, code);
        }
    }

    #[test]
    fn test_unknown_status_maps_to_service_unavailable() {
        let responses = vec![
            Some(ReplicaResponse::new(StatusCode::INTERNAL_SERVER_ERROR).with_timestamp(10)),
            status(StatusCode::NOT_FOUND),
        ];
        let response = merge(Operation::Get, &responses, 1);
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    // ============================================================
    // REPLICATION PARAMETERS
    // ============================================================

    #[test]
    fn test_default_params_are_majority_of_cluster() {
        assert_eq!(
            ReplicationParams::parse(None, None, 3).unwrap(),
            ReplicationParams { ack: 2, from: 3 }
        );
        assert_eq!(ReplicationParams::default_for(1), ReplicationParams { ack: 1, from: 1 });
        assert_eq!(
            ReplicationParams::parse(None, Some("4"), 5).unwrap(),
            ReplicationParams { ack: 3, from: 4 }
        );
    }

    #[test]
    fn test_params_bounds() {
        assert!(ReplicationParams::parse(Some("1"), Some("1"), 3).is_ok());
        assert!(matches!(
            ReplicationParams::parse(Some("0"), Some("2"), 3),
            Err(ParamsError::OutOfBounds { .. })
        ));
        assert!(matches!(
            ReplicationParams::parse(Some("3"), Some("2"), 3),
            Err(ParamsError::OutOfBounds { .. })
        ));
        assert!(matches!(
            ReplicationParams::parse(Some("2"), Some("4"), 3),
            Err(ParamsError::OutOfBounds { .. })
        ));
        assert!(matches!(
            ReplicationParams::parse(Some("two"), None, 3),
            Err(ParamsError::Malformed { name: "ack", .. })
        ));
    }

    // ============================================================
    // LOCAL REPLICA
    // ============================================================

    fn request(operation: Operation, key: &'static str, body: &'static str, timestamp: i64) -> ReplicaRequest {
        ReplicaRequest {
            operation,
            key: Bytes::from_static(key.as_bytes()),
            body: Bytes::from_static(body.as_bytes()),
            timestamp,
        }
    }

    #[test]
    fn test_local_get_missing_has_no_timestamp() {
        let dao = MemoryDao::new();
        let response = local::apply(&dao, &request(Operation::Get, "k", "", NO_TIMESTAMP));

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.timestamp, NO_TIMESTAMP);
    }

    #[test]
    fn test_local_put_get_delete() {
        let dao = MemoryDao::new();

        let put = local::apply(&dao, &request(Operation::Put, "k", "v", 100));
        assert_eq!(put.status, StatusCode::CREATED);

        let get = local::apply(&dao, &request(Operation::Get, "k", "", NO_TIMESTAMP));
        assert_eq!(get.status, StatusCode::OK);
        assert_eq!(get.body, Bytes::from_static(b"v"));
        assert_eq!(get.timestamp, 100);

        let delete = local::apply(&dao, &request(Operation::Delete, "k", "", 101));
        assert_eq!(delete.status, StatusCode::ACCEPTED);

        let get = local::apply(&dao, &request(Operation::Get, "k", "", NO_TIMESTAMP));
        assert_eq!(get.status, StatusCode::NOT_FOUND);
        assert_eq!(get.timestamp, 101, "tombstone keeps its timestamp");
    }

    #[test]
    fn test_local_rejects_empty_key() {
        let dao = MemoryDao::new();
        let response = local::apply(&dao, &request(Operation::Put, "", "v", 1));
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(dao.len().unwrap(), 0);
    }

    // ============================================================
    // COORDINATOR
    // ============================================================

    #[derive(Clone, Copy)]
    enum Behavior {
        Healthy,
        Failing,
        Slow,
    }

    /// Every node is backed by its own in-memory store; behavior is per node URL.
    struct StubClient {
        stores: HashMap<String, MemoryDao>,
        behavior: HashMap<String, Behavior>,
        contacts: AtomicUsize,
    }

    impl StubClient {
        fn new(urls: &[String]) -> Self {
            Self {
                stores: urls.iter().map(|url| (url.clone(), MemoryDao::new())).collect(),
                behavior: HashMap::new(),
                contacts: AtomicUsize::new(0),
            }
        }

        fn with(mut self, url: &str, behavior: Behavior) -> Self {
            self.behavior.insert(url.to_string(), behavior);
            self
        }
    }

    impl ReplicaClient for StubClient {
        async fn call(&self, node: &ClusterNode, request: &ReplicaRequest) -> Result<ReplicaResponse> {
            self.contacts.fetch_add(1, Ordering::SeqCst);
            match self.behavior.get(&node.url).copied().unwrap_or(Behavior::Healthy) {
                Behavior::Healthy => {}
                Behavior::Failing => return Err(anyhow!("connection refused")),
                Behavior::Slow => tokio::time::sleep(Duration::from_secs(5)).await,
            }
            let dao = self
                .stores
                .get(&node.url)
                .ok_or_else(|| anyhow!("unknown node {}", node.url))?;
            Ok(local::apply(dao, request))
        }
    }

    fn coordinator(client: StubClient, nodes: u16) -> Coordinator<StubClient> {
        let topology = Arc::new(Topology::new("http://127.0.0.1:8080", &urls(nodes)).unwrap());
        Coordinator::new(topology, client, Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_coordinator_write_then_read() {
        let coordinator = coordinator(StubClient::new(&urls(3)), 3);
        let params = ReplicationParams::default_for(3);

        let put = coordinator
            .execute(Operation::Put, Bytes::from_static(b"k"), Bytes::from_static(b"v"), params)
            .await;
        assert_eq!(put.status, StatusCode::CREATED);

        let get = coordinator
            .execute(Operation::Get, Bytes::from_static(b"k"), Bytes::new(), params)
            .await;
        assert_eq!(get.status, StatusCode::OK);
        assert_eq!(get.body, Bytes::from_static(b"v"));
    }

    #[tokio::test]
    async fn test_coordinator_contacts_exactly_from_replicas() {
        let coordinator = coordinator(StubClient::new(&urls(5)), 5);
        let params = ReplicationParams { ack: 1, from: 2 };

        coordinator
            .execute(Operation::Get, Bytes::from_static(b"k"), Bytes::new(), params)
            .await;
        assert_eq!(coordinator.client().contacts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_coordinator_tolerates_failures_within_quorum() {
        let nodes = urls(3);
        let client = StubClient::new(&nodes).with(&nodes[1], Behavior::Failing);
        let coordinator = coordinator(client, 3);

        let put = coordinator
            .execute(
                Operation::Put,
                Bytes::from_static(b"k"),
                Bytes::from_static(b"v"),
                ReplicationParams { ack: 2, from: 3 },
            )
            .await;
        assert_eq!(put.status, StatusCode::CREATED);

        let put = coordinator
            .execute(
                Operation::Put,
                Bytes::from_static(b"k"),
                Bytes::from_static(b"v"),
                ReplicationParams { ack: 3, from: 3 },
            )
            .await;
        assert!(put.is_not_enough_replicas());
    }

    #[tokio::test]
    async fn test_coordinator_bounds_slow_replicas_by_timeout() {
        let nodes = urls(2);
        let client = StubClient::new(&nodes)
            .with(&nodes[0], Behavior::Slow)
            .with(&nodes[1], Behavior::Slow);
        let coordinator = coordinator(client, 2);

        let started = std::time::Instant::now();
        let get = coordinator
            .execute(
                Operation::Get,
                Bytes::from_static(b"k"),
                Bytes::new(),
                ReplicationParams { ack: 1, from: 2 },
            )
            .await;

        assert!(get.is_not_enough_replicas());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_coordinator_read_returns_newest_write() {
        let nodes = urls(3);
        let coordinator = coordinator(StubClient::new(&nodes), 3);
        let all = ReplicationParams { ack: 3, from: 3 };

        coordinator
            .execute(Operation::Put, Bytes::from_static(b"k"), Bytes::from_static(b"v1"), all)
            .await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        // Only one replica sees the second write.
        coordinator
            .execute(
                Operation::Put,
                Bytes::from_static(b"k"),
                Bytes::from_static(b"v2"),
                ReplicationParams { ack: 1, from: 1 },
            )
            .await;

        let get = coordinator
            .execute(Operation::Get, Bytes::from_static(b"k"), Bytes::new(), all)
            .await;
        assert_eq!(get.body, Bytes::from_static(b"v2"));
    }

    // ============================================================
    // INTERNAL API HANDLERS
    // ============================================================

    fn query(id: &str) -> Query<EntityQuery> {
        Query(EntityQuery {
            id: Some(id.to_string()),
        })
    }

    fn timestamp_headers(timestamp: i64) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(TIMESTAMP_HEADER, HeaderValue::from(timestamp));
        headers
    }

    #[tokio::test]
    async fn test_internal_put_requires_timestamp() {
        let dao: Arc<dyn Dao> = Arc::new(MemoryDao::new());

        let response = handle_internal_put(
            Extension(dao.clone()),
            query("k"),
            HeaderMap::new(),
            Bytes::from_static(b"v"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(dao.len().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_internal_roundtrip_carries_timestamp() {
        let dao: Arc<dyn Dao> = Arc::new(MemoryDao::new());

        let put = handle_internal_put(
            Extension(dao.clone()),
            query("k"),
            timestamp_headers(42),
            Bytes::from_static(b"v"),
        )
        .await;
        assert_eq!(put.status(), StatusCode::CREATED);

        let get = handle_internal_get(Extension(dao.clone()), query("k")).await;
        assert_eq!(get.status(), StatusCode::OK);
        assert_eq!(get.headers().get(TIMESTAMP_HEADER).unwrap(), "42");

        let delete = handle_internal_delete(Extension(dao.clone()), query("k"), timestamp_headers(43)).await;
        assert_eq!(delete.status(), StatusCode::ACCEPTED);

        let get = handle_internal_get(Extension(dao.clone()), query("k")).await;
        assert_eq!(get.status(), StatusCode::NOT_FOUND);
        assert_eq!(get.headers().get(TIMESTAMP_HEADER).unwrap(), "43");

        let missing = handle_internal_get(Extension(dao), query("other")).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert!(missing.headers().get(TIMESTAMP_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_internal_blank_id() {
        let dao: Arc<dyn Dao> = Arc::new(MemoryDao::new());
        let response = handle_internal_get(Extension(dao), query("   ")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_status_handler() {
        let dao: Arc<dyn Dao> = Arc::new(MemoryDao::new());
        let topology = Arc::new(Topology::new("http://127.0.0.1:8080", &urls(2)).unwrap());

        let (code, body) = handle_status(Extension(dao), Extension(topology)).await;
        assert_eq!(code, StatusCode::OK);

        let json = serde_json::to_value(&body.0).unwrap();
        assert_eq!(json["url"], "http://127.0.0.1:8080");
        assert_eq!(json["cluster"].as_array().unwrap().len(), 2);
        assert_eq!(json["entries"], 0);
    }

    // ============================================================
    // REMOTE REPLICAS OVER HTTP
    // ============================================================

    /// Never contacted over the network: calls to the local node go straight to storage.
    const LOCAL_URL: &str = "http://127.0.0.1:1";

    /// Binds a loopback listener and returns it with the client URL whose internal API it is.
    async fn bind_peer() -> (tokio::net::TcpListener, String) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, format!("http://127.0.0.1:{}", port - INTERNAL_PORT_OFFSET))
    }

    fn serve(listener: tokio::net::TcpListener, app: Router) {
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    }

    struct RemotePeer {
        topology: Arc<Topology>,
        local_dao: Arc<dyn Dao>,
        peer_dao: Arc<dyn Dao>,
        peer: ClusterNode,
    }

    async fn remote_peer() -> RemotePeer {
        let (listener, peer_url) = bind_peer().await;
        let urls = vec![LOCAL_URL.to_string(), peer_url.clone()];

        let peer_dao: Arc<dyn Dao> = Arc::new(MemoryDao::new());
        let peer_topology = Arc::new(Topology::new(&peer_url, &urls).unwrap());
        serve(listener, handlers::router(peer_dao.clone(), peer_topology));

        let topology = Arc::new(Topology::new(LOCAL_URL, &urls).unwrap());
        let peer = ClusterNode::new(&peer_url).unwrap();
        RemotePeer {
            topology,
            local_dao: Arc::new(MemoryDao::new()),
            peer_dao,
            peer,
        }
    }

    fn replica_request(
        operation: Operation,
        key: &'static str,
        body: Bytes,
        timestamp: i64,
    ) -> ReplicaRequest {
        ReplicaRequest {
            operation,
            key: Bytes::from_static(key.as_bytes()),
            body,
            timestamp,
        }
    }

    #[tokio::test]
    async fn test_cluster_client_roundtrip_over_http() {
        let cluster = remote_peer().await;
        let client = ClusterClient::new(cluster.topology.clone(), cluster.local_dao.clone());
        assert!(!cluster.topology.is_local(&cluster.peer));

        // Above axum's default body limit, below the client codec's.
        let value = Bytes::from(vec![7u8; 3 * 1024 * 1024]);
        let put = client
            .call(&cluster.peer, &replica_request(Operation::Put, "k", value.clone(), 100))
            .await
            .unwrap();
        assert_eq!(put.status, StatusCode::CREATED);
        assert_eq!(cluster.peer_dao.len().unwrap(), 1);
        assert_eq!(cluster.local_dao.len().unwrap(), 0);

        let get = client
            .call(&cluster.peer, &replica_request(Operation::Get, "k", Bytes::new(), NO_TIMESTAMP))
            .await
            .unwrap();
        assert_eq!(get.status, StatusCode::OK);
        assert_eq!(get.body, value);
        assert_eq!(get.timestamp, 100);

        let delete = client
            .call(&cluster.peer, &replica_request(Operation::Delete, "k", Bytes::new(), 101))
            .await
            .unwrap();
        assert_eq!(delete.status, StatusCode::ACCEPTED);

        let get = client
            .call(&cluster.peer, &replica_request(Operation::Get, "k", Bytes::new(), NO_TIMESTAMP))
            .await
            .unwrap();
        assert_eq!(get.status, StatusCode::NOT_FOUND);
        assert_eq!(get.timestamp, 101, "tombstone timestamp crosses the wire");

        let missing = client
            .call(&cluster.peer, &replica_request(Operation::Get, "other", Bytes::new(), NO_TIMESTAMP))
            .await
            .unwrap();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert_eq!(missing.timestamp, NO_TIMESTAMP);
    }

    #[tokio::test]
    async fn test_large_write_reaches_every_replica() {
        let cluster = remote_peer().await;
        let client = ClusterClient::new(cluster.topology.clone(), cluster.local_dao.clone());
        let coordinator = Coordinator::new(cluster.topology.clone(), client, Duration::from_secs(5));

        let value = Bytes::from(vec![1u8; MAX_VALUE_BYTES - 1024]);
        let put = coordinator
            .execute(
                Operation::Put,
                Bytes::from_static(b"big"),
                value.clone(),
                ReplicationParams { ack: 2, from: 2 },
            )
            .await;
        assert_eq!(put.status, StatusCode::CREATED);

        for dao in [&cluster.local_dao, &cluster.peer_dao] {
            let entry = dao.get(b"big").unwrap().unwrap();
            assert_eq!(entry.value.map(|stored| stored.len()), Some(value.len()));
        }
    }

    #[tokio::test]
    async fn test_malformed_timestamp_header_is_no_answer() {
        let (listener, peer_url) = bind_peer().await;
        let app = Router::new().route(
            ENDPOINT_INTERNAL_ENTITY,
            get(|| async { ([(TIMESTAMP_HEADER, "soon")], "v") }),
        );
        serve(listener, app);

        let urls = vec![LOCAL_URL.to_string(), peer_url.clone()];
        let topology = Arc::new(Topology::new(LOCAL_URL, &urls).unwrap());
        let client = ClusterClient::new(topology, Arc::new(MemoryDao::new()));
        let peer = ClusterNode::new(&peer_url).unwrap();

        let result = client
            .call(&peer, &replica_request(Operation::Get, "k", Bytes::new(), NO_TIMESTAMP))
            .await;
        assert!(result.is_err());
    }
}
