use quorum_kv::cluster::Topology;
use quorum_kv::config::ServiceConfig;
use quorum_kv::http::{ConnectionSettings, EntityRouter, server};
use quorum_kv::replication::{ClusterClient, Coordinator, handlers};
use quorum_kv::storage::{Dao, MemoryDao};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!(
            "Usage: {} --bind <addr:port> [--self <url>] [--node <url>]...",
            args[0]
        );
        eprintln!("Example: {} --bind 127.0.0.1:8080", args[0]);
        eprintln!(
            "Example: {} --bind 127.0.0.1:8081 --node http://127.0.0.1:8080 --node http://127.0.0.1:8081",
            args[0]
        );

        std::process::exit(1);
    }

    let config = ServiceConfig::from_args(&args[1..])?;

    tracing::info!("Starting node {}", config.self_url);
    tracing::info!("Cluster: {:?}", config.cluster_urls);

    // 1. Cluster and storage:
    let topology = Arc::new(Topology::new(&config.self_url, &config.cluster_urls)?);
    let dao: Arc<dyn Dao> = Arc::new(MemoryDao::new());

    // 2. Internal replica API:
    let internal_app = handlers::router(dao.clone(), topology.clone());
    let internal_listener = tokio::net::TcpListener::bind(config.internal_bind()).await?;
    tracing::info!("Internal replica API listening on {}", config.internal_bind());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(internal_listener, internal_app).await {
            tracing::error!("Internal replica API stopped: {}", e);
        }
    });

    // 3. Client-facing server:
    let client = ClusterClient::new(topology.clone(), dao.clone());
    let coordinator = Coordinator::new(topology, client, config.replica_timeout);
    let router = Arc::new(EntityRouter::new(coordinator, dao));
    let settings = ConnectionSettings {
        chunk_size: config.chunk_size,
        write_high_watermark: config.write_high_watermark,
        max_pipeline_depth: config.max_pipeline_depth,
    };
    let listener = tokio::net::TcpListener::bind(config.bind).await?;

    tracing::info!("Press Ctrl+C to shutdown");

    tokio::select! {
        result = server::run(listener, router, settings) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }

    Ok(())
}
