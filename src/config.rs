//! Node Configuration
//!
//! Everything a node needs to know before it starts serving: where to listen, who it is,
//! and the fixed set of nodes that make up the cluster. Membership is static; there is no
//! discovery, so every node must be started with the same `--node` list.

use anyhow::{Result, bail};
use std::net::SocketAddr;
use std::time::Duration;

/// Offset between the client-facing port and the internal replica API port.
pub const INTERNAL_PORT_OFFSET: u16 = 1000;

const DEFAULT_REPLICA_TIMEOUT: Duration = Duration::from_millis(500);
const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;
const DEFAULT_WRITE_HIGH_WATERMARK: usize = 64 * 1024;
const DEFAULT_MAX_PIPELINE_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Client-facing listen address.
    pub bind: SocketAddr,
    /// This node's own URL as it appears in `cluster_urls`.
    pub self_url: String,
    /// Every node in the cluster, self included.
    pub cluster_urls: Vec<String>,
    /// Upper bound on a single replica call.
    pub replica_timeout: Duration,
    /// Largest chunk a streamed response pulls from its source at once.
    pub chunk_size: usize,
    /// Buffered output bytes above which a connection counts as backpressured.
    pub write_high_watermark: usize,
    /// Parsed requests a connection may queue before it stops reading.
    pub max_pipeline_depth: usize,
}

impl ServiceConfig {
    pub fn new(bind: SocketAddr, self_url: String, cluster_urls: Vec<String>) -> Self {
        Self {
            bind,
            self_url,
            cluster_urls,
            replica_timeout: DEFAULT_REPLICA_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            write_high_watermark: DEFAULT_WRITE_HIGH_WATERMARK,
            max_pipeline_depth: DEFAULT_MAX_PIPELINE_DEPTH,
        }
    }

    /// Parses `--bind <addr:port> [--self <url>] [--node <url>]... [--timeout-ms <n>]
    /// [--chunk-size <n>] [--high-watermark <n>] [--max-pipeline <n>]`.
    ///
    /// `args` excludes the program name.
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut bind: Option<SocketAddr> = None;
        let mut self_url: Option<String> = None;
        let mut nodes: Vec<String> = vec![];
        let mut timeout_ms: Option<u64> = None;
        let mut chunk_size: Option<usize> = None;
        let mut high_watermark: Option<usize> = None;
        let mut max_pipeline: Option<usize> = None;

        let mut i = 0;
        while i < args.len() {
            let flag = args[i].as_str();
            let value = match flag {
                "--bind" | "--self" | "--node" | "--timeout-ms" | "--chunk-size"
                | "--high-watermark" | "--max-pipeline" => match args.get(i + 1) {
                    Some(value) => value,
                    None => bail!("{} requires a value", flag),
                },
                _ => {
                    tracing::warn!("Ignoring unknown argument {}", flag);
                    i += 1;
                    continue;
                }
            };

            match flag {
                "--bind" => bind = Some(value.parse()?),
                "--self" => self_url = Some(normalize_url(value)),
                "--node" => nodes.push(normalize_url(value)),
                "--timeout-ms" => timeout_ms = Some(value.parse()?),
                "--chunk-size" => chunk_size = Some(value.parse()?),
                "--high-watermark" => high_watermark = Some(value.parse()?),
                "--max-pipeline" => max_pipeline = Some(value.parse()?),
                _ => {}
            }
            i += 2;
        }

        let Some(bind) = bind else {
            bail!("--bind is required");
        };
        let self_url = self_url.unwrap_or_else(|| format!("http://{}", bind));
        if nodes.is_empty() {
            nodes.push(self_url.clone());
        }
        if !nodes.contains(&self_url) {
            bail!("cluster list does not contain this node ({})", self_url);
        }

        let mut config = Self::new(bind, self_url, nodes);
        if let Some(ms) = timeout_ms {
            config.replica_timeout = Duration::from_millis(ms);
        }
        if let Some(size) = chunk_size {
            if size == 0 {
                bail!("--chunk-size must be positive");
            }
            config.chunk_size = size;
        }
        if let Some(mark) = high_watermark {
            config.write_high_watermark = mark;
        }
        if let Some(depth) = max_pipeline {
            config.max_pipeline_depth = depth.max(1);
        }
        Ok(config)
    }

    /// Address the internal replica API listens on.
    pub fn internal_bind(&self) -> SocketAddr {
        SocketAddr::new(self.bind.ip(), internal_port(self.bind.port()))
    }
}

pub fn internal_port(client_port: u16) -> u16 {
    client_port.wrapping_add(INTERNAL_PORT_OFFSET)
}

fn normalize_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
