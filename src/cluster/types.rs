use crate::config::internal_port;

use anyhow::{Result, anyhow};

/// A single member of the fixed replica set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClusterNode {
    /// Client-facing URL, as given on the command line.
    pub url: String,
    /// Base URL of the node's internal replica API.
    pub internal_url: String,
}

impl ClusterNode {
    pub fn new(url: &str) -> Result<Self> {
        let mut parsed = reqwest::Url::parse(url)?;
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| anyhow!("Node URL has no port: {}", url))?;
        parsed
            .set_port(Some(internal_port(port)))
            .map_err(|_| anyhow!("Cannot derive internal URL for {}", url))?;

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            internal_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }
}
