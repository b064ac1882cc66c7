use super::types::ClusterNode;

use anyhow::{Result, bail};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
pub struct Topology {
    nodes: Vec<ClusterNode>,
    self_index: usize,
}

impl Topology {
    pub fn new(self_url: &str, cluster_urls: &[String]) -> Result<Self> {
        let mut nodes = Vec::with_capacity(cluster_urls.len());
        for url in cluster_urls {
            let node = ClusterNode::new(url)?;
            if nodes.contains(&node) {
                bail!("Duplicate node in cluster list: {}", url);
            }
            nodes.push(node);
        }
        // Same order on every node regardless of flag order.
        nodes.sort_by(|a, b| a.url.cmp(&b.url));

        let self_url = self_url.trim_end_matches('/');
        let Some(self_index) = nodes.iter().position(|node| node.url == self_url) else {
            bail!("Cluster list does not contain this node ({})", self_url);
        };

        Ok(Self { nodes, self_index })
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[ClusterNode] {
        &self.nodes
    }

    pub fn local_node(&self) -> &ClusterNode {
        &self.nodes[self.self_index]
    }

    pub fn is_local(&self, node: &ClusterNode) -> bool {
        node.url == self.local_node().url
    }

    /// The `from` nodes responsible for `key`, best-scoring first.
    ///
    /// `from` is clamped to the cluster size.
    pub fn replicas_for(&self, key: &[u8], from: usize) -> Vec<&ClusterNode> {
        let mut scored: Vec<(u64, &ClusterNode)> = self
            .nodes
            .iter()
            .map(|node| (score(&node.url, key), node))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.url.cmp(&b.1.url)));
        scored
            .into_iter()
            .take(from.min(self.nodes.len()))
            .map(|(_, node)| node)
            .collect()
    }
}

fn score(node_url: &str, key: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    node_url.hash(&mut hasher);
    key.hash(&mut hasher);
    hasher.finish()
}
