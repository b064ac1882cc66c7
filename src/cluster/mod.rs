//! Cluster Topology Module
//!
//! The replica set is fixed and known up front: every node is started with the same list of
//! node URLs. This module turns that list into a `Topology` and answers the one question the
//! coordinator needs, "which replicas hold this key?".
//!
//! ## Core Concepts
//! - **Static membership**: no discovery, no failure detection; an unreachable node simply
//!   produces an absent replica response.
//! - **Rendezvous hashing**: each (node, key) pair is scored and the highest scores win, so
//!   every coordinator picks the same replicas for a key without coordination.

pub mod topology;
pub mod types;

pub use topology::Topology;
pub use types::ClusterNode;
