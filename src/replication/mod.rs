//! Replication Module
//!
//! Turns one client operation into N replica operations and N replica answers back into one
//! client answer.
//!
//! ## Flow
//! 1. **Selection**: the `Coordinator` asks the `Topology` for the `from` replicas of the key.
//! 2. **Fan-out**: every replica (self included) is called concurrently through a
//!    `ReplicaClient`, each call bounded by the configured timeout. Failures and timeouts become
//!    absent slots; nothing is thrown past this point.
//! 3. **Merge**: the `merger` reduces the slots to one response under the `ack` requirement,
//!    picking the newest answer for reads (last-write-wins on `X-Entity-Timestamp`).
//!
//! ## Submodules
//! - **`types`**: replica answers, operations and replication parameters.
//! - **`merger`**: the pure quorum merge.
//! - **`client`**: the replica call seam and its HTTP/local implementation.
//! - **`local`**: applies a replica operation to this node's storage.
//! - **`coordinator`**: fan-out with per-call timeout.
//! - **`handlers`**: the internal replica HTTP API served to peers.
//! - **`protocol`**: endpoint paths, header names and DTOs shared by both sides.

pub mod client;
pub mod coordinator;
pub mod handlers;
pub mod local;
pub mod merger;
pub mod protocol;
pub mod types;

pub use client::{ClusterClient, ReplicaClient};
pub use coordinator::Coordinator;
pub use merger::merge;
pub use types::{NO_TIMESTAMP, Operation, ReplicaRequest, ReplicaResponse, ReplicationParams};

#[cfg(test)]
mod tests;
