//! Local Storage Module
//!
//! The node-local storage engine the replication layer reads from and writes to.
//!
//! ## Core Concepts
//! - **Ordered map**: keys are raw bytes kept in sorted order so range scans are cheap.
//! - **Tombstones**: a delete is stored as an entry without a value, carrying the write
//!   timestamp like any other write so it can shadow older values on other replicas.
//! - **Timestamps**: every stored entry remembers the logical write time it was stamped with
//!   by the coordinating node; a replica never lets an older write overwrite a newer one.

pub mod memory;
pub mod types;

pub use memory::MemoryDao;
pub use types::{Dao, Entry, StorageError};
