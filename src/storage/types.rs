use bytes::Bytes;

/// One stored version of a key: a value or a tombstone, stamped with its write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// `None` marks a tombstone.
    pub value: Option<Bytes>,
    /// Milliseconds since the UNIX epoch assigned by the coordinating node.
    pub timestamp: i64,
}

impl Entry {
    pub fn value(value: Bytes, timestamp: i64) -> Self {
        Self {
            value: Some(value),
            timestamp,
        }
    }

    pub fn tombstone(timestamp: i64) -> Self {
        Self {
            value: None,
            timestamp,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage lock poisoned")]
    Poisoned,
}

/// The key-value operations the replication layer needs from a storage engine.
///
/// Implementations must be safe to share between connections; all methods take `&self`.
pub trait Dao: Send + Sync + 'static {
    /// Latest entry for `key`, tombstones included.
    fn get(&self, key: &[u8]) -> Result<Option<Entry>, StorageError>;

    /// Stores `entry` unless a strictly newer entry is already present.
    fn upsert(&self, key: Bytes, entry: Entry) -> Result<(), StorageError>;

    /// Live (non-tombstone) entries with `from <= key < to` in key order.
    /// `to = None` scans to the end of the keyspace.
    fn range(&self, from: &[u8], to: Option<&[u8]>) -> Result<Vec<(Bytes, Bytes)>, StorageError>;

    /// Number of stored entries, tombstones included.
    fn len(&self) -> Result<usize, StorageError>;
}
