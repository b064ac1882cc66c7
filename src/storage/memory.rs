use super::types::{Dao, Entry, StorageError};

use bytes::Bytes;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

/// In-memory ordered storage engine.
#[derive(Debug, Default)]
pub struct MemoryDao {
    entries: RwLock<BTreeMap<Bytes, Entry>>,
}

impl MemoryDao {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Dao for MemoryDao {
    fn get(&self, key: &[u8]) -> Result<Option<Entry>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn upsert(&self, key: Bytes, entry: Entry) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        match entries.get(&key) {
            Some(existing) if existing.timestamp > entry.timestamp => {
                tracing::debug!(
                    "Ignoring stale write (stored={}, incoming={})",
                    existing.timestamp,
                    entry.timestamp
                );
            }
            _ => {
                entries.insert(key, entry);
            }
        }
        Ok(())
    }

    fn range(&self, from: &[u8], to: Option<&[u8]>) -> Result<Vec<(Bytes, Bytes)>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        let upper = match to {
            Some(to) => Bound::Excluded(to),
            None => Bound::Unbounded,
        };
        if let Some(to) = to
            && to <= from
        {
            return Ok(Vec::new());
        }

        Ok(entries
            .range::<[u8], _>((Bound::Included(from), upper))
            .filter_map(|(key, entry)| entry.value.clone().map(|value| (key.clone(), value)))
            .collect())
    }

    fn len(&self) -> Result<usize, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.len())
    }
}
