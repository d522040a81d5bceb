//! Key directory implementation
//!
//! DashMap-based directory, safe for concurrent readers and writers.

use bytes::Bytes;
use dashmap::DashMap;

use super::IndexEntry;

/// Concurrent map from key bytes to `IndexEntry`
#[derive(Debug, Default)]
pub struct KeyDir {
    entries: DashMap<Bytes, IndexEntry>,
}

impl KeyDir {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the entry of `key`
    pub fn get(&self, key: &[u8]) -> Option<IndexEntry> {
        self.entries.get(key).map(|entry| *entry)
    }

    /// Insert or replace the entry of `key`, returning the previous one
    pub fn insert(&self, key: Bytes, entry: IndexEntry) -> Option<IndexEntry> {
        self.entries.insert(key, entry)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Copy of all `(key, entry)` pairs, ordered by slot offset
    pub fn snapshot(&self) -> Vec<(Bytes, IndexEntry)> {
        let mut pairs: Vec<(Bytes, IndexEntry)> = self
            .entries
            .iter()
            .map(|item| (item.key().clone(), *item.value()))
            .collect();
        pairs.sort_by_key(|(_, entry)| entry.key_offset);
        pairs
    }
}
