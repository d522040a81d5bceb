//! Key Directory Module
//!
//! In-memory index from key bytes to the location of the latest value.
//!
//! ## Responsibilities
//! - Concurrent lookups without caller-side locking
//! - One entry per distinct key (byte equality)
//! - Remember each key's index-log slot across updates
//!
//! ## Data Structure Choice
//! `DashMap` keyed by `Bytes`:
//! - Sharded locks, so readers rarely contend with the single writer
//! - `Bytes: Borrow<[u8]>` allows lookups with a plain `&[u8]`
//!
//! The directory is never persisted; it is rebuilt by the recovery scan.

mod table;

pub use table::KeyDir;

/// Location of a key's live value and of its index-log slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Absolute offset of the value in the value log
    pub value_offset: u64,

    /// Length of the value in bytes
    pub value_size: u64,

    /// Absolute offset of the key's record in the index log
    pub key_offset: u64,
}

impl IndexEntry {
    pub fn new(value_offset: u64, value_size: u64, key_offset: u64) -> Self {
        Self {
            value_offset,
            value_size,
            key_offset,
        }
    }

    /// Exclusive end of the value range
    pub fn value_end(&self) -> u64 {
        self.value_offset.saturating_add(self.value_size)
    }
}
