//! Engine Module
//!
//! The storage engine that ties the index log, the block pool and the key
//! directory together.
//!
//! ## Responsibilities
//! - Recover the key directory from the index log on startup
//! - Reserve value-log ranges and index-log slots
//! - Handle concurrent read/write access
//! - Flush and release both files on close

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use crossbeam::utils::CachePadded;
use parking_lot::Mutex;
use tracing::{info, trace, warn};

use crate::blocks::BlockPool;
use crate::cleanup;
use crate::config::Config;
use crate::error::{Result, TesseraError};
use crate::index::{self, IndexLog, IndexRecord, IndexRecovery, RecoveryResult};
use crate::keydir::{IndexEntry, KeyDir};

/// The main storage engine
///
/// ## Concurrency Model
///
/// - **Value writes**: lock-free between writers
///   - `value_max_offset.fetch_add(len)` gives each `put` a private range
///   - Bytes are copied into the block pool without any engine lock
///
/// - **Slot assignment + publish**: serialized by the `index_log` mutex
///   - Reuse the key's slot or reserve a new one
///   - Write the index record, then insert into the key directory
///
/// - **Reads** (get): no engine lock
///   - Key directory lookup, then a copy out of the block pool
///   - A published entry always points at fully written value bytes,
///     because the value write finishes before the publish
///
/// The engine is `Send + Sync`; share it between threads with `Arc`.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Index log; its mutex is the only critical section of `put`
    index_log: Mutex<IndexLog>,

    /// Value log (internal Mutex on the window cache only)
    blocks: BlockPool,

    /// In-memory index (concurrent map)
    keydir: KeyDir,

    /// Next free offset of the value log
    value_max_offset: CachePadded<AtomicU64>,

    /// Next free offset of the index log
    index_max_offset: CachePadded<AtomicU64>,

    /// Outcome of the startup scan
    recovery: RecoveryResult,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create the parent directory if missing
    /// 2. Open/create and map `<base>.vidx` and `<base>.vdb`
    /// 3. Scan the index log to rebuild the key directory and both offsets
    /// 4. Register both files for removal at process exit if requested
    /// 5. Ready to serve requests
    ///
    /// Any failure here is fatal: no engine is returned.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        // Step 1: Create the parent directory
        if let Some(parent) = config.base_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Step 2: Open both files
        let index_path = config.index_path();
        let value_path = config.value_path();
        let index_log = IndexLog::open(&index_path)?;
        let blocks = BlockPool::open(&value_path, config.block_size, config.max_mapped_blocks)?;

        // Step 3: Recovery scan
        let (keydir, recovery) = IndexRecovery::recover(&index_log)?;

        // Step 4: Delete-on-exit
        if config.delete_on_exit {
            cleanup::delete_on_exit(&index_path);
            cleanup::delete_on_exit(&value_path);
        }

        info!(
            index = %index_path.display(),
            values = %value_path.display(),
            block_size = config.block_size,
            keys = keydir.len(),
            "engine opened"
        );

        Ok(Self {
            value_max_offset: CachePadded::new(AtomicU64::new(recovery.value_max_offset)),
            index_max_offset: CachePadded::new(AtomicU64::new(recovery.index_max_offset)),
            config,
            index_log: Mutex::new(index_log),
            blocks,
            keydir,
            recovery,
        })
    }

    /// Open with a base path and block size (convenience method)
    ///
    /// Uses default config for everything else
    pub fn open_path(path: &Path, block_size: u64) -> Result<Self> {
        let config = Config::builder()
            .base_path(path)
            .block_size(block_size)
            .build()?;
        Self::open(config)
    }

    /// Size of the index-log slot for a key of `key_size` bytes
    pub fn entry_size(key_size: u32) -> u64 {
        index::entry_size(key_size)
    }

    /// Put a key-value pair
    ///
    /// Steps:
    /// 1. Reserve the value range (atomic fetch-and-add)
    /// 2. Write the value into the block pool
    /// 3. Acquire the index lock, pick the key's slot
    /// 4. Write the index record, publish the entry
    ///
    /// Returns `true` if the key already had a value (update), `false` on a
    /// fresh insert. A failed put may leave orphaned value bytes behind.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<bool> {
        let key_size = u32::try_from(key.len()).map_err(|_| {
            TesseraError::InvalidArgument(format!(
                "key of {} bytes exceeds the {} byte limit",
                key.len(),
                u32::MAX
            ))
        })?;
        let value_size = value.len() as u64;

        // Step 1: Reserve a private value range
        let value_offset = self.value_max_offset.fetch_add(value_size, Ordering::SeqCst);

        // Step 2: Write value bytes (no engine lock)
        self.blocks.write_at(value_offset, value)?;

        let record = IndexRecord::new(value_offset, value_size, Bytes::copy_from_slice(key))?;

        // Step 3 + 4: Critical section
        let mut index_log = self.index_log.lock();

        let existing = self.keydir.get(key);
        let key_offset = match existing {
            Some(entry) => entry.key_offset,
            None => self
                .index_max_offset
                .fetch_add(index::entry_size(key_size), Ordering::SeqCst),
        };

        if let Err(e) = index_log.write_record_at(key_offset, &record) {
            if existing.is_none() {
                // Give the slot back so the log stays gap-free.
                self.index_max_offset.store(key_offset, Ordering::SeqCst);
            }
            return Err(e);
        }

        let entry = IndexEntry::new(value_offset, value_size, key_offset);
        let previous = self.keydir.insert(record.key, entry);
        drop(index_log);

        trace!(key_offset, value_offset, value_size, update = previous.is_some(), "put");

        Ok(previous.is_some())
    }

    /// Get a value by key
    ///
    /// Returns `Ok(None)` without any I/O when the key is unknown.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let entry = match self.keydir.get(key) {
            Some(entry) => entry,
            None => return Ok(None),
        };

        let len = usize::try_from(entry.value_size).map_err(|_| {
            TesseraError::InvalidArgument(format!(
                "value of {} bytes exceeds the address space",
                entry.value_size
            ))
        })?;

        let mut value = vec![0u8; len];
        self.blocks.read_at(entry.value_offset, &mut value)?;

        trace!(value_offset = entry.value_offset, value_size = entry.value_size, "get");

        Ok(Some(value))
    }

    /// Flush both files to disk without closing
    pub fn flush(&self) -> Result<()> {
        self.blocks.flush()?;
        self.index_log.lock().flush()?;
        Ok(())
    }

    /// Close the engine
    ///
    /// Flushes both files, clears the key directory and unmaps everything.
    /// A flush error is returned, but the engine is closed regardless.
    pub fn close(self) -> Result<()> {
        let result = self.flush();
        if let Err(e) = &result {
            warn!(error = %e, "flush failed while closing engine");
        }

        self.keydir.clear();
        info!(base = %self.config.base_path.display(), "engine closed");

        result
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the block size in bytes
    pub fn block_size(&self) -> u64 {
        self.config.block_size
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.keydir.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keydir.is_empty()
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.keydir.contains_key(key)
    }

    /// Get the in-memory entry of a key
    pub fn entry(&self, key: &[u8]) -> Option<IndexEntry> {
        self.keydir.get(key)
    }

    /// All live entries, ordered by index-log slot
    pub fn entries(&self) -> Vec<(Bytes, IndexEntry)> {
        self.keydir.snapshot()
    }

    /// Next free offset of the value log
    pub fn value_max_offset(&self) -> u64 {
        self.value_max_offset.load(Ordering::SeqCst)
    }

    /// Next free offset of the index log
    pub fn index_max_offset(&self) -> u64 {
        self.index_max_offset.load(Ordering::SeqCst)
    }

    /// Current length of the index log file
    pub fn index_log_len(&self) -> u64 {
        self.index_log.lock().len()
    }

    /// Get the block pool (raw access to the value log)
    pub fn block_pool(&self) -> &BlockPool {
        &self.blocks
    }

    /// Get the stats of the startup scan
    pub fn recovery_result(&self) -> &RecoveryResult {
        &self.recovery
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.keydir.clear();
        self.blocks.release_all();
        self.index_log.get_mut().unmap();
    }
}
