//! Block Pool
//!
//! Owns the value-log file and caches its mapped block windows.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{Result, TesseraError};

use super::{locate, MappedBlock};

/// Manages the value log
///
/// ## Concurrency:
/// - `inner`: Protected by Mutex (file growth + window cache)
/// - Copies into and out of windows happen outside the lock
/// - All methods use `&self`
pub struct BlockPool {
    /// Path of the `.vdb` file
    path: PathBuf,

    /// Fixed block size in bytes
    block_size: u64,

    /// Idle windows kept mapped before eviction kicks in
    max_mapped: usize,

    /// File handle, its length, and the cached windows
    inner: Mutex<PoolInner>,
}

struct PoolInner {
    file: File,
    file_len: u64,
    blocks: HashMap<u64, Arc<MappedBlock>>,
}

/// Scoped access to one mapped block.
///
/// Holding a handle keeps the window mapped; dropping it releases the window
/// back to the pool on every exit path.
#[derive(Debug)]
pub struct BlockHandle {
    block: Arc<MappedBlock>,
}

impl BlockHandle {
    /// Block index inside the value log
    pub fn index(&self) -> u64 {
        self.block.index()
    }

    /// Window length (== block size)
    pub fn len(&self) -> usize {
        self.block.len()
    }

    pub fn is_empty(&self) -> bool {
        self.block.is_empty()
    }

    /// Write as much of `data` as fits at `block_offset`; returns bytes written
    pub fn write_at(&self, block_offset: usize, data: &[u8]) -> Result<usize> {
        self.block.write_at(block_offset, data)
    }

    /// Read as much of `buf` as the window holds at `block_offset`; returns
    /// bytes read
    pub fn read_at(&self, block_offset: usize, buf: &mut [u8]) -> Result<usize> {
        self.block.read_at(block_offset, buf)
    }

    /// Copy of the whole window
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.len()];
        self.read_at(0, &mut buf)?;
        Ok(buf)
    }
}

impl BlockPool {
    /// Open or create the value log at `path`
    pub fn open(path: &Path, block_size: u64, max_mapped: usize) -> Result<Self> {
        if block_size == 0 || usize::try_from(block_size).is_err() {
            return Err(TesseraError::InvalidArgument(format!(
                "unusable block size: {}",
                block_size
            )));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let file_len = file.metadata()?.len();

        debug!(path = %path.display(), block_size, file_len, "opened value log");

        Ok(Self {
            path: path.to_path_buf(),
            block_size,
            max_mapped: max_mapped.max(1),
            inner: Mutex::new(PoolInner {
                file,
                file_len,
                blocks: HashMap::new(),
            }),
        })
    }

    /// Acquire the window of block `index`, growing the file if the block
    /// does not exist yet
    pub fn acquire(&self, index: u64) -> Result<BlockHandle> {
        let mut inner = self.inner.lock();

        if let Some(block) = inner.blocks.get(&index) {
            return Ok(BlockHandle {
                block: Arc::clone(block),
            });
        }

        let block_end = index
            .checked_add(1)
            .and_then(|n| n.checked_mul(self.block_size))
            .ok_or_else(|| TesseraError::Storage(format!("block {} past addressable range", index)))?;

        if block_end > inner.file_len {
            inner.file.set_len(block_end)?;
            debug!(from = inner.file_len, to = block_end, "grew value log");
            inner.file_len = block_end;
        }

        let block = Arc::new(MappedBlock::map(&inner.file, index, self.block_size as usize)?);
        trace!(block = index, "mapped block");

        inner.blocks.insert(index, Arc::clone(&block));
        self.evict_idle(&mut inner);

        Ok(BlockHandle { block })
    }

    /// Write `data` into the value log starting at absolute `offset`
    pub fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        let (mut block_index, block_offset) = locate(offset, self.block_size);
        let mut block_offset = block_offset as usize;
        let mut written = 0;

        while written < data.len() {
            let handle = self.acquire(block_index)?;
            written += handle.write_at(block_offset, &data[written..])?;
            block_offset = 0;
            block_index += 1;
        }
        Ok(())
    }

    /// Fill `buf` from the value log starting at absolute `offset`
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let (mut block_index, block_offset) = locate(offset, self.block_size);
        let mut block_offset = block_offset as usize;
        let mut read = 0;

        while read < buf.len() {
            let handle = self.acquire(block_index)?;
            read += handle.read_at(block_offset, &mut buf[read..])?;
            block_offset = 0;
            block_index += 1;
        }
        Ok(())
    }

    /// Flush every cached window to disk
    pub fn flush(&self) -> Result<()> {
        let blocks: Vec<Arc<MappedBlock>> = self.inner.lock().blocks.values().cloned().collect();
        for block in blocks {
            block.flush()?;
        }
        Ok(())
    }

    /// Drop every cached window. Outstanding handles keep their own mapping
    /// alive until they are dropped.
    pub fn release_all(&self) {
        self.inner.lock().blocks.clear();
    }

    /// Block size in bytes
    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Number of blocks the file currently holds
    pub fn block_count(&self) -> u64 {
        self.inner.lock().file_len / self.block_size
    }

    /// Number of windows currently cached
    pub fn mapped_blocks(&self) -> usize {
        self.inner.lock().blocks.len()
    }

    /// Path of the value log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Unmap cached windows nobody holds a handle to, once over the bound
    fn evict_idle(&self, inner: &mut PoolInner) {
        if inner.blocks.len() <= self.max_mapped {
            return;
        }

        // Handles are only created under this lock, so a count of 1 means
        // the cache holds the only reference.
        let before = inner.blocks.len();
        inner.blocks.retain(|_, block| Arc::strong_count(block) > 1);
        trace!(evicted = before - inner.blocks.len(), "released idle blocks");
    }
}
