//! Mapped Block
//!
//! One fixed-size window of the value log.

use std::fs::File;
use std::ptr;

use memmap2::{MmapMut, MmapOptions};

use crate::error::{Result, TesseraError};

/// A read-write mapping of `[index * len, (index + 1) * len)` of the value log.
///
/// Writers copy into the window through a shared reference. This is sound
/// only because the engine hands every writer a disjoint byte range (value
/// offsets come from an atomic fetch-and-add) and readers only read ranges
/// whose writes completed before the key was published.
pub struct MappedBlock {
    /// Block index inside the value log
    index: u64,
    /// Base pointer of the window, taken once from `mmap`
    ptr: *mut u8,
    /// Window length (== block size)
    len: usize,
    /// Owns the mapping; unmapped on drop
    mmap: MmapMut,
}

// SAFETY: the mapping is process-wide memory; concurrent access is limited to
// disjoint ranges as described on the type.
unsafe impl Send for MappedBlock {}
unsafe impl Sync for MappedBlock {}

impl MappedBlock {
    /// Map block `index` of `file`. The file must already cover the block.
    pub fn map(file: &File, index: u64, block_size: usize) -> Result<Self> {
        let offset = index
            .checked_mul(block_size as u64)
            .ok_or_else(|| TesseraError::Storage(format!("block {} offset overflows u64", index)))?;

        // SAFETY: the file is never truncated while the pool is open, so the
        // mapped range stays backed.
        let mut mmap = unsafe {
            MmapOptions::new()
                .offset(offset)
                .len(block_size)
                .map_mut(file)?
        };
        let ptr = mmap.as_mut_ptr();

        Ok(Self {
            index,
            ptr,
            len: block_size,
            mmap,
        })
    }

    /// Block index inside the value log
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Window length in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy as much of `data` as fits starting at `block_offset`.
    ///
    /// Returns the number of bytes written.
    pub fn write_at(&self, block_offset: usize, data: &[u8]) -> Result<usize> {
        let count = self.span(block_offset, data.len())?;
        // SAFETY: `span` keeps the copy inside the window; callers own the
        // range exclusively.
        unsafe {
            ptr::copy_nonoverlapping(data.as_ptr(), self.ptr.add(block_offset), count);
        }
        Ok(count)
    }

    /// Fill as much of `buf` as the window holds starting at `block_offset`.
    ///
    /// Returns the number of bytes read.
    pub fn read_at(&self, block_offset: usize, buf: &mut [u8]) -> Result<usize> {
        let count = self.span(block_offset, buf.len())?;
        // SAFETY: `span` keeps the copy inside the window.
        unsafe {
            ptr::copy_nonoverlapping(self.ptr.add(block_offset), buf.as_mut_ptr(), count);
        }
        Ok(count)
    }

    /// Flush dirty pages of this window to disk
    pub fn flush(&self) -> Result<()> {
        self.mmap.flush()?;
        Ok(())
    }

    /// Bytes transferable from `block_offset` for a request of `wanted` bytes
    fn span(&self, block_offset: usize, wanted: usize) -> Result<usize> {
        if block_offset > self.len {
            return Err(TesseraError::Storage(format!(
                "offset {} outside block {} of {} bytes",
                block_offset, self.index, self.len
            )));
        }
        Ok(wanted.min(self.len - block_offset))
    }
}

impl std::fmt::Debug for MappedBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedBlock")
            .field("index", &self.index)
            .field("len", &self.len)
            .finish()
    }
}
