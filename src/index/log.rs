//! Index Log
//!
//! Memory-mapped, append-only storage for index records.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::{MmapMut, MmapOptions};
use tracing::debug;

use crate::error::{Result, TesseraError};

use super::IndexRecord;

/// Smallest mapped window once the log holds any data
#[cfg(unix)]
const MIN_WINDOW: u64 = 64 * 1024;

/// The index log file, mapped read-write in one window.
///
/// The file length is always the exact end of the furthest record written:
/// the recovery scan uses it as its end condition, so the file is never
/// padded. The mapped window may be longer than the file; on unix the
/// window is reserved ahead of the end of the file and an append only
/// extends the file, remapping when the window is outgrown (doubling).
///
/// ## Concurrency:
/// - Reads take `&self`, writes take `&mut self`
/// - The engine keeps the log behind its write lock
pub struct IndexLog {
    /// Path of the `.vidx` file
    path: PathBuf,
    /// Backing file handle (kept for growth and remapping)
    file: File,
    /// Mapping of `[0, capacity)`; `None` while nothing is mapped
    mmap: Option<MmapMut>,
    /// Current file length in bytes
    len: u64,
    /// Length of the mapped window, `>= len` while mapped
    capacity: u64,
}

impl IndexLog {
    /// Open or create an index log at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let len = file.metadata()?.len();
        let mmap = Self::map(&file, len)?;

        debug!(path = %path.display(), len, "opened index log");

        Ok(Self {
            path: path.to_path_buf(),
            file,
            mmap,
            len,
            capacity: len,
        })
    }

    /// Current file length in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Path of the index log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy `buf.len()` bytes starting at `offset` out of the log
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let range = self.range(offset, buf.len() as u64)?;
        buf.copy_from_slice(&self.bytes()?[range]);
        Ok(())
    }

    /// Write `data` at `offset`, extending the file when it ends past the
    /// current length
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or_else(|| TesseraError::InvalidArgument("index write overflows u64".to_string()))?;

        if end > self.len {
            self.grow(end)?;
        }

        let range = to_usize(offset)?..to_usize(end)?;
        self.bytes_mut()?[range].copy_from_slice(data);
        Ok(())
    }

    /// Decode the record stored at `offset`
    pub fn read_record_at(&self, offset: u64) -> Result<IndexRecord> {
        if offset >= self.len {
            return Err(TesseraError::IndexCorruption {
                offset,
                reason: format!("record offset past end of log ({} bytes)", self.len),
            });
        }
        let start = to_usize(offset)?;
        IndexRecord::decode(&self.bytes()?[start..], offset)
    }

    /// Encode `record` at `offset`: a fresh append when `offset == len`,
    /// an in-place rewrite of an existing slot otherwise
    pub fn write_record_at(&mut self, offset: u64, record: &IndexRecord) -> Result<()> {
        let encoded = record.encode();
        self.write_at(offset, &encoded)
    }

    /// Iterate over every record from offset 0 to the end of the log
    pub fn records(&self) -> RecordIter<'_> {
        RecordIter {
            log: self,
            offset: 0,
            failed: false,
        }
    }

    /// Length of the mapped window in bytes
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Flush dirty pages of `[0, len)` to disk
    pub fn flush(&self) -> Result<()> {
        if let Some(mmap) = self.mmap.as_ref() {
            mmap.flush_range(0, to_usize(self.len)?)?;
        }
        Ok(())
    }

    /// Drop the mapping; reads and in-place writes fail afterward
    pub fn unmap(&mut self) {
        self.mmap = None;
        self.capacity = 0;
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn bytes(&self) -> Result<&[u8]> {
        let len = to_usize(self.len)?;
        match self.mmap.as_deref() {
            Some(mmap) => Ok(&mmap[..len]),
            None if len == 0 => Ok(&[]),
            None => Err(not_mapped(&self.path)),
        }
    }

    fn bytes_mut(&mut self) -> Result<&mut [u8]> {
        let len = to_usize(self.len)?;
        match self.mmap.as_deref_mut() {
            Some(mmap) => Ok(&mut mmap[..len]),
            None if len == 0 => Ok(&mut []),
            None => Err(not_mapped(&self.path)),
        }
    }

    fn range(&self, offset: u64, len: u64) -> Result<std::ops::Range<usize>> {
        let end = offset.checked_add(len).filter(|&end| end <= self.len).ok_or_else(|| {
            TesseraError::IndexCorruption {
                offset,
                reason: format!("read of {} bytes past end of log ({} bytes)", len, self.len),
            }
        })?;
        Ok(to_usize(offset)?..to_usize(end)?)
    }

    /// Extend the file to exactly `new_len` bytes.
    ///
    /// The new window is mapped before the file changes, and the old one is
    /// only replaced once that succeeds. A failure leaves length, window and
    /// file as they were.
    #[cfg(unix)]
    fn grow(&mut self, new_len: u64) -> Result<()> {
        if new_len > self.capacity {
            let capacity = new_len
                .max(self.capacity.saturating_mul(2))
                .max(MIN_WINDOW);
            let mmap = Self::map(&self.file, capacity)?;
            debug!(path = %self.path.display(), from = self.capacity, to = capacity, "remapped index log");
            self.mmap = mmap;
            self.capacity = capacity;
        }
        self.file.set_len(new_len)?;
        self.len = new_len;
        Ok(())
    }

    /// Extend the file to exactly `new_len` bytes.
    ///
    /// The file cannot be resized while mapped here, so the window always
    /// matches the file. On failure the old length and mapping are restored.
    #[cfg(not(unix))]
    fn grow(&mut self, new_len: u64) -> Result<()> {
        self.mmap = None;
        let grown = self
            .file
            .set_len(new_len)
            .map_err(TesseraError::from)
            .and_then(|()| Self::map(&self.file, new_len));
        match grown {
            Ok(mmap) => {
                debug!(path = %self.path.display(), from = self.len, to = new_len, "grew index log");
                self.mmap = mmap;
                self.capacity = new_len;
                self.len = new_len;
                Ok(())
            }
            Err(e) => {
                self.file.set_len(self.len)?;
                self.mmap = Self::map(&self.file, self.len)?;
                self.capacity = self.len;
                Err(e)
            }
        }
    }

    fn map(file: &File, len: u64) -> Result<Option<MmapMut>> {
        if len == 0 {
            return Ok(None);
        }
        let len = to_usize(len)?;
        // SAFETY: the file is opened read-write by this process and only
        // grows through `grow`; bytes past the end of the file are never
        // touched.
        let mmap = unsafe { MmapOptions::new().len(len).map_mut(file)? };
        Ok(Some(mmap))
    }
}

fn not_mapped(path: &Path) -> TesseraError {
    TesseraError::Storage(format!("index log {} is not mapped", path.display()))
}

fn to_usize(value: u64) -> Result<usize> {
    usize::try_from(value).map_err(|_| {
        TesseraError::InvalidArgument(format!("offset {} exceeds the address space", value))
    })
}

/// Sequential iterator over the records of an index log.
///
/// Yields `(offset, record)` pairs; stops after the first decode error.
pub struct RecordIter<'a> {
    log: &'a IndexLog,
    offset: u64,
    failed: bool,
}

impl Iterator for RecordIter<'_> {
    type Item = Result<(u64, IndexRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.log.len() {
            return None;
        }

        let offset = self.offset;
        match self.log.read_record_at(offset) {
            Ok(record) => {
                self.offset += record.size();
                Some(Ok((offset, record)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
