//! Index record definitions
//!
//! Defines the on-disk layout of a single index record.

use bytes::{Buf, BufMut, Bytes};

use crate::error::{Result, TesseraError};

/// Fixed part of a record: ValOffset (8) + ValSize (8) + KeyLen (4) = 20 bytes
pub const RECORD_HEADER_SIZE: u64 = 20;

/// Size of the slot a key of `key_size` bytes occupies in the index log.
///
/// The engine reserves slots with it and the recovery scan strides by it, so
/// both must go through this function.
#[inline]
pub fn entry_size(key_size: u32) -> u64 {
    u64::from(key_size) + RECORD_HEADER_SIZE
}

/// A single record of the index log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    /// Absolute offset of the value in the value log address space
    pub value_offset: u64,

    /// Length of the value in bytes
    pub value_size: u64,

    /// The key itself
    pub key: Bytes,
}

impl IndexRecord {
    /// Build a record, rejecting keys whose length does not fit the u32 field
    pub fn new(value_offset: u64, value_size: u64, key: impl Into<Bytes>) -> Result<Self> {
        let key = key.into();
        if u32::try_from(key.len()).is_err() {
            return Err(TesseraError::InvalidArgument(format!(
                "key of {} bytes exceeds the {} byte limit",
                key.len(),
                u32::MAX
            )));
        }
        Ok(Self {
            value_offset,
            value_size,
            key,
        })
    }

    /// Key length as stored on disk
    pub fn key_size(&self) -> u32 {
        // Length checked in `new`; decoded keys come from a u32 field.
        self.key.len() as u32
    }

    /// Total encoded size (`entry_size(key_size)`)
    pub fn size(&self) -> u64 {
        entry_size(self.key_size())
    }

    /// Encode into the given buffer
    pub fn encode_into<B: BufMut>(&self, buf: &mut B) {
        buf.put_u64_le(self.value_offset);
        buf.put_u64_le(self.value_size);
        buf.put_u32_le(self.key_size());
        buf.put_slice(&self.key);
    }

    /// Encode into a freshly allocated buffer
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.size() as usize);
        self.encode_into(&mut buf);
        buf
    }

    /// Decode one record from the front of `buf`.
    ///
    /// `offset` is the absolute position of `buf[0]` in the log and is only
    /// used to report where a truncated record sits.
    pub fn decode(mut buf: &[u8], offset: u64) -> Result<Self> {
        if (buf.remaining() as u64) < RECORD_HEADER_SIZE {
            return Err(TesseraError::IndexCorruption {
                offset,
                reason: format!(
                    "truncated record header: {} of {} bytes",
                    buf.remaining(),
                    RECORD_HEADER_SIZE
                ),
            });
        }

        let value_offset = buf.get_u64_le();
        let value_size = buf.get_u64_le();
        let key_size = buf.get_u32_le() as usize;

        if buf.remaining() < key_size {
            return Err(TesseraError::IndexCorruption {
                offset,
                reason: format!(
                    "truncated key: {} of {} bytes",
                    buf.remaining(),
                    key_size
                ),
            });
        }

        let key = Bytes::copy_from_slice(&buf[..key_size]);

        Ok(Self {
            value_offset,
            value_size,
            key,
        })
    }

    /// Exclusive end of the value range this record points at
    pub fn value_end(&self) -> u64 {
        self.value_offset.saturating_add(self.value_size)
    }
}
