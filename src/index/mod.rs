//! Index Log Module
//!
//! Persists the key → value-location mapping as a flat, append-only run of
//! binary records. Each key owns one slot; updates rewrite that slot in place.
//!
//! ## Responsibilities
//! - Encode/decode index records
//! - Random-offset record writes over a memory-mapped file
//! - Sequential scan on startup to rebuild the key directory
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Record 1 (slot of key A)                                 │
//! │ ┌──────────────┬──────────────┬─────────────┬─────────┐ │
//! │ │ ValOffset(8) │ ValSize (8)  │ KeyLen (4)  │  Key    │ │
//! │ └──────────────┴──────────────┴─────────────┴─────────┘ │
//! ├──────────────────────────────────────────────────────────┤
//! │ Record 2 (slot of key B)                                 │
//! │ ┌──────────────┬──────────────┬─────────────┬─────────┐ │
//! │ │ ValOffset(8) │ ValSize (8)  │ KeyLen (4)  │  Key    │ │
//! │ └──────────────┴──────────────┴─────────────┴─────────┘ │
//! └──────────────────────────────────────────────────────────┘
//! ```
//! All integers are little-endian. There is no file header: the first record
//! starts at byte 0 and the file length is the end of the last record.

mod record;
mod log;
mod recovery;

pub use record::{entry_size, IndexRecord, RECORD_HEADER_SIZE};
pub use log::{IndexLog, RecordIter};
pub use recovery::{IndexRecovery, RecoveryResult};
