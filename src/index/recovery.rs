//! Index Recovery
//!
//! Rebuilds the key directory and both high-water marks from the index log.

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::keydir::{IndexEntry, KeyDir};

use super::IndexLog;

/// Handles the startup scan of the index log
pub struct IndexRecovery;

/// Result of a recovery scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of records read from the log
    pub records_scanned: u64,

    /// Number of distinct keys in the rebuilt directory
    pub live_keys: u64,

    /// Records whose key was seen again later in the scan.
    ///
    /// The engine rewrites a key's slot in place, so logs it writes always
    /// report zero here. A non-zero count means the log was appended to by
    /// some other writer; the last record per key still wins.
    pub superseded_records: u64,

    /// Next free offset of the value log
    pub value_max_offset: u64,

    /// Next free offset of the index log (== log length)
    pub index_max_offset: u64,
}

impl IndexRecovery {
    /// Scan `log` from offset 0 to its length.
    ///
    /// Every record is inserted with its own offset as the key's slot; a
    /// later record for the same key replaces the earlier one. The value
    /// high-water mark is the maximum value end over all records, not the
    /// end of the last one scanned, since an update rewrites an older slot.
    pub fn recover(log: &IndexLog) -> Result<(KeyDir, RecoveryResult)> {
        let keydir = KeyDir::new();
        let mut result = RecoveryResult::default();
        let mut offset = 0u64;

        for item in log.records() {
            let (record_offset, record) = item?;

            result.value_max_offset = result.value_max_offset.max(record.value_end());
            result.records_scanned += 1;
            offset = record_offset + record.size();

            let entry = IndexEntry::new(record.value_offset, record.value_size, record_offset);
            if keydir.insert(record.key, entry).is_some() {
                result.superseded_records += 1;
            }
        }

        result.index_max_offset = offset;
        result.live_keys = keydir.len() as u64;

        debug!(path = %log.path().display(), end = offset, "index scan finished");
        if result.superseded_records > 0 {
            warn!(
                superseded = result.superseded_records,
                "index log holds several records for some keys; keeping the last of each"
            );
        }
        if result.records_scanned > 0 {
            info!(
                records = result.records_scanned,
                live_keys = result.live_keys,
                superseded = result.superseded_records,
                value_max_offset = result.value_max_offset,
                index_max_offset = result.index_max_offset,
                "recovered index log"
            );
        }

        Ok((keydir, result))
    }
}
