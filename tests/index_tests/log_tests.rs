//! Tests for IndexLog
//!
//! These tests verify:
//! - Opening/creating the log file
//! - Appends grow the file to the exact record end
//! - In-place rewrites keep the length
//! - Random-offset reads and sequential iteration
//! - The mapped window grows ahead of the file
//! - I/O on an unmapped log fails instead of being skipped
//! - Persistence across reopen

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use tesserakv::index::{IndexLog, IndexRecord};
use tesserakv::TesseraError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.vidx");
    (temp_dir, path)
}

fn record(value_offset: u64, value_size: u64, key: &[u8]) -> IndexRecord {
    IndexRecord::new(value_offset, value_size, key.to_vec()).unwrap()
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_creates_empty_file() {
    let (_temp, path) = setup_temp_log();

    let log = IndexLog::open(&path).unwrap();

    assert!(path.exists());
    assert!(log.is_empty());
    assert_eq!(log.len(), 0);
    assert_eq!(log.path(), path.as_path());
    assert_eq!(log.records().count(), 0);
}

// =============================================================================
// Write Tests
// =============================================================================

#[test]
fn test_append_grows_to_exact_length() {
    let (_temp, path) = setup_temp_log();
    let mut log = IndexLog::open(&path).unwrap();

    log.write_record_at(0, &record(0, 3, &[0, 0])).unwrap();
    assert_eq!(log.len(), 22);

    log.write_record_at(22, &record(3, 4, &[0, 1])).unwrap();
    assert_eq!(log.len(), 44);

    log.flush().unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), 44);
}

#[test]
fn test_rewrite_in_place_keeps_length() {
    let (_temp, path) = setup_temp_log();
    let mut log = IndexLog::open(&path).unwrap();
    log.write_record_at(0, &record(0, 3, &[0, 0])).unwrap();
    log.write_record_at(22, &record(3, 4, &[0, 1])).unwrap();

    log.write_record_at(0, &record(7, 5, &[0, 0])).unwrap();

    assert_eq!(log.len(), 44);
    assert_eq!(log.read_record_at(0).unwrap(), record(7, 5, &[0, 0]));
    assert_eq!(log.read_record_at(22).unwrap(), record(3, 4, &[0, 1]));
}

#[test]
fn test_raw_write_and_read() {
    let (_temp, path) = setup_temp_log();
    let mut log = IndexLog::open(&path).unwrap();

    log.write_at(4, b"abcd").unwrap();

    let mut buf = [0u8; 8];
    log.read_at(0, &mut buf).unwrap();
    assert_eq!(&buf, &[0, 0, 0, 0, b'a', b'b', b'c', b'd']);
}

// =============================================================================
// Read Tests
// =============================================================================

#[test]
fn test_read_past_end() {
    let (_temp, path) = setup_temp_log();
    let mut log = IndexLog::open(&path).unwrap();
    log.write_record_at(0, &record(0, 1, b"k")).unwrap();

    let result = log.read_record_at(21);
    assert!(matches!(result, Err(TesseraError::IndexCorruption { offset: 21, .. })));

    let mut buf = [0u8; 4];
    assert!(log.read_at(20, &mut buf).is_err());
}

#[test]
fn test_records_iterates_in_order() {
    let (_temp, path) = setup_temp_log();
    let mut log = IndexLog::open(&path).unwrap();
    log.write_record_at(0, &record(0, 3, b"a")).unwrap();
    log.write_record_at(21, &record(3, 4, b"bbb")).unwrap();
    log.write_record_at(44, &record(7, 0, b"")).unwrap();

    let records: Vec<(u64, IndexRecord)> = log.records().map(|r| r.unwrap()).collect();

    assert_eq!(
        records,
        vec![
            (0, record(0, 3, b"a")),
            (21, record(3, 4, b"bbb")),
            (44, record(7, 0, b"")),
        ]
    );
}

#[test]
fn test_records_stops_at_truncated_tail() {
    let (_temp, path) = setup_temp_log();
    {
        let mut log = IndexLog::open(&path).unwrap();
        log.write_record_at(0, &record(0, 3, b"key")).unwrap();
        log.flush().unwrap();
    }

    // Half a header appended by hand
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&[1, 2, 3, 4, 5]).unwrap();
    file.sync_all().unwrap();

    let log = IndexLog::open(&path).unwrap();
    let items: Vec<_> = log.records().collect();

    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert!(matches!(items[1], Err(TesseraError::IndexCorruption { offset: 23, .. })));
}

// =============================================================================
// Window Tests
// =============================================================================

#[test]
#[cfg(unix)]
fn test_appends_reuse_mapped_window() {
    let (_temp, path) = setup_temp_log();
    let mut log = IndexLog::open(&path).unwrap();
    log.write_record_at(0, &record(0, 3, &[0, 0])).unwrap();
    let capacity = log.capacity();
    assert!(capacity >= log.len());

    let mut offset = log.len();
    for i in 0..100u64 {
        let rec = record(i, 1, &i.to_le_bytes());
        log.write_record_at(offset, &rec).unwrap();
        offset += rec.size();
    }

    // 101 small records fit in the first window; only the file grew
    assert_eq!(log.capacity(), capacity);
    assert_eq!(log.len(), 22 + 100 * 28);
    log.flush().unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), log.len());
    assert_eq!(log.records().count(), 101);
}

#[test]
fn test_window_outgrown_keeps_records() {
    let (_temp, path) = setup_temp_log();
    let mut log = IndexLog::open(&path).unwrap();
    let big_key = vec![7u8; 40 * 1024];

    log.write_record_at(0, &record(0, 1, &big_key)).unwrap();
    let first_end = log.len();
    log.write_record_at(first_end, &record(1, 1, &big_key)).unwrap();
    log.write_record_at(log.len(), &record(2, 1, &big_key)).unwrap();

    assert!(log.capacity() >= log.len());
    assert_eq!(log.read_record_at(0).unwrap(), record(0, 1, &big_key));
    assert_eq!(log.read_record_at(first_end).unwrap(), record(1, 1, &big_key));
    log.flush().unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), log.len());
}

#[test]
fn test_unmapped_log_rejects_io() {
    let (_temp, path) = setup_temp_log();
    let mut log = IndexLog::open(&path).unwrap();
    log.write_record_at(0, &record(0, 3, &[0, 0])).unwrap();

    log.unmap();

    let in_place = log.write_record_at(0, &record(9, 9, &[0, 0]));
    assert!(matches!(in_place, Err(TesseraError::Storage(_))));

    let mut buf = [0u8; 4];
    assert!(matches!(log.read_at(2, &mut buf), Err(TesseraError::Storage(_))));
    assert!(matches!(log.read_record_at(0), Err(TesseraError::Storage(_))));
    assert!(log.records().next().unwrap().is_err());

    // The failed rewrite left the stored record untouched
    let log = IndexLog::open(&path).unwrap();
    assert_eq!(log.read_record_at(0).unwrap(), record(0, 3, &[0, 0]));
}

#[test]
fn test_append_after_unmap_remaps() {
    let (_temp, path) = setup_temp_log();
    let mut log = IndexLog::open(&path).unwrap();
    log.write_record_at(0, &record(0, 3, &[0, 0])).unwrap();
    log.unmap();

    log.write_record_at(22, &record(3, 4, &[0, 1])).unwrap();

    assert_eq!(log.len(), 44);
    assert_eq!(log.read_record_at(0).unwrap(), record(0, 3, &[0, 0]));
    assert_eq!(log.read_record_at(22).unwrap(), record(3, 4, &[0, 1]));
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_reopen_preserves_records() {
    let (_temp, path) = setup_temp_log();
    {
        let mut log = IndexLog::open(&path).unwrap();
        log.write_record_at(0, &record(10, 20, b"first")).unwrap();
        log.write_record_at(25, &record(30, 40, b"second")).unwrap();
        log.flush().unwrap();
    }

    let log = IndexLog::open(&path).unwrap();

    assert_eq!(log.len(), 51);
    assert_eq!(log.read_record_at(0).unwrap(), record(10, 20, b"first"));
    assert_eq!(log.read_record_at(25).unwrap(), record(30, 40, b"second"));
}
