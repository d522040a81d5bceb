//! Error types for TesseraKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using TesseraError
pub type Result<T> = std::result::Result<T, TesseraError>;

/// Unified error type for TesseraKV operations
#[derive(Debug, Error)]
pub enum TesseraError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Index Log Errors
    // -------------------------------------------------------------------------
    #[error("Index log corruption at offset {offset}: {reason}")]
    IndexCorruption { offset: u64, reason: String },

    // -------------------------------------------------------------------------
    // Value Log Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Argument Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
