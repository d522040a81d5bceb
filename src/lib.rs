//! # TesseraKV
//!
//! An embedded, append-only key-value engine with:
//! - A memory-mapped index log of fixed-plus-variable records
//! - A block-addressed, memory-mapped value log
//! - Crash recovery by a single sequential scan of the index log
//! - Lock-free reads and concurrent value writes
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                             │
//! │              put / get / flush / close                      │
//! └──────────┬──────────────────┬───────────────────┬───────────┘
//!            │                  │                   │
//!            ▼                  ▼                   ▼
//!   ┌─────────────────┐ ┌──────────────┐  ┌──────────────────┐
//!   │    Index Log    │ │   KeyDir     │  │   Block Pool     │
//!   │  (.vidx, mmap)  │ │  (DashMap)   │  │  (.vdb, mmap     │
//!   │  write lock     │ │  lock-free   │  │   per block)     │
//!   └────────┬────────┘ └──────▲───────┘  └──────────────────┘
//!            │                 │
//!            └── recovery ─────┘
//!                  scan
//! ```
//!
//! Keys and values are opaque bytes. Overwritten values stay in the value
//! log; there is no compaction and no delete.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod blocks;
pub mod index;
pub mod keydir;
pub mod engine;

pub mod cleanup;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, TesseraError};
pub use config::Config;
pub use engine::Engine;
pub use keydir::IndexEntry;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of TesseraKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
