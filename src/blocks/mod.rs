//! Block Pool Module
//!
//! The value log: one flat, ever-growing address space carved into
//! fixed-size blocks, each mapped into memory on demand.
//!
//! ## Responsibilities
//! - Grow the `.vdb` file one block at a time
//! - Hand out scoped handles to mapped block windows
//! - Split byte ranges that straddle block boundaries
//!
//! ## Addressing
//! ```text
//!  logical offset ─┐
//!                  ▼
//! ┌──────────────┬──────────────┬──────────────┬────
//! │   block 0    │   block 1    │   block 2    │ ...
//! └──────────────┴──────────────┴──────────────┴────
//!  block_index  = offset / block_size
//!  block_offset = offset % block_size
//! ```
//! A range is transferred block by block: `min(block_size - block_offset,
//! remaining)` bytes into the current block, then the next block from local
//! offset 0, until nothing remains.

mod block;
mod pool;

pub use block::MappedBlock;
pub use pool::{BlockHandle, BlockPool};

/// Split an absolute value-log offset into `(block_index, block_offset)`
#[inline]
pub fn locate(offset: u64, block_size: u64) -> (u64, u64) {
    (offset / block_size, offset % block_size)
}
