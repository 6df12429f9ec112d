//! Size-dependent mechanics of attachment transfer.
//!
//! Decides between inline and chunked transfer, plans chunk-aligned byte
//! ranges, and reads sources in chunk-sized pieces.

mod chunked;
mod classify;
mod plan;
mod types;

pub use chunked::{ChunkAccumulator, FileChunkReader};
pub use classify::{Strategy, TransferLimits, check_ceiling, classify};
pub use plan::{ChunkPlan, Ranges, normalize_chunk_size, plan_ranges};
pub use types::ByteRange;

/// Protocol granularity: every chunk must be a multiple of 320 KiB.
pub const CHUNK_UNIT: u64 = 320 * 1024;

/// Default chunk size: one unit.
pub const DEFAULT_CHUNK_SIZE: u64 = CHUNK_UNIT;

/// Default inline/chunked boundary: 3 MiB.
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 3 * 1024 * 1024;

/// Absolute per-attachment ceiling: 150 MiB. Not configurable.
pub const MAX_ATTACHMENT_SIZE: u64 = 150 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("attachment of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
}
