use crate::plan::normalize_chunk_size;
use crate::{
    CHUNK_UNIT, DEFAULT_CHUNK_SIZE, DEFAULT_LARGE_FILE_THRESHOLD, MAX_ATTACHMENT_SIZE,
    TransferError,
};

/// How an attachment is transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Single base64 payload in one call.
    Inline,
    /// Byte-range PUTs against an upload session.
    Chunked,
    /// Length not yet known; keep discovering and classify again.
    Pending,
}

/// Size limits that drive classification and chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferLimits {
    threshold: u64,
    chunk_size: u64,
    ceiling: u64,
}

impl Default for TransferLimits {
    fn default() -> Self {
        Self::new(DEFAULT_LARGE_FILE_THRESHOLD, DEFAULT_CHUNK_SIZE)
    }
}

impl TransferLimits {
    /// Creates limits from configured values.
    ///
    /// The chunk size is normalized to a multiple of [`CHUNK_UNIT`]; the
    /// ceiling is always [`MAX_ATTACHMENT_SIZE`].
    pub fn new(threshold: u64, chunk_size: u64) -> Self {
        Self {
            threshold,
            chunk_size: normalize_chunk_size(chunk_size, CHUNK_UNIT),
            ceiling: MAX_ATTACHMENT_SIZE,
        }
    }

    /// Lowers the ceiling. Values above [`MAX_ATTACHMENT_SIZE`] are clamped.
    pub fn with_ceiling(mut self, ceiling: u64) -> Self {
        self.ceiling = ceiling.min(MAX_ATTACHMENT_SIZE);
        self
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }

    /// Classifies a length against these limits.
    pub fn classify(&self, size: Option<u64>) -> Result<Strategy, TransferError> {
        classify(size, self.threshold, self.ceiling)
    }
}

/// Picks the transfer strategy for an attachment of `size` bytes.
///
/// Fails with [`TransferError::TooLarge`] when a known size exceeds `ceiling`.
pub fn classify(size: Option<u64>, threshold: u64, ceiling: u64) -> Result<Strategy, TransferError> {
    match size {
        None => Ok(Strategy::Pending),
        Some(size) => {
            check_ceiling(size, ceiling)?;
            if size <= threshold {
                Ok(Strategy::Inline)
            } else {
                Ok(Strategy::Chunked)
            }
        }
    }
}

/// Fails once `seen` bytes exceed `ceiling`.
pub fn check_ceiling(seen: u64, ceiling: u64) -> Result<(), TransferError> {
    if seen > ceiling {
        return Err(TransferError::TooLarge {
            size: seen,
            limit: ceiling,
        });
    }
    Ok(())
}
