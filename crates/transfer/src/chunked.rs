use std::path::Path;

use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::TransferError;
use crate::types::ByteRange;

// ---------------------------------------------------------------------------
// FileChunkReader
// ---------------------------------------------------------------------------

/// Reads a local file in fixed-size chunks.
///
/// Every chunk except the last is exactly `chunk_size` bytes, so the
/// emitted ranges line up with [`plan_ranges`](crate::plan_ranges).
pub struct FileChunkReader {
    file: File,
    chunk_size: u64,
    offset: u64,
    file_size: u64,
}

impl FileChunkReader {
    /// Opens `path` for chunked reading.
    pub async fn open(path: &Path, chunk_size: u64) -> Result<Self, TransferError> {
        let file = File::open(path).await?;
        let file_size = file.metadata().await?.len();
        Ok(Self {
            file,
            chunk_size: chunk_size.max(1),
            offset: 0,
            file_size,
        })
    }

    /// Reads the next chunk. Returns `None` at EOF.
    ///
    /// Reads at most the bytes left in the file, so the buffer never
    /// exceeds the file size whatever the chunk size.
    pub async fn next_chunk(&mut self) -> Result<Option<(ByteRange, Vec<u8>)>, TransferError> {
        let remaining = self.file_size.saturating_sub(self.offset);
        let want = self.chunk_size.min(remaining);
        if want == 0 {
            return Ok(None);
        }
        let want = usize::try_from(want).map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::OutOfMemory,
                "chunk does not fit in memory",
            )
        })?;

        let mut buf = vec![0u8; want];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);

        let Some(range) = ByteRange::from_len(self.offset, filled as u64) else {
            return Ok(None);
        };
        self.offset += filled as u64;
        Ok(Some((range, buf)))
    }

    /// Current byte offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// File size reported when the file was opened.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }
}

// ---------------------------------------------------------------------------
// ChunkAccumulator
// ---------------------------------------------------------------------------

/// Collects an incoming byte stream into chunk-aligned buffers.
///
/// Holds at most one partial chunk between calls to
/// [`next_full`](Self::next_full).
#[derive(Debug)]
pub struct ChunkAccumulator {
    chunk_size: usize,
    pending: Vec<u8>,
    offset: u64,
    seen: u64,
}

impl ChunkAccumulator {
    pub fn new(chunk_size: u64) -> Self {
        Self {
            chunk_size: usize::try_from(chunk_size.max(1)).unwrap_or(usize::MAX),
            pending: Vec::new(),
            offset: 0,
            seen: 0,
        }
    }

    /// Appends stream bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        self.seen += bytes.len() as u64;
    }

    /// Peels one full chunk off the front, if buffered.
    pub fn next_full(&mut self) -> Option<(ByteRange, Vec<u8>)> {
        if self.pending.len() < self.chunk_size {
            return None;
        }
        let rest = self.pending.split_off(self.chunk_size);
        let chunk = std::mem::replace(&mut self.pending, rest);
        self.emit(chunk)
    }

    /// Takes whatever remains once the stream has ended.
    pub fn finish(&mut self) -> Option<(ByteRange, Vec<u8>)> {
        let chunk = std::mem::take(&mut self.pending);
        self.emit(chunk)
    }

    /// Total bytes pushed so far.
    pub fn seen(&self) -> u64 {
        self.seen
    }

    /// Bytes buffered but not yet emitted.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    fn emit(&mut self, chunk: Vec<u8>) -> Option<(ByteRange, Vec<u8>)> {
        let range = ByteRange::from_len(self.offset, chunk.len() as u64)?;
        self.offset += chunk.len() as u64;
        Some((range, chunk))
    }
}
