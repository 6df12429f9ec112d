use crate::types::ByteRange;

/// Rounds `requested` down to a multiple of `unit`, never below one unit.
pub fn normalize_chunk_size(requested: u64, unit: u64) -> u64 {
    let unit = unit.max(1);
    let multiples = requested / unit;
    if multiples == 0 {
        unit
    } else {
        multiples * unit
    }
}

/// Builds the chunk plan for `total` bytes in pieces of `chunk_size`.
pub fn plan_ranges(total: u64, chunk_size: u64) -> ChunkPlan {
    ChunkPlan::new(total, chunk_size)
}

/// Contiguous ranges covering `[0, total - 1]`; the last may be short.
///
/// The plan is a pure value: every call to [`ranges`](Self::ranges)
/// starts over from offset zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    total: u64,
    chunk_size: u64,
}

impl ChunkPlan {
    /// A `chunk_size` of zero is treated as one byte.
    pub fn new(total: u64, chunk_size: u64) -> Self {
        Self {
            total,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Number of ranges, `ceil(total / chunk_size)`.
    pub fn len(&self) -> u64 {
        self.total.div_ceil(self.chunk_size)
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Lazily yields the ranges in ascending order.
    pub fn ranges(&self) -> Ranges {
        Ranges {
            next: 0,
            total: self.total,
            chunk_size: self.chunk_size,
        }
    }
}

impl IntoIterator for ChunkPlan {
    type Item = ByteRange;
    type IntoIter = Ranges;

    fn into_iter(self) -> Ranges {
        self.ranges()
    }
}

/// Iterator over the ranges of a [`ChunkPlan`].
#[derive(Debug, Clone)]
pub struct Ranges {
    next: u64,
    total: u64,
    chunk_size: u64,
}

impl Iterator for Ranges {
    type Item = ByteRange;

    fn next(&mut self) -> Option<ByteRange> {
        let len = self.chunk_size.min(self.total.saturating_sub(self.next));
        let range = ByteRange::from_len(self.next, len)?;
        self.next += len;
        Some(range)
    }
}
