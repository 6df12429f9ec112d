/// An inclusive byte range `[start, end]` within an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Builds the range covering `len` bytes starting at `start`.
    ///
    /// Returns `None` for an empty range, which has no inclusive form.
    pub fn from_len(start: u64, len: u64) -> Option<Self> {
        if len == 0 {
            return None;
        }
        Some(Self {
            start,
            end: start + len - 1,
        })
    }

    /// Value for the `Content-Range` header of a PUT against an upload session.
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }

    /// Whether this is the range that completes a transfer of `total` bytes.
    pub fn is_final(&self, total: u64) -> bool {
        self.end + 1 == total
    }
}
