//! Sequential range uploads against one upload session.

use mailrelay_graph::{AttachmentItem, MailService, UploadSession};
use mailrelay_transfer::ByteRange;
use tracing::{debug, info};

use crate::error::MailError;

/// Statuses a range PUT may return: 202 intermediate, 201 final, 200 ok.
pub const ACCEPTED_RANGE_STATUSES: [u16; 3] = [202, 201, 200];

/// Drives one chunked attachment transfer.
///
/// Ranges are sent one at a time in ascending order, each starting where
/// the previous ended. The first rejected PUT ends the transfer.
pub struct UploadSessionDriver<'a> {
    service: &'a dyn MailService,
    session: UploadSession,
    name: String,
    total: u64,
    offset: u64,
}

impl<'a> UploadSessionDriver<'a> {
    /// Opens an upload session for `item` on a draft message.
    pub async fn create(
        service: &'a dyn MailService,
        mailbox: &str,
        message_id: &str,
        item: &AttachmentItem,
    ) -> Result<Self, MailError> {
        let session = service
            .create_upload_session(mailbox, message_id, item)
            .await?;
        info!(name = %item.name, size = item.size, "upload session created");
        Ok(Self {
            service,
            session,
            name: item.name.clone(),
            total: item.size,
            offset: 0,
        })
    }

    /// Uploads the next contiguous range. Empty data sends nothing.
    pub async fn put_next(&mut self, data: Vec<u8>) -> Result<Option<ByteRange>, MailError> {
        let Some(range) = ByteRange::from_len(self.offset, data.len() as u64) else {
            return Ok(None);
        };
        if range.end >= self.total {
            return Err(MailError::LengthMismatch {
                name: self.name.clone(),
                declared: self.total,
                actual: range.end + 1,
            });
        }

        let status = self
            .service
            .put_range(&self.session, range.start, self.total, data)
            .await?;
        if !ACCEPTED_RANGE_STATUSES.contains(&status) {
            return Err(MailError::ChunkUploadFailed { status });
        }

        debug!(
            name = %self.name,
            start = range.start,
            end = range.end,
            total = self.total,
            last = range.is_final(self.total),
            status,
            "chunk uploaded"
        );
        self.offset = range.end + 1;
        Ok(Some(range))
    }

    /// Uploads an in-memory buffer range by range.
    pub async fn put_all(&mut self, data: &[u8], chunk_size: u64) -> Result<(), MailError> {
        for range in mailrelay_transfer::plan_ranges(data.len() as u64, chunk_size) {
            let chunk = data[range.start as usize..=range.end as usize].to_vec();
            self.put_next(chunk).await?;
        }
        Ok(())
    }

    /// Bytes accepted so far.
    pub fn uploaded(&self) -> u64 {
        self.offset
    }

    pub fn is_complete(&self) -> bool {
        self.offset == self.total
    }

    /// Checks that the declared total was covered.
    pub fn finish(self) -> Result<(), MailError> {
        if !self.is_complete() {
            return Err(MailError::LengthMismatch {
                name: self.name,
                declared: self.total,
                actual: self.offset,
            });
        }
        info!(name = %self.name, size = self.total, "chunked upload complete");
        Ok(())
    }
}
