//! Attachment orchestration: one resolver per source variant.
//!
//! Attachments are processed strictly one after another, and each one's
//! chunks are uploaded one at a time.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures_util::StreamExt;
use mailrelay_graph::{AttachmentItem, FileAttachment, MailService};
use mailrelay_transfer::{
    ChunkAccumulator, FileChunkReader, Strategy, TransferLimits, check_ceiling,
};
use reqwest::Url;
use reqwest::header::{CONTENT_LENGTH, HeaderMap};
use tracing::{debug, info, warn};

use crate::error::MailError;
use crate::source::{AttachmentSource, AttachmentSpec, ResolvedAttachment};
use crate::upload::UploadSessionDriver;
use crate::url_phase::UrlPhase;

/// Attaches files to a draft, inline or through upload sessions by size.
pub struct AttachmentOrchestrator<'a> {
    service: &'a dyn MailService,
    http: &'a reqwest::Client,
    mailbox: &'a str,
    limits: TransferLimits,
}

impl<'a> AttachmentOrchestrator<'a> {
    pub fn new(
        service: &'a dyn MailService,
        http: &'a reqwest::Client,
        mailbox: &'a str,
        limits: TransferLimits,
    ) -> Self {
        Self {
            service,
            http,
            mailbox,
            limits,
        }
    }

    /// Attaches every spec in order and returns how many were attached.
    ///
    /// Specs without a usable source are skipped. The first error aborts
    /// the remaining attachments.
    pub async fn attach_all(
        &self,
        message_id: &str,
        specs: Vec<AttachmentSpec>,
    ) -> Result<usize, MailError> {
        let mut attached = 0;
        for spec in specs {
            if self.attach(message_id, spec).await? {
                attached += 1;
            }
        }
        Ok(attached)
    }

    /// Attaches one spec. Returns `false` when it was skipped.
    pub async fn attach(&self, message_id: &str, spec: AttachmentSpec) -> Result<bool, MailError> {
        let Some((source, resolved)) = spec.resolve() else {
            debug!("attachment has no data source, skipping");
            return Ok(false);
        };

        match source {
            AttachmentSource::Buffer(bytes) => {
                self.attach_buffer(message_id, resolved, bytes).await?;
                Ok(true)
            }
            AttachmentSource::Path(path) => self.attach_path(message_id, resolved, &path).await,
            AttachmentSource::Url(href) => self.attach_url(message_id, resolved, &href).await,
        }
    }

    // -----------------------------------------------------------------------
    // Buffer
    // -----------------------------------------------------------------------

    async fn attach_buffer(
        &self,
        message_id: &str,
        resolved: ResolvedAttachment,
        bytes: Vec<u8>,
    ) -> Result<(), MailError> {
        let size = bytes.len() as u64;
        match self.classify(&resolved.filename, Some(size))? {
            Strategy::Inline => self.attach_inline(message_id, &resolved, &bytes).await,
            Strategy::Chunked | Strategy::Pending => {
                let mut driver = self.open_session(message_id, &resolved, size).await?;
                driver.put_all(&bytes, self.limits.chunk_size()).await?;
                driver.finish()
            }
        }
    }

    // -----------------------------------------------------------------------
    // Path
    // -----------------------------------------------------------------------

    async fn attach_path(
        &self,
        message_id: &str,
        resolved: ResolvedAttachment,
        path: &Path,
    ) -> Result<bool, MailError> {
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "attachment path unavailable, skipping");
                return Ok(false);
            }
        };
        if !meta.is_file() || meta.len() == 0 {
            debug!(path = %path.display(), "attachment path is not a non-empty file, skipping");
            return Ok(false);
        }

        let size = meta.len();
        let resolved = resolved.with_size(size);
        match self.classify(&resolved.filename, Some(size))? {
            Strategy::Inline => {
                let bytes = tokio::fs::read(path).await?;
                self.attach_inline(message_id, &resolved, &bytes).await?;
            }
            Strategy::Chunked | Strategy::Pending => {
                let mut driver = self.open_session(message_id, &resolved, size).await?;
                let mut reader = FileChunkReader::open(path, self.limits.chunk_size())
                    .await
                    .map_err(|e| MailError::transfer(&resolved.filename, e))?;
                while let Some((_, chunk)) = reader
                    .next_chunk()
                    .await
                    .map_err(|e| MailError::transfer(&resolved.filename, e))?
                {
                    driver.put_next(chunk).await?;
                }
                driver.finish()?;
            }
        }
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // URL
    // -----------------------------------------------------------------------

    async fn attach_url(
        &self,
        message_id: &str,
        resolved: ResolvedAttachment,
        href: &str,
    ) -> Result<bool, MailError> {
        let url = match Url::parse(href) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => {
                debug!(href, "attachment URL is not http(s), skipping");
                return Ok(false);
            }
        };
        let name = resolved.filename.clone();
        let to_mail_error = |e| MailError::transfer(&name, e);

        let mut phase = UrlPhase::Unknown.begin();
        let probed = self.probe_length(&url).await;
        phase = phase
            .after_probe(probed, &self.limits)
            .map_err(to_mail_error)?;

        let resp = self.http.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(MailError::Download {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        phase = phase
            .after_response(header_length(resp.headers()), &self.limits)
            .map_err(to_mail_error)?;
        debug!(%url, ?phase, "url attachment length resolved");

        match phase {
            UrlPhase::KnownLarge(len) => {
                self.stream_to_session(message_id, &resolved, len, resp)
                    .await?;
            }
            _ => {
                let bytes = self.buffer_body(&name, resp).await?;
                if bytes.is_empty() {
                    debug!(%url, "url attachment is empty, skipping");
                    return Ok(false);
                }
                self.attach_buffer(message_id, resolved, bytes).await?;
            }
        }

        debug!(%url, phase = ?phase.finish(), "url attachment transferred");
        Ok(true)
    }

    /// Asks the server for the length without downloading. Failures only
    /// leave the length unknown.
    async fn probe_length(&self, url: &Url) -> Option<u64> {
        match self.http.head(url.clone()).send().await {
            Ok(resp) if resp.status().is_success() => header_length(resp.headers()),
            Ok(resp) => {
                warn!(%url, status = resp.status().as_u16(), "length probe rejected");
                None
            }
            Err(e) => {
                warn!(%url, error = %e, "length probe failed");
                None
            }
        }
    }

    /// Reads the whole body, failing as soon as it crosses the ceiling.
    async fn buffer_body(&self, name: &str, resp: reqwest::Response) -> Result<Vec<u8>, MailError> {
        let mut body = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(bytes) = stream.next().await {
            let bytes = bytes?;
            check_ceiling((body.len() + bytes.len()) as u64, self.limits.ceiling())
                .map_err(|e| MailError::transfer(name, e))?;
            body.extend_from_slice(&bytes);
        }
        Ok(body)
    }

    /// Feeds the body into an upload session one full chunk at a time.
    async fn stream_to_session(
        &self,
        message_id: &str,
        resolved: &ResolvedAttachment,
        len: u64,
        resp: reqwest::Response,
    ) -> Result<(), MailError> {
        let mut driver = self.open_session(message_id, resolved, len).await?;
        let mut pending = ChunkAccumulator::new(self.limits.chunk_size());
        let mut stream = resp.bytes_stream();

        while let Some(bytes) = stream.next().await {
            pending.push(&bytes?);
            check_ceiling(pending.seen(), self.limits.ceiling())
                .map_err(|e| MailError::transfer(&resolved.filename, e))?;
            while let Some((_, chunk)) = pending.next_full() {
                driver.put_next(chunk).await?;
            }
        }
        if let Some((_, rest)) = pending.finish() {
            driver.put_next(rest).await?;
        }
        driver.finish()
    }

    // -----------------------------------------------------------------------
    // Shared steps
    // -----------------------------------------------------------------------

    fn classify(&self, name: &str, size: Option<u64>) -> Result<Strategy, MailError> {
        self.limits
            .classify(size)
            .map_err(|e| MailError::transfer(name, e))
    }

    async fn attach_inline(
        &self,
        message_id: &str,
        resolved: &ResolvedAttachment,
        bytes: &[u8],
    ) -> Result<(), MailError> {
        let attachment = FileAttachment::new(
            resolved.filename.as_str(),
            resolved.content_type.as_str(),
            STANDARD.encode(bytes),
        );
        self.service
            .add_attachment(self.mailbox, message_id, &attachment)
            .await?;
        info!(name = %resolved.filename, size = bytes.len(), "attached inline");
        Ok(())
    }

    async fn open_session(
        &self,
        message_id: &str,
        resolved: &ResolvedAttachment,
        size: u64,
    ) -> Result<UploadSessionDriver<'a>, MailError> {
        let item = AttachmentItem::file(
            resolved.filename.as_str(),
            size,
            resolved.content_type.as_str(),
        );
        UploadSessionDriver::create(self.service, self.mailbox, message_id, &item).await
    }
}

/// Parses the `Content-Length` header.
///
/// Read from the headers directly: the body size hint of a HEAD response
/// is always zero.
fn header_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
