//! Mailer error types.

use mailrelay_transfer::TransferError;

/// Errors that abort a send or retrieval.
///
/// Unavailable attachment sources (missing file, unsupported URL scheme)
/// are not errors: those attachments are skipped.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("attachment '{name}' is {size} bytes, above the {limit} byte limit")]
    AttachmentTooLarge { name: String, size: u64, limit: u64 },

    #[error("chunk upload failed with HTTP status {status}")]
    ChunkUploadFailed { status: u16 },

    #[error("no recipients")]
    NoRecipients,

    #[error("attachment '{name}' declared {declared} bytes but the source delivered {actual}")]
    LengthMismatch {
        name: String,
        declared: u64,
        actual: u64,
    },

    #[error("download of {url} failed with HTTP status {status}")]
    Download { url: String, status: u16 },

    #[error("mail service error: {0}")]
    Service(#[from] mailrelay_graph::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MailError {
    /// Attaches the attachment name to a transfer-layer error.
    pub(crate) fn transfer(name: &str, err: TransferError) -> Self {
        match err {
            TransferError::Io(e) => Self::Io(e),
            TransferError::TooLarge { size, limit } => Self::AttachmentTooLarge {
                name: name.to_string(),
                size,
                limit,
            },
        }
    }
}
