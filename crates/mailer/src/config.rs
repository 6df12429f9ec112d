//! Mailer configuration.

use mailrelay_transfer::{DEFAULT_CHUNK_SIZE, DEFAULT_LARGE_FILE_THRESHOLD, TransferLimits};
use serde::{Deserialize, Serialize};

/// Settings for one configured mailer instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailerConfig {
    /// Shared mailbox messages are sent from (user id or principal name).
    #[serde(default)]
    pub mailbox: String,

    /// Attachments above this many bytes go through an upload session.
    #[serde(default = "default_threshold")]
    pub large_file_threshold: u64,

    /// Requested upload chunk size; rounded down to a multiple of 320 KiB.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Overrides the API root URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_threshold() -> u64 {
    DEFAULT_LARGE_FILE_THRESHOLD
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            mailbox: String::new(),
            large_file_threshold: default_threshold(),
            chunk_size: default_chunk_size(),
            base_url: None,
        }
    }
}

impl MailerConfig {
    pub fn new(mailbox: impl Into<String>) -> Self {
        Self {
            mailbox: mailbox.into(),
            ..Default::default()
        }
    }

    /// Effective limits with the chunk size normalized.
    pub fn limits(&self) -> TransferLimits {
        TransferLimits::new(self.large_file_threshold, self.chunk_size)
    }
}
