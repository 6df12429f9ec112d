//! Mail sending and retrieval for a shared mailbox.
//!
//! Attachments are transferred inline when small and through upload
//! sessions of sequential byte-range PUTs when large:
//!
//! ```text
//! AttachmentSpec -> AttachmentSource -> TransferLimits::classify
//!     -> inline attach
//!     -> UploadSessionDriver (range PUTs)
//! ```

pub mod attach;
pub mod config;
pub mod error;
pub mod mailer;
pub mod recipients;
pub mod report;
pub mod source;
pub mod upload;
pub mod url_phase;

#[cfg(test)]
mod test_support;

pub use attach::AttachmentOrchestrator;
pub use config::MailerConfig;
pub use error::MailError;
pub use mailer::{Mailer, MailerCell, SendRequest, SentMessage};
pub use recipients::parse_recipients;
pub use report::{ErrorReporter, TracingReporter};
pub use source::{AttachmentSource, AttachmentSpec, ResolvedAttachment};
pub use upload::UploadSessionDriver;
pub use url_phase::UrlPhase;
