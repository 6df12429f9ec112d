//! The mail-service seam.
//!
//! [`GraphClient`](crate::GraphClient) implements [`MailService`] over HTTP.
//! Keeping the calls behind a trait lets the attachment logic run against
//! in-memory implementations in tests.

use std::future::Future;
use std::pin::Pin;

use crate::client::Error;
use crate::types::{
    AttachmentInfo, AttachmentItem, CreatedMessage, DraftMessage, FileAttachment, Message,
    UploadSession,
};

/// Boxed future returned by [`MailService`] methods.
pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, Error>> + Send + 'a>>;

/// Operations the mailer needs from the remote mail service.
///
/// No method retries; failures are returned as-is.
pub trait MailService: Send + Sync {
    /// Creates a draft in `mailbox` and returns its identifiers.
    fn create_draft<'a>(
        &'a self,
        mailbox: &'a str,
        draft: &'a DraftMessage,
    ) -> ServiceFuture<'a, CreatedMessage>;

    /// Attaches base64 content to a draft in a single call.
    fn add_attachment<'a>(
        &'a self,
        mailbox: &'a str,
        message_id: &'a str,
        attachment: &'a FileAttachment,
    ) -> ServiceFuture<'a, ()>;

    /// Opens an upload session sized for `item`.
    fn create_upload_session<'a>(
        &'a self,
        mailbox: &'a str,
        message_id: &'a str,
        item: &'a AttachmentItem,
    ) -> ServiceFuture<'a, UploadSession>;

    /// PUTs `data` at byte offset `start` of a `total`-byte upload.
    ///
    /// Returns the HTTP status; deciding which statuses are acceptable is
    /// up to the caller.
    fn put_range<'a>(
        &'a self,
        session: &'a UploadSession,
        start: u64,
        total: u64,
        data: Vec<u8>,
    ) -> ServiceFuture<'a, u16>;

    /// Sends a previously created draft.
    fn send_draft<'a>(&'a self, mailbox: &'a str, message_id: &'a str) -> ServiceFuture<'a, ()>;

    /// Fetches a stored message.
    fn get_message<'a>(&'a self, mailbox: &'a str, message_id: &'a str)
    -> ServiceFuture<'a, Message>;

    /// Lists the attachments of a stored message.
    fn list_attachments<'a>(
        &'a self,
        mailbox: &'a str,
        message_id: &'a str,
    ) -> ServiceFuture<'a, Vec<AttachmentInfo>>;
}
