//! Mail-service API client for a shared mailbox.
//!
//! Provides the [`MailService`] trait the mailer is written against and
//! [`GraphClient`], its HTTP implementation.

pub mod client;
pub mod service;
pub mod token;
pub mod types;

pub use client::{Error, GraphClient};
pub use service::{MailService, ServiceFuture};
pub use token::{StaticToken, TokenProvider};
pub use types::{
    AttachmentInfo, AttachmentItem, BodyType, CreatedMessage, DraftMessage, EmailAddress,
    FileAttachment, Importance, ItemBody, Message, Recipient, UploadSession,
};
