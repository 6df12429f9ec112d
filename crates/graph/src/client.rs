//! Mail-service API client.
//!
//! Async HTTP client using `reqwest` with Bearer token authentication.

use std::sync::Arc;

use mailrelay_transfer::ByteRange;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::Method;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::service::{MailService, ServiceFuture};
use crate::token::TokenProvider;
use crate::types::{
    AttachmentInfo, AttachmentItem, CreatedMessage, DraftMessage, FileAttachment, ListResponse,
    Message, UploadSession, UploadSessionRequest,
};

const DEFAULT_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Characters escaped in a single path segment (mailbox or message id).
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Errors from the mail-service client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("token error: {0}")]
    Token(String),
}

/// Mail-service API client.
///
/// Cheap to share behind an `Arc`; the underlying connection pools and the
/// token provider are safe for concurrent use.
pub struct GraphClient {
    http: reqwest::Client,
    /// Upload URLs are pre-authorized and must not carry the bearer token.
    upload_http: reqwest::Client,
    base_url: String,
    token: Arc<dyn TokenProvider>,
}

impl GraphClient {
    /// Creates a new client that authenticates with `token`.
    pub fn new(token: Arc<dyn TokenProvider>) -> Result<Self, Error> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            upload_http: reqwest::Client::builder().build()?,
            base_url: DEFAULT_BASE_URL.to_string(),
            token,
        })
    }

    /// Points the client at a different API root.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn message_path(mailbox: &str, message_id: &str) -> String {
        format!(
            "/users/{}/messages/{}",
            utf8_percent_encode(mailbox, SEGMENT),
            utf8_percent_encode(message_id, SEGMENT)
        )
    }

    /// Performs an authenticated request and returns the raw response body.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, Error> {
        let url = format!("{}{}", self.base_url, path);
        let token = self.token.token().await?;

        let mut req = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(token)
            .header("client-request-id", uuid::Uuid::new_v4().to_string());
        if let Some(body) = body {
            req = req.header(CONTENT_TYPE, "application/json").body(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        debug!(%method, path, status = status.as_u16(), "mail API call");

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.bytes().await?.to_vec())
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T, Error> {
        let bytes = self.request(method, path, body).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl MailService for GraphClient {
    fn create_draft<'a>(
        &'a self,
        mailbox: &'a str,
        draft: &'a DraftMessage,
    ) -> ServiceFuture<'a, CreatedMessage> {
        Box::pin(async move {
            let path = format!("/users/{}/messages", utf8_percent_encode(mailbox, SEGMENT));
            let body = serde_json::to_vec(draft)?;
            self.request_json(Method::POST, &path, Some(body)).await
        })
    }

    fn add_attachment<'a>(
        &'a self,
        mailbox: &'a str,
        message_id: &'a str,
        attachment: &'a FileAttachment,
    ) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            let path = format!("{}/attachments", Self::message_path(mailbox, message_id));
            let body = serde_json::to_vec(attachment)?;
            self.request(Method::POST, &path, Some(body)).await?;
            Ok(())
        })
    }

    fn create_upload_session<'a>(
        &'a self,
        mailbox: &'a str,
        message_id: &'a str,
        item: &'a AttachmentItem,
    ) -> ServiceFuture<'a, UploadSession> {
        Box::pin(async move {
            let path = format!(
                "{}/attachments/createUploadSession",
                Self::message_path(mailbox, message_id)
            );
            let body = serde_json::to_vec(&UploadSessionRequest {
                attachment_item: item,
            })?;
            self.request_json(Method::POST, &path, Some(body)).await
        })
    }

    fn put_range<'a>(
        &'a self,
        session: &'a UploadSession,
        start: u64,
        total: u64,
        data: Vec<u8>,
    ) -> ServiceFuture<'a, u16> {
        Box::pin(async move {
            let len = data.len() as u64;
            let content_range = match ByteRange::from_len(start, len) {
                Some(range) => range.content_range(total),
                None => format!("bytes */{total}"),
            };

            let resp = self
                .upload_http
                .put(&session.upload_url)
                .header(CONTENT_LENGTH, len)
                .header(CONTENT_RANGE, &content_range)
                .body(data)
                .send()
                .await?;
            let status = resp.status().as_u16();
            debug!(content_range = %content_range, status, "range PUT");
            Ok(status)
        })
    }

    fn send_draft<'a>(&'a self, mailbox: &'a str, message_id: &'a str) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            let path = format!("{}/send", Self::message_path(mailbox, message_id));
            self.request(Method::POST, &path, None).await?;
            Ok(())
        })
    }

    fn get_message<'a>(
        &'a self,
        mailbox: &'a str,
        message_id: &'a str,
    ) -> ServiceFuture<'a, Message> {
        Box::pin(async move {
            let path = Self::message_path(mailbox, message_id);
            self.request_json(Method::GET, &path, None).await
        })
    }

    fn list_attachments<'a>(
        &'a self,
        mailbox: &'a str,
        message_id: &'a str,
    ) -> ServiceFuture<'a, Vec<AttachmentInfo>> {
        Box::pin(async move {
            let path = format!("{}/attachments", Self::message_path(mailbox, message_id));
            let resp: ListResponse<AttachmentInfo> =
                self.request_json(Method::GET, &path, None).await?;
            Ok(resp.value)
        })
    }
}
