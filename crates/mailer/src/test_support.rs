//! Test doubles: an in-memory mail service and a mock download server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use mailrelay_graph::{
    AttachmentInfo, AttachmentItem, CreatedMessage, DraftMessage, Error, FileAttachment,
    MailService, Message, ServiceFuture, UploadSession,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// A recorded service call (range PUTs are recorded separately).
#[derive(Debug, Clone)]
pub enum Call {
    CreateDraft {
        mailbox: String,
        draft: DraftMessage,
    },
    AddAttachment {
        message_id: String,
        attachment: FileAttachment,
    },
    CreateSession {
        message_id: String,
        name: String,
        size: u64,
        content_type: String,
    },
    SendDraft {
        message_id: String,
    },
    GetMessage {
        message_id: String,
    },
    ListAttachments {
        message_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct PutRecord {
    pub start: u64,
    pub len: u64,
    pub total: u64,
    pub data: Vec<u8>,
}

/// Records every call and answers with canned data.
#[derive(Default)]
pub struct FakeService {
    calls: Mutex<Vec<Call>>,
    puts: Mutex<Vec<PutRecord>>,
    put_statuses: Mutex<VecDeque<u16>>,
    attachments: Vec<AttachmentInfo>,
    fail_send: bool,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statuses returned by successive PUTs; defaults apply once exhausted.
    pub fn with_put_statuses(self, statuses: Vec<u16>) -> Self {
        *self.put_statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<AttachmentInfo>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Makes `send_draft` answer with an API error.
    pub fn failing_send(mut self) -> Self {
        self.fail_send = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn puts(&self) -> Vec<PutRecord> {
        self.puts.lock().unwrap().clone()
    }

    pub fn inline_attachments(&self) -> Vec<FileAttachment> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::AddAttachment { attachment, .. } => Some(attachment),
                _ => None,
            })
            .collect()
    }

    pub fn sessions(&self) -> Vec<(String, u64)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CreateSession { name, size, .. } => Some((name, size)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl MailService for FakeService {
    fn create_draft<'a>(
        &'a self,
        mailbox: &'a str,
        draft: &'a DraftMessage,
    ) -> ServiceFuture<'a, CreatedMessage> {
        Box::pin(async move {
            self.record(Call::CreateDraft {
                mailbox: mailbox.to_string(),
                draft: draft.clone(),
            });
            Ok(CreatedMessage {
                id: "draft-1".into(),
                internet_message_id: "<draft-1@ex.com>".into(),
            })
        })
    }

    fn add_attachment<'a>(
        &'a self,
        _mailbox: &'a str,
        message_id: &'a str,
        attachment: &'a FileAttachment,
    ) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            self.record(Call::AddAttachment {
                message_id: message_id.to_string(),
                attachment: attachment.clone(),
            });
            Ok(())
        })
    }

    fn create_upload_session<'a>(
        &'a self,
        _mailbox: &'a str,
        message_id: &'a str,
        item: &'a AttachmentItem,
    ) -> ServiceFuture<'a, UploadSession> {
        Box::pin(async move {
            self.record(Call::CreateSession {
                message_id: message_id.to_string(),
                name: item.name.clone(),
                size: item.size,
                content_type: item.content_type.clone(),
            });
            Ok(UploadSession {
                upload_url: format!("https://upload.example/{}", item.name),
                expiration_date_time: None,
            })
        })
    }

    fn put_range<'a>(
        &'a self,
        _session: &'a UploadSession,
        start: u64,
        total: u64,
        data: Vec<u8>,
    ) -> ServiceFuture<'a, u16> {
        Box::pin(async move {
            let len = data.len() as u64;
            self.puts.lock().unwrap().push(PutRecord {
                start,
                len,
                total,
                data,
            });
            let queued = self.put_statuses.lock().unwrap().pop_front();
            Ok(queued.unwrap_or(if start + len == total { 201 } else { 202 }))
        })
    }

    fn send_draft<'a>(&'a self, _mailbox: &'a str, message_id: &'a str) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            self.record(Call::SendDraft {
                message_id: message_id.to_string(),
            });
            if self.fail_send {
                return Err(Error::Api {
                    status: 429,
                    body: "throttled".into(),
                });
            }
            Ok(())
        })
    }

    fn get_message<'a>(
        &'a self,
        _mailbox: &'a str,
        message_id: &'a str,
    ) -> ServiceFuture<'a, Message> {
        Box::pin(async move {
            self.record(Call::GetMessage {
                message_id: message_id.to_string(),
            });
            Ok(Message {
                id: message_id.to_string(),
                internet_message_id: format!("<{message_id}@ex.com>"),
                has_attachments: !self.attachments.is_empty(),
                ..Default::default()
            })
        })
    }

    fn list_attachments<'a>(
        &'a self,
        _mailbox: &'a str,
        message_id: &'a str,
    ) -> ServiceFuture<'a, Vec<AttachmentInfo>> {
        Box::pin(async move {
            self.record(Call::ListAttachments {
                message_id: message_id.to_string(),
            });
            Ok(self.attachments.clone())
        })
    }
}

/// Canned answer for one HTTP method.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    /// Value of the `Content-Length` header; `None` omits it and the body
    /// is delimited by connection close.
    pub content_length: Option<u64>,
    pub body: Vec<u8>,
}

impl MockResponse {
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_length: Some(body.len() as u64),
            body,
        }
    }

    pub fn ok_unsized(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_length: None,
            body,
        }
    }

    /// A HEAD answer advertising `length` bytes.
    pub fn head(length: u64) -> Self {
        Self {
            status: 200,
            content_length: Some(length),
            body: Vec::new(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_length: Some(0),
            body: Vec::new(),
        }
    }
}

/// Mock download server answering HEAD and GET on any path.
pub struct MockHttp {
    pub url: String,
    methods: Arc<Mutex<Vec<String>>>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockHttp {
    pub async fn start(head: MockResponse, get: MockResponse) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}");
        let methods = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&methods);
        let handle = tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut raw = Vec::new();
                let mut buf = vec![0u8; 4096];
                while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut buf).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    raw.extend_from_slice(&buf[..n]);
                }
                let text = String::from_utf8_lossy(&raw);
                let method = text.split_whitespace().next().unwrap_or("").to_string();
                seen.lock().unwrap().push(method.clone());

                let resp = if method == "HEAD" { &head } else { &get };
                let mut out = format!("HTTP/1.1 {} Status\r\n", resp.status);
                if let Some(len) = resp.content_length {
                    out.push_str(&format!("Content-Length: {len}\r\n"));
                }
                out.push_str("Connection: close\r\n\r\n");

                let _ = stream.write_all(out.as_bytes()).await;
                if method != "HEAD" {
                    let _ = stream.write_all(&resp.body).await;
                }
                let _ = stream.shutdown().await;
            }
        });

        Self {
            url,
            methods,
            handle,
        }
    }

    /// Methods of the requests received so far, in order.
    pub fn methods(&self) -> Vec<String> {
        self.methods.lock().unwrap().clone()
    }
}

impl Drop for MockHttp {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
