//! Send and retrieve operations for one configured mailbox.

use std::future::Future;
use std::sync::Arc;

use mailrelay_graph::{
    BodyType, DraftMessage, GraphClient, Importance, ItemBody, MailService, Message,
    TokenProvider,
};
use mailrelay_transfer::TransferLimits;
use tokio::sync::OnceCell;
use tracing::info;

use crate::attach::AttachmentOrchestrator;
use crate::config::MailerConfig;
use crate::error::MailError;
use crate::recipients::parse_recipients;
use crate::report::{ErrorReporter, TracingReporter};
use crate::source::AttachmentSpec;

/// A message to send.
///
/// Recipient fields are `;`/`,`-separated lists. Only `to` is required.
#[derive(Debug, Clone, Default)]
pub struct SendRequest {
    pub to: String,
    pub cc: String,
    pub bcc: String,
    pub reply_to: String,
    pub subject: String,
    pub body: String,
    pub body_type: BodyType,
    pub importance: Option<Importance>,
    pub attachments: Vec<AttachmentSpec>,
}

/// Identifiers of a sent message.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    pub id: String,
    pub internet_message_id: String,
}

/// Sends and retrieves mail as one shared mailbox.
pub struct Mailer {
    service: Arc<dyn MailService>,
    http: reqwest::Client,
    config: MailerConfig,
    limits: TransferLimits,
    reporter: Arc<dyn ErrorReporter>,
}

impl Mailer {
    pub fn new(service: Arc<dyn MailService>, config: MailerConfig) -> Result<Self, MailError> {
        Ok(Self {
            service,
            http: reqwest::Client::builder().build()?,
            limits: config.limits(),
            config,
            reporter: Arc::new(TracingReporter),
        })
    }

    /// Builds a mailer backed by [`GraphClient`].
    pub fn graph(config: MailerConfig, token: Arc<dyn TokenProvider>) -> Result<Self, MailError> {
        let mut client = GraphClient::new(token)?;
        if let Some(url) = &config.base_url {
            client = client.with_base_url(url.as_str());
        }
        Self::new(Arc::new(client), config)
    }

    /// Replaces the failure reporting hook.
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &MailerConfig {
        &self.config
    }

    /// Creates a draft, attaches everything, then sends it.
    ///
    /// Any failure is passed to the reporter once and then returned.
    pub async fn send(&self, request: SendRequest) -> Result<SentMessage, MailError> {
        let result = self.try_send(request).await;
        if let Err(e) = &result {
            self.reporter.report("send", e);
        }
        result
    }

    async fn try_send(&self, request: SendRequest) -> Result<SentMessage, MailError> {
        let to_recipients = parse_recipients(&request.to);
        if to_recipients.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let draft = DraftMessage {
            subject: request.subject,
            body: ItemBody {
                content_type: request.body_type,
                content: request.body,
            },
            to_recipients,
            cc_recipients: parse_recipients(&request.cc),
            bcc_recipients: parse_recipients(&request.bcc),
            reply_to: parse_recipients(&request.reply_to),
            importance: request.importance,
        };

        let mailbox = self.config.mailbox.as_str();
        let created = self.service.create_draft(mailbox, &draft).await?;
        info!(message_id = %created.id, "draft created");

        let attached =
            AttachmentOrchestrator::new(self.service.as_ref(), &self.http, mailbox, self.limits)
                .attach_all(&created.id, request.attachments)
                .await?;

        self.service.send_draft(mailbox, &created.id).await?;
        info!(
            message_id = %created.id,
            recipients = draft.to_recipients.len(),
            attachments = attached,
            "message sent"
        );

        Ok(SentMessage {
            id: created.id,
            internet_message_id: created.internet_message_id,
        })
    }

    /// Fetches a message; attachments are listed only when requested.
    pub async fn get_message(
        &self,
        message_id: &str,
        include_attachments: bool,
    ) -> Result<Message, MailError> {
        let result = self.try_get_message(message_id, include_attachments).await;
        if let Err(e) = &result {
            self.reporter.report("get_message", e);
        }
        result
    }

    async fn try_get_message(
        &self,
        message_id: &str,
        include_attachments: bool,
    ) -> Result<Message, MailError> {
        let mailbox = self.config.mailbox.as_str();
        let mut message = self.service.get_message(mailbox, message_id).await?;
        if include_attachments {
            let attachments = self.service.list_attachments(mailbox, message_id).await?;
            message.attachments = Some(attachments);
        }
        Ok(message)
    }
}

/// Shared, once-initialized mailer handle.
///
/// The first successful initializer wins; later calls get the same
/// instance and never run their initializer.
#[derive(Default)]
pub struct MailerCell {
    inner: OnceCell<Arc<Mailer>>,
}

impl MailerCell {
    pub const fn new() -> Self {
        Self {
            inner: OnceCell::const_new(),
        }
    }

    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<Arc<Mailer>, MailError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Mailer, MailError>>,
    {
        self.inner
            .get_or_try_init(|| async move { init().await.map(Arc::new) })
            .await
            .cloned()
    }

    pub fn get(&self) -> Option<Arc<Mailer>> {
        self.inner.get().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Call, FakeService};
    use mailrelay_graph::AttachmentInfo;
    use mailrelay_transfer::MAX_ATTACHMENT_SIZE;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn mailer(service: Arc<FakeService>) -> Mailer {
        Mailer::new(service, MailerConfig::new("shared@ex.com")).unwrap()
    }

    fn recording_reporter() -> (Arc<Mutex<Vec<String>>>, Arc<dyn ErrorReporter>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = move |op: &str, err: &MailError| {
            sink.lock().unwrap().push(format!("{op}: {err}"));
        };
        (seen, Arc::new(reporter))
    }

    #[tokio::test]
    async fn send_creates_attaches_and_sends() {
        let service = Arc::new(FakeService::new());
        let mailer = mailer(Arc::clone(&service));

        let sent = mailer
            .send(SendRequest {
                to: "a@ex.com; b@ex.com, a@ex.com".into(),
                cc: "Ops Team <ops@ex.com>".into(),
                subject: "Report".into(),
                body: "<p>attached</p>".into(),
                body_type: BodyType::Html,
                importance: Some(Importance::High),
                attachments: vec![AttachmentSpec::from_bytes("r.csv", b"a,b".to_vec())],
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(sent.id, "draft-1");
        assert_eq!(sent.internet_message_id, "<draft-1@ex.com>");

        let calls = service.calls();
        assert_eq!(calls.len(), 3);
        let Call::CreateDraft { mailbox, draft } = &calls[0] else {
            panic!("expected draft creation first, got {:?}", calls[0]);
        };
        assert_eq!(mailbox, "shared@ex.com");
        let to: Vec<&str> = draft.to_recipients.iter().map(|r| r.address()).collect();
        assert_eq!(to, vec!["a@ex.com", "b@ex.com"]);
        assert_eq!(draft.cc_recipients[0].email_address.name.as_deref(), Some("Ops Team"));
        assert!(draft.bcc_recipients.is_empty());
        assert_eq!(draft.body.content_type, BodyType::Html);
        assert_eq!(draft.importance, Some(Importance::High));

        assert!(matches!(&calls[1], Call::AddAttachment { message_id, .. } if message_id == "draft-1"));
        assert!(matches!(&calls[2], Call::SendDraft { message_id } if message_id == "draft-1"));
    }

    #[tokio::test]
    async fn missing_attachment_does_not_block_send() {
        let service = Arc::new(FakeService::new());
        let mailer = mailer(Arc::clone(&service));

        mailer
            .send(SendRequest {
                to: "a@ex.com".into(),
                attachments: vec![AttachmentSpec::from_path("/nonexistent/mailrelay/x.pdf")],
                ..Default::default()
            })
            .await
            .unwrap();

        let calls = service.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[1], Call::SendDraft { .. }));
    }

    #[tokio::test]
    async fn empty_to_reports_no_recipients_once() {
        let service = Arc::new(FakeService::new());
        let (seen, reporter) = recording_reporter();
        let mailer = mailer(Arc::clone(&service)).with_reporter(reporter);

        let err = mailer
            .send(SendRequest {
                to: " ; , ".into(),
                cc: "c@ex.com".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, MailError::NoRecipients));
        assert_eq!(*seen.lock().unwrap(), vec!["send: no recipients"]);
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_send_reported_once() {
        let service = Arc::new(FakeService::new().failing_send());
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let mailer = mailer(service).with_reporter(Arc::new(move |_: &str, _: &MailError| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let err = mailer
            .send(SendRequest {
                to: "a@ex.com".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MailError::Service(mailrelay_graph::Error::Api { status: 429, .. })
        ));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn oversized_attachment_aborts_before_send() {
        let service = Arc::new(FakeService::new());
        let (seen, reporter) = recording_reporter();
        let mailer = mailer(Arc::clone(&service)).with_reporter(reporter);

        let err = mailer
            .send(SendRequest {
                to: "a@ex.com".into(),
                attachments: vec![AttachmentSpec::from_bytes(
                    "huge.bin",
                    vec![0u8; (MAX_ATTACHMENT_SIZE + 1) as usize],
                )],
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, MailError::AttachmentTooLarge { .. }));
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(
            !service
                .calls()
                .iter()
                .any(|c| matches!(c, Call::SendDraft { .. }))
        );
    }

    fn listed() -> Vec<AttachmentInfo> {
        vec![AttachmentInfo {
            id: "att-1".into(),
            name: "r.csv".into(),
            content_type: Some("text/csv".into()),
            size: 3,
            is_inline: false,
            content_bytes: None,
        }]
    }

    #[tokio::test]
    async fn get_message_with_attachments_lists_them() {
        let service = Arc::new(FakeService::new().with_attachments(listed()));
        let mailer = mailer(Arc::clone(&service));

        let message = mailer.get_message("msg-9", true).await.unwrap();
        assert_eq!(message.id, "msg-9");
        assert_eq!(message.attachments, Some(listed()));

        let calls = service.calls();
        assert!(matches!(&calls[0], Call::GetMessage { message_id } if message_id == "msg-9"));
        assert!(matches!(&calls[1], Call::ListAttachments { message_id } if message_id == "msg-9"));
    }

    #[tokio::test]
    async fn get_message_without_attachments_skips_listing() {
        let service = Arc::new(FakeService::new().with_attachments(listed()));
        let mailer = mailer(Arc::clone(&service));

        let message = mailer.get_message("msg-9", false).await.unwrap();
        assert!(message.attachments.is_none());
        assert_eq!(service.calls().len(), 1);
    }

    #[tokio::test]
    async fn cell_first_init_wins() {
        let cell = MailerCell::new();
        assert!(cell.get().is_none());

        let first = cell
            .get_or_try_init(|| async {
                Mailer::new(Arc::new(FakeService::new()), MailerConfig::new("first@ex.com"))
            })
            .await
            .unwrap();

        let calls = AtomicUsize::new(0);
        let second = cell
            .get_or_try_init(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Mailer::new(Arc::new(FakeService::new()), MailerConfig::new("second@ex.com"))
            })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.config().mailbox, "first@ex.com");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cell_failed_init_leaves_it_empty() {
        let cell = MailerCell::new();
        let err = cell
            .get_or_try_init(|| async { Err(MailError::NoRecipients) })
            .await
            .err();
        assert!(err.is_some());
        assert!(cell.get().is_none());
    }

    #[test]
    fn graph_mailer_applies_base_url() {
        let mut config = MailerConfig::new("box");
        config.base_url = Some("http://127.0.0.1:9/".into());
        let mailer = Mailer::graph(config, Arc::new(mailrelay_graph::StaticToken::new("t"))).unwrap();
        assert_eq!(mailer.config().mailbox, "box");
    }
}
