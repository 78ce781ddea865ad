use async_trait::async_trait;
use lettre::address::AddressError;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tenant_exit::config::{SmtpConfig, SmtpSecurity};
use tenant_exit::workflows::moveout::collaborators::object_key;
use tenant_exit::workflows::moveout::{BlobError, BlobStore, EmailMessage, Notifier, NotifyError};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Writes uploads below a local directory. The directory is served back under
/// `public_base_url` by the `/files` route.
#[derive(Debug, Clone)]
pub(crate) struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub(crate) fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn store(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        folder: &str,
    ) -> Result<String, BlobError> {
        let key = object_key(folder, &Uuid::new_v4().simple().to_string(), filename)?;
        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| BlobError::Upload(err.to_string()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|err| BlobError::Upload(err.to_string()))?;

        Ok(format!("{}/{}", self.public_base_url, key))
    }
}

/// Development mail transport: records every message in the service log and delivers
/// nothing.
#[derive(Debug, Clone)]
pub(crate) struct LogNotifier {
    sender: String,
}

impl LogNotifier {
    pub(crate) fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: EmailMessage) -> Result<(), NotifyError> {
        info!(
            sender = %self.sender,
            recipient = %message.recipient,
            subject = %message.subject,
            html = message.html_body.is_some(),
            "email logged, not delivered"
        );
        Ok(())
    }
}

/// Delivers mail through an SMTP relay.
pub(crate) struct SmtpNotifier {
    sender: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    pub(crate) fn new(sender: &str, config: &SmtpConfig) -> Result<Self, NotifyError> {
        let sender = sender
            .parse::<Mailbox>()
            .map_err(|err| NotifyError::Transport(format!("invalid sender address: {err}")))?;

        let builder = match config.security {
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            }
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host),
            SmtpSecurity::Plain => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
                config.host.as_str(),
            )),
        }
        .map_err(|err| NotifyError::Transport(err.to_string()))?;

        let mut builder = builder.port(config.port);
        if let Some((username, password)) = &config.credentials {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            sender,
            transport: builder.build(),
        })
    }

    fn compose(&self, message: &EmailMessage) -> Result<Message, NotifyError> {
        let rejected = |reason: String| NotifyError::Rejected {
            recipient: message.recipient.clone(),
            reason,
        };

        let recipient = message
            .recipient
            .parse::<Mailbox>()
            .map_err(|err: AddressError| rejected(err.to_string()))?;
        let builder = Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(message.subject.clone());

        let email = match &message.html_body {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                message.body.clone(),
                html.clone(),
            )),
            None => builder
                .header(ContentType::TEXT_PLAIN)
                .body(message.body.clone()),
        };
        email.map_err(|err| rejected(err.to_string()))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, message: EmailMessage) -> Result<(), NotifyError> {
        let email = self.compose(&message)?;
        match self.transport.send(email).await {
            Ok(_) => {
                info!(
                    recipient = %message.recipient,
                    subject = %message.subject,
                    "email delivered"
                );
                Ok(())
            }
            Err(err) if err.is_permanent() => {
                warn!(recipient = %message.recipient, error = %err, "relay refused email");
                Err(NotifyError::Rejected {
                    recipient: message.recipient,
                    reason: err.to_string(),
                })
            }
            Err(err) => Err(NotifyError::Transport(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(html_body: Option<&str>) -> EmailMessage {
        EmailMessage {
            subject: "Exit Request Submitted".to_string(),
            body: "Hi A,".to_string(),
            recipient: "a@x.com".to_string(),
            html_body: html_body.map(str::to_string),
        }
    }

    fn unreachable_relay() -> SmtpConfig {
        SmtpConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            security: SmtpSecurity::Plain,
            credentials: None,
        }
    }

    #[tokio::test]
    async fn stores_uploads_under_their_folder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blobs = LocalBlobStore::new(dir.path(), "http://files.test/files/");

        let url = blobs
            .store(b"lease".to_vec(), "Notice.PDF", "exit_docs")
            .await
            .expect("stores");
        let key = url
            .strip_prefix("http://files.test/files/")
            .expect("public url");
        assert!(key.starts_with("exit_docs/"));
        assert!(key.ends_with(".pdf"));

        let bytes = std::fs::read(blobs.root().join(key)).expect("written to disk");
        assert_eq!(bytes, b"lease");
    }

    #[tokio::test]
    async fn invalid_folders_never_touch_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blobs = LocalBlobStore::new(dir.path(), "http://files.test");

        let err = blobs
            .store(b"x".to_vec(), "a.txt", "../escape")
            .await
            .expect_err("rejected");
        assert!(matches!(err, BlobError::InvalidFolder(_)));
    }

    #[tokio::test]
    async fn log_notifier_accepts_messages() {
        let notifier = LogNotifier::new("no-reply@test.local");
        notifier.send(message(None)).await.expect("logged");
    }

    #[test]
    fn smtp_messages_carry_headers_and_alternatives() {
        let notifier =
            SmtpNotifier::new("no-reply@tenant-exit.local", &unreachable_relay()).expect("builds");

        let plain = notifier.compose(&message(None)).expect("composes");
        let plain = String::from_utf8(plain.formatted()).expect("utf8");
        assert!(plain.contains("From: no-reply@tenant-exit.local"));
        assert!(plain.contains("To: a@x.com"));
        assert!(plain.contains("Subject: Exit Request Submitted"));
        assert!(plain.contains("text/plain"));

        let rich = notifier
            .compose(&message(Some("<p>Hi A,</p>")))
            .expect("composes");
        let rich = String::from_utf8(rich.formatted()).expect("utf8");
        assert!(rich.contains("multipart/alternative"));
        assert!(rich.contains("text/html"));
    }

    #[test]
    fn smtp_rejects_unparseable_recipients() {
        let notifier =
            SmtpNotifier::new("no-reply@tenant-exit.local", &unreachable_relay()).expect("builds");
        let mut bad = message(None);
        bad.recipient = "not an address".to_string();
        assert!(matches!(
            notifier.compose(&bad),
            Err(NotifyError::Rejected { .. })
        ));
    }

    #[tokio::test]
    async fn smtp_connection_failure_is_a_transport_error() {
        let notifier =
            SmtpNotifier::new("no-reply@tenant-exit.local", &unreachable_relay()).expect("builds");
        assert!(matches!(
            notifier.send(message(None)).await,
            Err(NotifyError::Transport(_))
        ));
    }
}
