//! Email digest delivery.
//!
//! [`Notifier`] loads a source document, renders it with
//! [`outputs::digest`](crate::outputs::digest), and hands the message to an
//! [`EmailTransport`]. [`SmtpTransport`] is the production transport (Gmail
//! SMTP over implicit TLS); tests substitute a recording fake.
//!
//! Nothing here retries: a refused or failed send is reported once.

use crate::config::MailConfig;
use crate::error::{NewsError, Result};
use crate::outputs::digest::{render_digest, subject};
use crate::outputs::store::read_document;
use chrono::Utc;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::Path;
use tracing::{error, info, instrument};

/// A rendered message ready for a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Something that can deliver an [`Email`].
pub trait EmailTransport {
    async fn send(&self, email: &Email) -> Result<()>;
}

/// Authenticated SMTP relay built from [`MailConfig`].
pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    pub fn from_config(mail: &MailConfig) -> Result<Self> {
        let (sender, password) = mail.credentials()?;
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&mail.smtp_host)
            .map_err(|e| NewsError::Configuration(format!("smtp relay {}: {e}", mail.smtp_host)))?
            .credentials(Credentials::new(sender.to_string(), password.to_string()))
            .build();
        Ok(Self { mailer })
    }
}

fn mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e| NewsError::Configuration(format!("invalid address {address:?}: {e}")))
}

impl EmailTransport for SmtpTransport {
    async fn send(&self, email: &Email) -> Result<()> {
        let message = Message::builder()
            .from(mailbox(&email.from)?)
            .to(mailbox(&email.to)?)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())
            .map_err(|e| NewsError::Transport(e.to_string()))?;
        self.mailer
            .send(message)
            .await
            .map_err(|e| NewsError::Transport(e.to_string()))?;
        Ok(())
    }
}

pub struct Notifier<T> {
    transport: T,
    mail: MailConfig,
}

impl<T: EmailTransport> Notifier<T> {
    pub fn new(transport: T, mail: MailConfig) -> Self {
        Self { transport, mail }
    }

    /// Render the document at `document_path` and send it to `recipient`.
    ///
    /// Missing credentials, a missing or corrupt document, and transport
    /// failures all return an error without sending anything further.
    #[instrument(level = "info", skip(self), fields(document = %document_path.display()))]
    pub async fn send_digest(&self, document_path: &Path, recipient: &str) -> Result<Email> {
        let (sender, _) = self.mail.credentials()?;

        let doc = read_document(document_path).await?.ok_or_else(|| {
            NewsError::persistence(document_path.display().to_string(), "document not found")
        })?;

        let publisher = doc.source.as_deref().unwrap_or("Semiconductor News");
        let email = Email {
            from: sender.to_string(),
            to: recipient.to_string(),
            subject: subject(&doc, Utc::now()),
            html: render_digest(&doc, publisher),
        };

        match self.transport.send(&email).await {
            Ok(()) => {
                info!(
                    to = %recipient,
                    articles = doc.total_articles,
                    new = doc.new_articles_today,
                    "Digest sent"
                );
                Ok(email)
            }
            Err(e) => {
                error!(to = %recipient, error = %e, "Digest delivery failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleRecord, SourceDocument};
    use crate::outputs::store::write_json;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<Email>>,
        fail: bool,
    }

    impl EmailTransport for &Recording {
        async fn send(&self, email: &Email) -> Result<()> {
            if self.fail {
                return Err(NewsError::Transport("535 authentication failed".to_string()));
            }
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    fn mail() -> MailConfig {
        MailConfig::new(Some("bot@example.com".to_string()), Some("app-pw".to_string()))
    }

    async fn document(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("semiconductor_news.json");
        let doc = SourceDocument {
            last_updated: "2026-02-17T05:34:00Z".to_string(),
            total_articles: 2,
            new_articles_today: 1,
            source: Some("CNBC".to_string()),
            articles: vec![
                ArticleRecord {
                    title: "Nvidia & TSMC expand <CoWoS> capacity".to_string(),
                    url: "https://www.cnbc.com/2026/02/17/nvidia.html".to_string(),
                    source: "CNBC".to_string(),
                    published_at: "2 Hours Ago".to_string(),
                    crawled_at: "2026-02-17T05:34:00Z".to_string(),
                },
                ArticleRecord {
                    title: "Intel foundry update".to_string(),
                    url: "https://www.cnbc.com/2026/02/16/intel.html".to_string(),
                    source: "CNBC".to_string(),
                    published_at: "Recently".to_string(),
                    crawled_at: "2026-02-16T05:34:00Z".to_string(),
                },
            ],
        };
        write_json(&doc, &path).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_digest_sent() {
        let tmp = TempDir::new().unwrap();
        let path = document(&tmp).await;
        let transport = Recording::default();
        let notifier = Notifier::new(&transport, mail());

        let email = notifier.send_digest(&path, "reader@example.com").await.unwrap();

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], email);
        assert_eq!(email.from, "bot@example.com");
        assert_eq!(email.to, "reader@example.com");
        assert!(email.subject.starts_with("Daily Semiconductor News - 1 New Articles ("));
        assert!(email.html.contains("Nvidia &amp; TSMC expand &lt;CoWoS&gt; capacity"));
        assert_eq!(email.html.matches("NEW TODAY</span>").count(), 1);
    }

    #[tokio::test]
    async fn test_missing_credentials_is_configuration_error() {
        let tmp = TempDir::new().unwrap();
        let path = document(&tmp).await;
        let transport = Recording::default();
        let notifier = Notifier::new(
            &transport,
            MailConfig::new(Some("bot@example.com".to_string()), None),
        );

        let err = notifier.send_digest(&path, "reader@example.com").await.unwrap_err();
        assert!(matches!(err, NewsError::Configuration(_)));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_document_aborts() {
        let tmp = TempDir::new().unwrap();
        let transport = Recording::default();
        let notifier = Notifier::new(&transport, mail());

        let err = notifier
            .send_digest(&tmp.path().join("absent.json"), "reader@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, NewsError::Persistence { .. }));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_document_aborts() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        let transport = Recording::default();
        let notifier = Notifier::new(&transport, mail());

        assert!(notifier.send_digest(&path, "reader@example.com").await.is_err());
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_reported() {
        let tmp = TempDir::new().unwrap();
        let path = document(&tmp).await;
        let transport = Recording {
            fail: true,
            ..Recording::default()
        };
        let notifier = Notifier::new(&transport, mail());

        let err = notifier.send_digest(&path, "reader@example.com").await.unwrap_err();
        assert!(matches!(err, NewsError::Transport(_)));
    }

    #[test]
    fn test_smtp_transport_requires_credentials() {
        let err = SmtpTransport::from_config(&MailConfig::new(None, None)).err().unwrap();
        assert!(matches!(err, NewsError::Configuration(_)));
    }
}
