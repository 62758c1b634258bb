//! High-level sending operations.

use crate::config::Config;
use crate::error::{Error, Result};
use mailsend_mime::{Attachment, BuiltMessage, MessageBuilder, build_plain};
use mailsend_smtp::{Connector, Envelope, ImplicitTls, deliver};
use std::path::{Path, PathBuf};

/// A message with an HTML body and one file attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentMail {
    /// Recipient addresses.
    pub to: Vec<String>,
    /// CC addresses.
    pub cc: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Content placed in the HTML body.
    pub html_body: String,
    /// File name shown to the recipient.
    pub attachment_name: String,
    /// Where the attachment bytes are read from.
    pub attachment_path: PathBuf,
}

impl AttachmentMail {
    /// Creates a message without recipients.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        html_body: impl Into<String>,
        attachment_name: impl Into<String>,
        attachment_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            to: Vec::new(),
            cc: Vec::new(),
            subject: subject.into(),
            html_body: html_body.into(),
            attachment_name: attachment_name.into(),
            attachment_path: attachment_path.into(),
        }
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.to.push(recipient.into());
        self
    }

    /// Adds a CC recipient.
    #[must_use]
    pub fn cc(mut self, recipient: impl Into<String>) -> Self {
        self.cc.push(recipient.into());
        self
    }

    /// Returns all envelope recipients, `to` first.
    fn recipients(&self) -> impl Iterator<Item = &str> {
        self.to.iter().chain(&self.cc).map(String::as_str)
    }
}

/// Sends messages with the configured account.
///
/// Every send opens its own connection; nothing is shared between calls.
#[derive(Debug, Clone)]
pub struct Mailer<C = ImplicitTls> {
    config: Config,
    connector: C,
}

impl Mailer<ImplicitTls> {
    /// Creates a mailer that connects over implicit TLS.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let connector = ImplicitTls::new(config.tls_settings());
        Self { config, connector }
    }
}

impl<C: Connector> Mailer<C> {
    /// Creates a mailer with a custom transport.
    #[must_use]
    pub const fn with_connector(config: Config, connector: C) -> Self {
        Self { config, connector }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Sends a plain text message to one recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if an address is malformed or any step of the
    /// SMTP session fails.
    pub async fn send_plain(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let envelope = Envelope::parse(&self.config.username, [to]).map_err(Error::Address)?;
        let message = build_plain(&self.config.username, to, subject, body);
        tracing::debug!(to, bytes = message.len(), "Built plain message");

        self.send_message(&envelope, &message).await
    }

    /// Sends an HTML message with one attachment.
    ///
    /// The attachment is read and the message built before connecting, so
    /// an unreadable file never opens a connection.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Read`](crate::ErrorKind::Read) if the
    /// attachment cannot be read, or an error from addressing, building or
    /// the SMTP session.
    pub async fn send_with_attachment(&self, mail: &AttachmentMail) -> Result<()> {
        let attachment = read_attachment(&mail.attachment_name, &mail.attachment_path).await?;
        let envelope =
            Envelope::parse(&self.config.username, mail.recipients()).map_err(Error::Address)?;

        let mut builder = MessageBuilder::new()
            .from(&self.config.username)
            .subject(&mail.subject)
            .html_body(&mail.html_body)
            .attach(attachment);
        for to in &mail.to {
            builder = builder.to(to);
        }
        for cc in &mail.cc {
            builder = builder.cc(cc);
        }
        let message = builder.build()?;
        tracing::debug!(
            attachment = %mail.attachment_name,
            bytes = message.len(),
            "Built multipart message"
        );

        self.send_message(&envelope, &message).await
    }

    /// Sends a prebuilt message.
    ///
    /// # Errors
    ///
    /// Returns an error if any step of the SMTP session fails.
    pub async fn send_message(&self, envelope: &Envelope, message: &BuiltMessage) -> Result<()> {
        deliver(
            &self.connector,
            &self.config.client_name,
            &self.config.credentials(),
            envelope,
            message.as_bytes(),
        )
        .await?;
        Ok(())
    }
}

async fn read_attachment(filename: &str, path: &Path) -> Result<Attachment> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|source| mailsend_mime::Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Attachment::new(filename, data))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_attachment_mail_recipients_order() {
        let mail = AttachmentMail::new("Report", "See attached", "r.pdf", "/tmp/r.pdf")
            .to("b@example.com")
            .cc("c@example.com")
            .to("d@example.com");
        let order: Vec<&str> = mail.recipients().collect();
        assert_eq!(order, vec!["b@example.com", "d@example.com", "c@example.com"]);
    }

    #[tokio::test]
    async fn test_read_attachment_missing_file() {
        let err = read_attachment("x.bin", Path::new("/nonexistent/mailsend/x.bin"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Read);
    }

    #[tokio::test]
    async fn test_read_attachment_guesses_type() {
        let path = std::env::temp_dir().join(format!("mailsend-{}.pdf", std::process::id()));
        tokio::fs::write(&path, b"%PDF-1.4").await.unwrap();

        let attachment = read_attachment("report.pdf", &path).await.unwrap();
        assert_eq!(attachment.data(), b"%PDF-1.4");
        assert_eq!(attachment.content_type().essence(), "application/pdf");

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[test]
    fn test_new_uses_config_settings() {
        let config = Config::builder("smtp.example.com")
            .port(2465)
            .credentials("a@example.com", "p")
            .build();
        let mailer = Mailer::new(config);
        assert_eq!(mailer.connector.settings().port, 2465);
        assert_eq!(mailer.config().username, "a@example.com");
    }
}
