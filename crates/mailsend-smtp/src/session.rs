//! One-shot delivery: connect, authenticate, transmit one message, quit.

use crate::connection::{Client, Connector};
use crate::error::{Error, Result};
use crate::types::Address;
use std::fmt;

/// Username and password for `AUTH PLAIN`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the authentication identity.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sender and recipients of one SMTP transaction.
///
/// Always holds at least one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    from: Address,
    first_recipient: Address,
    other_recipients: Vec<Address>,
}

impl Envelope {
    /// Creates an envelope. Recipients are contacted in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRecipients`] if `recipients` is empty.
    pub fn new(from: Address, recipients: Vec<Address>) -> Result<Self> {
        let mut recipients = recipients.into_iter();
        let first_recipient = recipients.next().ok_or(Error::NoRecipients)?;
        Ok(Self {
            from,
            first_recipient,
            other_recipients: recipients.collect(),
        })
    }

    /// Parses the sender and recipients from strings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] for the first malformed address,
    /// or [`Error::NoRecipients`] if no recipient is given.
    pub fn parse<I>(from: &str, recipients: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let from = Address::new(from)?;
        let recipients = recipients
            .into_iter()
            .map(|r| Address::new(r.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(from, recipients)
    }

    /// Returns the envelope sender.
    #[must_use]
    pub const fn from(&self) -> &Address {
        &self.from
    }

    /// Iterates over the recipients in RCPT order.
    pub fn recipients(&self) -> impl Iterator<Item = &Address> {
        std::iter::once(&self.first_recipient).chain(&self.other_recipients)
    }

    /// Returns the number of recipients.
    #[must_use]
    pub fn recipient_count(&self) -> usize {
        1 + self.other_recipients.len()
    }
}

/// Failure of a delivery, tagged with the step that failed.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// TCP connect or TLS handshake failed.
    #[error("Failed to connect to {endpoint}: {source}")]
    Connection {
        /// `host:port` that was dialed.
        endpoint: String,
        /// Underlying failure.
        #[source]
        source: Error,
    },

    /// Greeting or EHLO failed.
    #[error("SMTP handshake failed: {0}")]
    ProtocolInit(#[source] Error),

    /// Authentication was refused or could not be attempted.
    #[error("Authentication failed: {0}")]
    Auth(#[source] Error),

    /// MAIL FROM was rejected.
    #[error("Sender {sender} rejected: {source}")]
    SenderRejected {
        /// Envelope sender.
        sender: Address,
        /// Underlying failure.
        #[source]
        source: Error,
    },

    /// RCPT TO was rejected for a recipient.
    #[error("Recipient {recipient} rejected: {source}")]
    RecipientRejected {
        /// First recipient the server refused.
        recipient: Address,
        /// Underlying failure.
        #[source]
        source: Error,
    },

    /// DATA was refused, the message content was rejected, or the message
    /// exceeds the server's advertised size limit.
    #[error("Message data rejected: {0}")]
    Data(#[source] Error),
}

impl SessionError {
    /// Returns the protocol or transport error behind this failure.
    #[must_use]
    pub const fn source_error(&self) -> &Error {
        match self {
            Self::Connection { source, .. }
            | Self::SenderRejected { source, .. }
            | Self::RecipientRejected { source, .. } => source,
            Self::ProtocolInit(source) | Self::Auth(source) | Self::Data(source) => source,
        }
    }
}

/// Delivers one message over a fresh connection.
///
/// Runs EHLO, AUTH PLAIN, MAIL FROM, one RCPT TO per recipient, DATA and
/// QUIT. The first failure ends the session; the connection is closed
/// before the error is returned. Once the message is accepted a failing
/// QUIT is only logged.
///
/// # Errors
///
/// Returns a [`SessionError`] naming the step that failed.
pub async fn deliver<C: Connector>(
    connector: &C,
    client_name: &str,
    credentials: &Credentials,
    envelope: &Envelope,
    message: &[u8],
) -> std::result::Result<(), SessionError> {
    let endpoint = connector.endpoint();
    tracing::debug!(%endpoint, "Connecting");

    let stream = connector
        .connect()
        .await
        .map_err(|source| SessionError::Connection {
            endpoint: endpoint.clone(),
            source,
        })?;

    let client = Client::from_stream(stream)
        .await
        .map_err(SessionError::ProtocolInit)?;
    let client = client
        .ehlo(client_name)
        .await
        .map_err(SessionError::ProtocolInit)?;

    let client = client
        .auth_plain(credentials.username(), credentials.password())
        .await
        .map_err(SessionError::Auth)?;

    let client = client
        .mail_from(envelope.from(), Some(message.len()))
        .await
        .map_err(|source| match source {
            Error::MessageTooLarge { .. } => SessionError::Data(source),
            source => SessionError::SenderRejected {
                sender: envelope.from().clone(),
                source,
            },
        })?;

    let mut client = client
        .rcpt_to(&envelope.first_recipient)
        .await
        .map_err(|source| SessionError::RecipientRejected {
            recipient: envelope.first_recipient.clone(),
            source,
        })?;
    for recipient in &envelope.other_recipients {
        client = client
            .rcpt_to(recipient)
            .await
            .map_err(|source| SessionError::RecipientRejected {
                recipient: recipient.clone(),
                source,
            })?;
    }

    let client = client.data().await.map_err(SessionError::Data)?;
    let client = client
        .send_message(message)
        .await
        .map_err(SessionError::Data)?;

    tracing::info!(
        %endpoint,
        recipients = envelope.recipient_count(),
        bytes = message.len(),
        "Message accepted"
    );

    if let Err(err) = client.quit().await {
        tracing::warn!(error = %err, "QUIT failed after the message was accepted");
    }
    Ok(())
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

    #[test]
    fn test_envelope_requires_recipient() {
        let from = Address::new("a@example.com").unwrap();
        assert!(matches!(
            Envelope::new(from, Vec::new()),
            Err(Error::NoRecipients)
        ));
    }

    #[test]
    fn test_envelope_keeps_order() {
        let envelope =
            Envelope::parse("a@example.com", ["b@example.com", "c@example.com"]).unwrap();
        let order: Vec<&str> = envelope.recipients().map(Address::as_str).collect();
        assert_eq!(order, vec!["b@example.com", "c@example.com"]);
        assert_eq!(envelope.recipient_count(), 2);
        assert_eq!(envelope.from().as_str(), "a@example.com");
    }

    #[test]
    fn test_envelope_parse_rejects_bad_address() {
        let err = Envelope::parse("a@example.com", ["not-an-address"]).unwrap_err();
        assert!(matches!(err, Error::InvalidAddress(_)));
    }

    #[test]
    fn test_credentials_debug_redacted() {
        let creds = Credentials::new("a@example.com", "hunter2");
        let shown = format!("{creds:?}");
        assert!(shown.contains("a@example.com"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn test_session_error_source() {
        let err = SessionError::Auth(Error::smtp_error(535, "bad credentials"));
        assert_eq!(err.source_error().reply_code(), Some(535));
        assert_eq!(
            err.to_string(),
            "Authentication failed: SMTP error 535: bad credentials"
        );
    }
}
