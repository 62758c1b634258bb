//! Error types for sending mail.

use mailsend_smtp::SessionError;
use thiserror::Error;

/// Errors that can occur while sending a message.
#[derive(Debug, Error)]
pub enum Error {
    /// The message could not be built (unreadable attachment, boundary
    /// collision).
    #[error("Message error: {0}")]
    Message(#[from] mailsend_mime::Error),

    /// Sender or recipient list is unusable.
    #[error("Address error: {0}")]
    Address(#[source] mailsend_smtp::Error),

    /// The SMTP session failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad category of a send failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// TCP connect or TLS handshake failed.
    Connection,
    /// Greeting or EHLO failed.
    ProtocolInit,
    /// Authentication failed.
    Auth,
    /// MAIL FROM was rejected.
    SenderRejected,
    /// RCPT TO was rejected.
    RecipientRejected,
    /// DATA or the message content was rejected.
    Data,
    /// Attachment could not be read.
    Read,
    /// Addresses, boundary or configuration were invalid.
    InvalidInput,
}

impl Error {
    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Message(mailsend_mime::Error::Read { .. }) => ErrorKind::Read,
            Self::Message(_) | Self::Address(_) | Self::Config(_) => ErrorKind::InvalidInput,
            Self::Session(session) => match session {
                SessionError::Connection { .. } => ErrorKind::Connection,
                SessionError::ProtocolInit(_) => ErrorKind::ProtocolInit,
                SessionError::Auth(_) => ErrorKind::Auth,
                SessionError::SenderRejected { .. } => ErrorKind::SenderRejected,
                SessionError::RecipientRejected { .. } => ErrorKind::RecipientRejected,
                SessionError::Data(_) => ErrorKind::Data,
            },
        }
    }

    /// Returns the server reply code, if the server rejected a command.
    #[must_use]
    pub const fn reply_code(&self) -> Option<u16> {
        match self {
            Self::Session(session) => session.source_error().reply_code(),
            _ => None,
        }
    }
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
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_read_kind() {
        let err = Error::from(mailsend_mime::Error::Read {
            path: PathBuf::from("/missing"),
            source: io::Error::from(io::ErrorKind::NotFound),
        });
        assert_eq!(err.kind(), ErrorKind::Read);
        assert_eq!(err.reply_code(), None);
    }

    #[test]
    fn test_invalid_input_kinds() {
        let err = Error::from(mailsend_mime::Error::BoundaryCollision("x".into()));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = Error::Address(mailsend_smtp::Error::NoRecipients);
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_session_kinds() {
        let err = Error::from(SessionError::Auth(mailsend_smtp::Error::smtp_error(
            535,
            "bad credentials",
        )));
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert_eq!(err.reply_code(), Some(535));
        assert_eq!(
            err.to_string(),
            "Authentication failed: SMTP error 535: bad credentials"
        );

        let err = Error::from(SessionError::Data(mailsend_smtp::Error::ConnectionClosed));
        assert_eq!(err.kind(), ErrorKind::Data);
        assert_eq!(err.reply_code(), None);
    }
}
