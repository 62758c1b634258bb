//! Error types for SMTP operations.

use crate::types::Reply;
use std::io;
use std::time::Duration;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Server returned error response.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code (e.g., 550).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Protocol error (unexpected response).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Envelope without any recipient.
    #[error("At least one recipient is required")]
    NoRecipients,

    /// Message exceeds the SIZE limit the server advertised.
    #[error("Message of {size} bytes exceeds the server limit of {limit} bytes")]
    MessageTooLarge {
        /// Message size in bytes.
        size: usize,
        /// Limit from the EHLO reply.
        limit: usize,
    },

    /// PLAIN credentials would cross an unencrypted channel.
    #[error("Refusing to send credentials over an unencrypted connection")]
    InsecureAuth,

    /// Operation did not complete in time.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Server closed the connection.
    #[error("Connection closed by server")]
    ConnectionClosed,
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }

    /// Creates an SMTP error from a rejected reply.
    #[must_use]
    pub fn from_reply(reply: &Reply) -> Self {
        Self::smtp_error(reply.code.as_u16(), reply.message_text())
    }

    /// Returns the server reply code, if the server rejected the command.
    #[must_use]
    pub const fn reply_code(&self) -> Option<u16> {
        match self {
            Self::SmtpError { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true if this is a permanent error (5xx, or a message the
    /// server will never accept).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code >= 500 && *code < 600)
            || matches!(self, Self::MessageTooLarge { .. })
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code >= 400 && *code < 500)
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
    use crate::types::ReplyCode;

    #[test]
    fn test_classification() {
        assert!(Error::smtp_error(550, "no such user").is_permanent());
        assert!(Error::smtp_error(451, "try later").is_transient());
        assert!(!Error::ConnectionClosed.is_permanent());
        assert!(!Error::ConnectionClosed.is_transient());
        assert!(Error::MessageTooLarge { size: 2, limit: 1 }.is_permanent());
    }

    #[test]
    fn test_from_reply() {
        let reply = Reply::new(
            ReplyCode::AUTH_FAILED,
            vec!["5.7.8 Authentication".to_string(), "credentials invalid".to_string()],
        );
        let err = Error::from_reply(&reply);
        assert_eq!(err.reply_code(), Some(535));
        assert_eq!(
            err.to_string(),
            "SMTP error 535: 5.7.8 Authentication\ncredentials invalid"
        );
    }
}
