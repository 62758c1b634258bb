//! SMTP connection management with type-state pattern.

mod client;
mod stream;
mod tls;

pub use client::{Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded};
pub use stream::SmtpStream;
pub use tls::{Connector, ImplicitTls, SMTPS_PORT, TlsSettings, connect_tls};

use crate::types::{AuthMechanism, Extension};

/// Server capabilities from the greeting and EHLO reply.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Server hostname from greeting.
    pub hostname: String,
    /// Supported extensions, in advertised order.
    pub extensions: Vec<Extension>,
}

impl ServerInfo {
    /// Checks if the server supports an extension.
    #[must_use]
    pub fn supports(&self, ext: &Extension) -> bool {
        self.extensions.contains(ext)
    }

    /// Returns true if the server advertised the SIZE extension.
    #[must_use]
    pub fn supports_size(&self) -> bool {
        self.extensions
            .iter()
            .any(|ext| matches!(ext, Extension::Size(_)))
    }

    /// Returns the maximum message size, if advertised and non-zero.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(Some(size)) if *size > 0 => Some(*size),
            _ => None,
        })
    }

    /// Returns true if the server advertised AUTH at all.
    #[must_use]
    pub fn supports_auth(&self) -> bool {
        self.extensions
            .iter()
            .any(|ext| matches!(ext, Extension::Auth(_)))
    }

    /// Returns supported authentication mechanisms.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<AuthMechanism> {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                Extension::Auth(mechanisms) => Some(mechanisms.clone()),
                _ => None,
            })
            .unwrap_or_default()
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

    fn info(lines: &[&str]) -> ServerInfo {
        ServerInfo {
            hostname: "smtp.example.com".to_string(),
            extensions: lines.iter().map(|l| Extension::parse(l)).collect(),
        }
    }

    #[test]
    fn test_auth_mechanisms() {
        let info = info(&["AUTH LOGIN PLAIN", "8BITMIME"]);
        assert!(info.supports_auth());
        assert_eq!(
            info.auth_mechanisms(),
            vec![AuthMechanism::Login, AuthMechanism::Plain]
        );
        assert!(info.supports(&Extension::EightBitMime));
    }

    #[test]
    fn test_no_auth() {
        let info = info(&["PIPELINING"]);
        assert!(!info.supports_auth());
        assert!(info.auth_mechanisms().is_empty());
    }

    #[test]
    fn test_size() {
        assert_eq!(info(&["SIZE 1000"]).max_message_size(), Some(1000));
        assert_eq!(info(&["SIZE 0"]).max_message_size(), None);
        assert!(info(&["SIZE"]).supports_size());
        assert!(!info(&[]).supports_size());
    }
}
