//! Type-state SMTP client.

use super::{ServerInfo, SmtpStream};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
use base64::Engine;
use std::fmt;
use std::marker::PhantomData;
use tokio::io::{AsyncRead, AsyncWrite};

/// Type-state marker for connected state.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker for authenticated state.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker for mail transaction started.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker for recipient added.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker for data mode.
#[derive(Debug)]
pub struct Data;

/// SMTP client with type-state pattern.
///
/// Every transition consumes the client. When the server rejects a
/// command the client sends a best-effort `QUIT`, shuts the stream down
/// and returns the rejection, so no state ever outlives a failure.
pub struct Client<S, State> {
    stream: SmtpStream<S>,
    server_info: ServerInfo,
    _state: PhantomData<State>,
}

impl<S> Client<S, Connected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or if the server returns an error.
    pub async fn from_stream(mut stream: SmtpStream<S>) -> Result<Self> {
        let greeting = read_reply(&mut stream).await?;

        // Extract hostname from greeting (first word after code)
        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();

        let client = Self {
            stream,
            server_info: ServerInfo {
                hostname,
                extensions: Vec::new(),
            },
            _state: PhantomData,
        };

        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(client.abort(Error::from_reply(&greeting)).await);
        }

        tracing::debug!(server = %client.server_info.hostname, "Greeting received");
        Ok(client)
    }

    /// Sends EHLO and discovers server capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO command fails.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        let cmd = Command::Ehlo {
            hostname: client_hostname.to_string(),
        };
        let reply = self.send_command(&cmd).await?;

        if !reply.is_success() {
            return Err(self.reject(&reply).await);
        }

        // First line is the server's greeting, the rest are extensions
        self.server_info.extensions = reply
            .message
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();

        tracing::debug!(
            extensions = self.server_info.extensions.len(),
            "EHLO accepted"
        );
        Ok(self)
    }

    /// Authenticates using PLAIN mechanism.
    ///
    /// The credentials are only sent over an encrypted stream. Whether the
    /// server accepts PLAIN is left to the server, even when the EHLO reply
    /// did not list it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsecureAuth`] on an unencrypted stream, or the
    /// server's rejection.
    pub async fn auth_plain(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        if !self.stream.is_encrypted() {
            return Err(self.abort(Error::InsecureAuth).await);
        }
        if !self.server_info.supports_auth() {
            tracing::debug!("AUTH not advertised, attempting PLAIN anyway");
        } else if !self
            .server_info
            .auth_mechanisms()
            .contains(&AuthMechanism::Plain)
        {
            tracing::debug!(
                advertised = ?self.server_info.auth_mechanisms(),
                "PLAIN not advertised, attempting anyway"
            );
        }

        // Build PLAIN response: \0username\0password
        let credentials = format!("\0{username}\0{password}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());

        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some(encoded),
        };
        let reply = self.send_command(&cmd).await?;

        if !reply.is_success() {
            return Err(self.reject(&reply).await);
        }

        tracing::debug!("Authenticated with PLAIN");
        Ok(self.transition())
    }
}

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Starts a mail transaction.
    ///
    /// `size` is sent as the SIZE parameter only when the server
    /// advertised the extension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] without sending MAIL FROM if
    /// `size` exceeds the advertised limit, or an error if the MAIL FROM
    /// command fails.
    pub async fn mail_from(
        mut self,
        from: &Address,
        size: Option<usize>,
    ) -> Result<Client<S, MailTransaction>> {
        if let (Some(size), Some(limit)) = (size, self.server_info.max_message_size())
            && size > limit
        {
            return Err(self.abort(Error::MessageTooLarge { size, limit }).await);
        }

        let cmd = Command::MailFrom {
            from: from.clone(),
            size: size.filter(|_| self.server_info.supports_size()),
        };
        let reply = self.send_command(&cmd).await?;

        if !reply.is_success() {
            return Err(self.reject(&reply).await);
        }

        tracing::debug!(%from, "Sender accepted");
        Ok(self.transition())
    }
}

impl<S> Client<S, MailTransaction>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Adds a recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: &Address) -> Result<Client<S, RecipientAdded>> {
        self.add_recipient(to).await?;
        Ok(self.transition())
    }
}

impl<S> Client<S, RecipientAdded>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Adds another recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: &Address) -> Result<Self> {
        self.add_recipient(to).await?;
        Ok(self)
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server answers 354.
    pub async fn data(mut self) -> Result<Client<S, Data>> {
        let reply = self.send_command(&Command::Data).await?;

        if reply.code != ReplyCode::START_DATA {
            return Err(self.reject(&reply).await);
        }

        tracing::debug!("Server ready for message data");
        Ok(self.transition())
    }
}

impl<S> Client<S, Data>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Sends the message content and completes the transaction.
    ///
    /// Line endings are normalized to CRLF, lines starting with `.` are
    /// dot-stuffed and the terminating `.` line is appended.
    ///
    /// # Errors
    ///
    /// Returns an error if sending the message fails or server rejects it.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<S, Authenticated>> {
        let encoded = encode_data(message);
        self.stream.write_all(&encoded).await?;

        let reply = read_reply(&mut self.stream).await?;

        if !reply.is_success() {
            return Err(self.reject(&reply).await);
        }

        tracing::debug!(bytes = encoded.len(), "Message data accepted");
        Ok(self.transition())
    }
}

// Common implementation for all states
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the server information.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Returns true if the underlying stream is encrypted.
    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        self.stream.is_encrypted()
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails. The stream is shut
    /// down either way.
    pub async fn quit(mut self) -> Result<()> {
        let result = self.send_command(&Command::Quit).await;
        let shutdown = self.stream.shutdown().await;

        let reply = result?;
        if reply.code != ReplyCode::CLOSING && !reply.is_success() {
            return Err(Error::from_reply(&reply));
        }
        shutdown
    }

    async fn send_command(&mut self, cmd: &Command) -> Result<Reply> {
        tracing::trace!(command = ?cmd, "Sending command");
        self.stream.write_all(&cmd.serialize()).await?;
        read_reply(&mut self.stream).await
    }

    async fn add_recipient(&mut self, to: &Address) -> Result<()> {
        let cmd = Command::RcptTo { to: to.clone() };
        let reply = self.send_command(&cmd).await?;

        if !reply.is_success() {
            return Err(self.release(Error::from_reply(&reply)).await);
        }

        tracing::debug!(%to, "Recipient accepted");
        Ok(())
    }

    fn transition<Next>(self) -> Client<S, Next> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            _state: PhantomData,
        }
    }

    async fn reject(self, reply: &Reply) -> Error {
        self.abort(Error::from_reply(reply)).await
    }

    async fn abort(mut self, err: Error) -> Error {
        self.release(err).await
    }

    /// Best-effort QUIT and shutdown. Failures here are secondary to `err`.
    async fn release(&mut self, err: Error) -> Error {
        tracing::debug!(error = %err, "Closing session");
        if let Err(quit_err) = self.send_command(&Command::Quit).await {
            tracing::debug!(error = %quit_err, "QUIT after failure not acknowledged");
        }
        if let Err(shutdown_err) = self.stream.shutdown().await {
            tracing::debug!(error = %shutdown_err, "Shutdown after failure failed");
        }
        err
    }
}

impl<S, State> fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("state", &std::any::type_name::<State>())
            .field("stream", &self.stream)
            .field("server_info", &self.server_info)
            .finish()
    }
}

async fn read_reply<S>(stream: &mut SmtpStream<S>) -> Result<Reply>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line().await?;
        let is_last = is_last_reply_line(&line);
        lines.push(line);

        if is_last {
            break;
        }
    }

    parse_reply(&lines)
}

/// Prepares message content for the DATA phase.
///
/// Normalizes line endings to CRLF, dot-stuffs lines that begin with `.`
/// and appends the `.` terminator line.
fn encode_data(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + message.len() / 32 + 5);

    if !message.is_empty() {
        let body = message.strip_suffix(b"\n").unwrap_or(message);
        for line in body.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                out.push(b'.');
            }
            out.extend_from_slice(line);
            out.extend_from_slice(b"\r\n");
        }
    }

    out.extend_from_slice(b".\r\n");
    out
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
    use tokio_test::io::{Builder, Mock};

    const EHLO_REPLY: &[u8] =
        b"250-smtp.example.com Hello\r\n250-SIZE 35882577\r\n250-AUTH LOGIN PLAIN\r\n250 8BITMIME\r\n";

    async fn ready_client(mock: Mock) -> Client<Mock, Connected> {
        let client = Client::from_stream(SmtpStream::tls(mock)).await.unwrap();
        client.ehlo("localhost").await.unwrap()
    }

    #[test]
    fn test_encode_data_normalizes_and_terminates() {
        assert_eq!(encode_data(b"a\nb\r\nc"), b"a\r\nb\r\nc\r\n.\r\n");
        assert_eq!(encode_data(b"a\r\n"), b"a\r\n.\r\n");
        assert_eq!(encode_data(b""), b".\r\n");
    }

    #[test]
    fn test_encode_data_dot_stuffing() {
        assert_eq!(encode_data(b".hidden\r\n..\r\n"), b"..hidden\r\n...\r\n.\r\n");
        assert_eq!(encode_data(b"a\r\n.\r\nb"), b"a\r\n..\r\nb\r\n.\r\n");
    }

    #[tokio::test]
    async fn test_greeting_and_ehlo() {
        let mock = Builder::new()
            .read(b"220 smtp.example.com ESMTP ready\r\n")
            .write(b"EHLO localhost\r\n")
            .read(EHLO_REPLY)
            .build();

        let client = ready_client(mock).await;
        let info = client.server_info();
        assert_eq!(info.hostname, "smtp.example.com");
        assert_eq!(info.max_message_size(), Some(35_882_577));
        assert!(info.auth_mechanisms().contains(&AuthMechanism::Plain));
        assert!(info.supports(&Extension::EightBitMime));
    }

    #[tokio::test]
    async fn test_rejected_greeting_sends_quit() {
        let mock = Builder::new()
            .read(b"554 no service\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n")
            .build();

        let err = Client::from_stream(SmtpStream::tls(mock)).await.unwrap_err();
        assert_eq!(err.reply_code(), Some(554));
    }

    #[tokio::test]
    async fn test_auth_plain_success() {
        let mock = Builder::new()
            .read(b"220 smtp.example.com ESMTP\r\n")
            .write(b"EHLO localhost\r\n")
            .read(EHLO_REPLY)
            .write(b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n")
            .read(b"235 2.7.0 Authentication successful\r\n")
            .build();

        let client = ready_client(mock).await;
        let client = client.auth_plain("user", "pass").await.unwrap();
        assert!(client.is_encrypted());
    }

    #[tokio::test]
    async fn test_auth_refused_on_plaintext_stream() {
        let mock = Builder::new()
            .read(b"220 smtp.example.com ESMTP\r\n")
            .write(b"EHLO localhost\r\n")
            .read(EHLO_REPLY)
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n")
            .build();

        let client = Client::from_stream(SmtpStream::plain(mock)).await.unwrap();
        let client = client.ehlo("localhost").await.unwrap();
        let err = client.auth_plain("user", "pass").await.unwrap_err();
        assert!(matches!(err, Error::InsecureAuth));
    }

    #[tokio::test]
    async fn test_auth_plain_with_equals_form() {
        let mock = Builder::new()
            .read(b"220 smtp.example.com ESMTP\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"250-smtp.example.com\r\n250 AUTH=PLAIN LOGIN\r\n")
            .write(b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n")
            .read(b"235 2.7.0 Authentication successful\r\n")
            .build();

        let client = ready_client(mock).await;
        assert!(client.server_info().supports_auth());
        client.auth_plain("user", "pass").await.unwrap();
    }

    #[tokio::test]
    async fn test_auth_attempted_when_not_advertised() {
        let mock = Builder::new()
            .read(b"220 smtp.example.com ESMTP\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"250-smtp.example.com\r\n250 8BITMIME\r\n")
            .write(b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n")
            .read(b"235 2.7.0 Authentication successful\r\n")
            .build();

        let client = ready_client(mock).await;
        assert!(!client.server_info().supports_auth());
        client.auth_plain("user", "pass").await.unwrap();
    }

    #[tokio::test]
    async fn test_auth_without_plain_left_to_server() {
        let mock = Builder::new()
            .read(b"220 smtp.example.com ESMTP\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"250-smtp.example.com\r\n250 AUTH LOGIN\r\n")
            .write(b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n")
            .read(b"504 5.5.4 Unrecognized authentication type\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n")
            .build();

        let client = ready_client(mock).await;
        let err = client.auth_plain("user", "pass").await.unwrap_err();
        assert_eq!(err.reply_code(), Some(504));
    }

    #[tokio::test]
    async fn test_full_transaction() {
        let mock = Builder::new()
            .read(b"220 smtp.example.com ESMTP\r\n")
            .write(b"EHLO localhost\r\n")
            .read(EHLO_REPLY)
            .write(b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n")
            .read(b"235 ok\r\n")
            .write(b"MAIL FROM:<a@example.com> SIZE=12\r\n")
            .read(b"250 ok\r\n")
            .write(b"RCPT TO:<b@example.com>\r\n")
            .read(b"250 ok\r\n")
            .write(b"RCPT TO:<c@example.com>\r\n")
            .read(b"250 ok\r\n")
            .write(b"DATA\r\n")
            .read(b"354 go ahead\r\n")
            .write(b"Subject: x\r\n\r\nbody\r\n.\r\n")
            .read(b"250 queued\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n")
            .build();

        let from = Address::new("a@example.com").unwrap();
        let to = Address::new("b@example.com").unwrap();
        let cc = Address::new("c@example.com").unwrap();

        let client = ready_client(mock).await;
        let client = client.auth_plain("user", "pass").await.unwrap();
        let client = client.mail_from(&from, Some(12)).await.unwrap();
        let client = client.rcpt_to(&to).await.unwrap();
        let client = client.rcpt_to(&cc).await.unwrap();
        let client = client.data().await.unwrap();
        let client = client.send_message(b"Subject: x\r\n\r\nbody").await.unwrap();
        client.quit().await.unwrap();
    }

    #[tokio::test]
    async fn test_size_omitted_when_not_advertised() {
        let mock = Builder::new()
            .read(b"220 smtp.example.com ESMTP\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"250-smtp.example.com\r\n250 AUTH PLAIN\r\n")
            .write(b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n")
            .read(b"235 ok\r\n")
            .write(b"MAIL FROM:<a@example.com>\r\n")
            .read(b"250 ok\r\n")
            .build();

        let from = Address::new("a@example.com").unwrap();
        let client = ready_client(mock).await;
        let client = client.auth_plain("user", "pass").await.unwrap();
        let _client = client.mail_from(&from, Some(12)).await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_message_refused_before_mail_from() {
        let mock = Builder::new()
            .read(b"220 smtp.example.com ESMTP\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"250-smtp.example.com\r\n250-SIZE 100\r\n250 AUTH PLAIN\r\n")
            .write(b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n")
            .read(b"235 ok\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n")
            .build();

        let from = Address::new("a@example.com").unwrap();
        let client = ready_client(mock).await;
        let client = client.auth_plain("user", "pass").await.unwrap();
        let err = client.mail_from(&from, Some(101)).await.unwrap_err();
        assert!(matches!(err, Error::MessageTooLarge { size: 101, limit: 100 }));
    }

    #[tokio::test]
    async fn test_rejected_recipient_closes_session() {
        let mock = Builder::new()
            .read(b"220 smtp.example.com ESMTP\r\n")
            .write(b"EHLO localhost\r\n")
            .read(EHLO_REPLY)
            .write(b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n")
            .read(b"235 ok\r\n")
            .write(b"MAIL FROM:<a@example.com>\r\n")
            .read(b"250 ok\r\n")
            .write(b"RCPT TO:<nobody@example.com>\r\n")
            .read(b"550 5.1.1 no such user\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n")
            .build();

        let from = Address::new("a@example.com").unwrap();
        let to = Address::new("nobody@example.com").unwrap();

        let client = ready_client(mock).await;
        let client = client.auth_plain("user", "pass").await.unwrap();
        let client = client.mail_from(&from, None).await.unwrap();
        let err = client.rcpt_to(&to).await.unwrap_err();
        assert_eq!(err.reply_code(), Some(550));
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn test_release_tolerates_closed_connection() {
        // Server drops the line right after rejecting DATA.
        let mock = Builder::new()
            .read(b"220 smtp.example.com ESMTP\r\n")
            .write(b"EHLO localhost\r\n")
            .read(EHLO_REPLY)
            .write(b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n")
            .read(b"235 ok\r\n")
            .write(b"MAIL FROM:<a@example.com>\r\n")
            .read(b"250 ok\r\n")
            .write(b"RCPT TO:<b@example.com>\r\n")
            .read(b"250 ok\r\n")
            .write(b"DATA\r\n")
            .read(b"421 shutting down\r\n")
            .write(b"QUIT\r\n")
            .build();

        let from = Address::new("a@example.com").unwrap();
        let to = Address::new("b@example.com").unwrap();

        let client = ready_client(mock).await;
        let client = client.auth_plain("user", "pass").await.unwrap();
        let client = client.mail_from(&from, None).await.unwrap();
        let client = client.rcpt_to(&to).await.unwrap();
        let err = client.data().await.unwrap_err();
        assert_eq!(err.reply_code(), Some(421));
        assert!(err.is_transient());
    }
}
