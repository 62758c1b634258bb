//! Integration tests for one-shot delivery.
//!
//! Each test scripts the server side of the conversation with
//! `tokio_test::io::Builder`. A command the script does not expect makes
//! the mock panic, so a passing test also proves the session stopped
//! where it should.

#![allow(clippy::unwrap_used)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use mailsend_smtp::{
    Connector, Credentials, Envelope, Error, Result, SessionError, SmtpStream, deliver,
};
use tokio_test::io::{Builder, Mock};

const GREETING: &[u8] = b"220 smtp.example.com ESMTP ready\r\n";
const EHLO_REPLY: &[u8] = b"250-smtp.example.com\r\n250-AUTH PLAIN LOGIN\r\n250 8BITMIME\r\n";
// base64("\0a@example.com\0p")
const AUTH_LINE: &[u8] = b"AUTH PLAIN AGFAZXhhbXBsZS5jb20AcA==\r\n";
const MESSAGE: &[u8] = b"From: a@example.com\r\nTo: b@example.com\r\nSubject: Hi\r\n\r\nHello";

/// Hands out one scripted stream and counts connection attempts.
struct ScriptedConnector {
    script: Mutex<Option<Mock>>,
    attempts: AtomicUsize,
}

impl ScriptedConnector {
    fn new(mock: Mock) -> Self {
        Self {
            script: Mutex::new(Some(mock)),
            attempts: AtomicUsize::new(0),
        }
    }
}

impl Connector for ScriptedConnector {
    type Stream = Mock;

    async fn connect(&self) -> Result<SmtpStream<Mock>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let mock = self.script.lock().unwrap().take().ok_or(Error::ConnectionClosed)?;
        Ok(SmtpStream::tls(mock))
    }

    fn endpoint(&self) -> String {
        "smtp.example.com:465".to_string()
    }
}

struct RefusingConnector;

impl Connector for RefusingConnector {
    type Stream = Mock;

    async fn connect(&self) -> Result<SmtpStream<Mock>> {
        Err(Error::Io(std::io::Error::from(
            std::io::ErrorKind::ConnectionRefused,
        )))
    }

    fn endpoint(&self) -> String {
        "smtp.example.com:465".to_string()
    }
}

fn credentials() -> Credentials {
    Credentials::new("a@example.com", "p")
}

/// Script up to and including a successful AUTH.
fn authenticated() -> Builder {
    let mut builder = Builder::new();
    builder
        .read(GREETING)
        .write(b"EHLO localhost\r\n")
        .read(EHLO_REPLY)
        .write(AUTH_LINE)
        .read(b"235 2.7.0 Accepted\r\n");
    builder
}

#[tokio::test]
async fn test_plain_message_end_to_end() {
    let mock = authenticated()
        .write(b"MAIL FROM:<a@example.com>\r\n")
        .read(b"250 2.1.0 OK\r\n")
        .write(b"RCPT TO:<b@example.com>\r\n")
        .read(b"250 2.1.5 OK\r\n")
        .write(b"DATA\r\n")
        .read(b"354 End data with <CR><LF>.<CR><LF>\r\n")
        .write(b"From: a@example.com\r\nTo: b@example.com\r\nSubject: Hi\r\n\r\nHello\r\n.\r\n")
        .read(b"250 2.0.0 queued\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 2.0.0 Bye\r\n")
        .build();
    let connector = ScriptedConnector::new(mock);
    let envelope = Envelope::parse("a@example.com", ["b@example.com"]).unwrap();

    deliver(&connector, "localhost", &credentials(), &envelope, MESSAGE)
        .await
        .unwrap();
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_quit_failure_after_acceptance_is_not_an_error() {
    let mock = authenticated()
        .write(b"MAIL FROM:<a@example.com>\r\n")
        .read(b"250 OK\r\n")
        .write(b"RCPT TO:<b@example.com>\r\n")
        .read(b"250 OK\r\n")
        .write(b"DATA\r\n")
        .read(b"354 go\r\n")
        .write(b"From: a@example.com\r\nTo: b@example.com\r\nSubject: Hi\r\n\r\nHello\r\n.\r\n")
        .read(b"250 queued\r\n")
        .write(b"QUIT\r\n")
        .build();
    let connector = ScriptedConnector::new(mock);
    let envelope = Envelope::parse("a@example.com", ["b@example.com"]).unwrap();

    // Server hangs up instead of answering QUIT.
    deliver(&connector, "localhost", &credentials(), &envelope, MESSAGE)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_auth_failure_stops_before_mail() {
    let mock = Builder::new()
        .read(GREETING)
        .write(b"EHLO localhost\r\n")
        .read(EHLO_REPLY)
        .write(AUTH_LINE)
        .read(b"535 5.7.8 Authentication credentials invalid\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 Bye\r\n")
        .build();
    let connector = ScriptedConnector::new(mock);
    let envelope = Envelope::parse("a@example.com", ["b@example.com"]).unwrap();

    let err = deliver(&connector, "localhost", &credentials(), &envelope, MESSAGE)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Auth(_)));
    assert_eq!(err.source_error().reply_code(), Some(535));
}

#[tokio::test]
async fn test_second_recipient_rejected_never_opens_data() {
    let mock = authenticated()
        .write(b"MAIL FROM:<a@example.com>\r\n")
        .read(b"250 OK\r\n")
        .write(b"RCPT TO:<b@example.com>\r\n")
        .read(b"250 OK\r\n")
        .write(b"RCPT TO:<c@example.com>\r\n")
        .read(b"550 5.1.1 Mailbox unavailable\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 Bye\r\n")
        .build();
    let connector = ScriptedConnector::new(mock);
    let envelope =
        Envelope::parse("a@example.com", ["b@example.com", "c@example.com"]).unwrap();

    let err = deliver(&connector, "localhost", &credentials(), &envelope, MESSAGE)
        .await
        .unwrap_err();
    match err {
        SessionError::RecipientRejected { recipient, source } => {
            assert_eq!(recipient.as_str(), "c@example.com");
            assert!(source.is_permanent());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_sender_rejected() {
    let mock = authenticated()
        .write(b"MAIL FROM:<a@example.com>\r\n")
        .read(b"553 5.7.1 Sender address rejected: not owned by user\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 Bye\r\n")
        .build();
    let connector = ScriptedConnector::new(mock);
    let envelope = Envelope::parse("a@example.com", ["b@example.com"]).unwrap();

    let err = deliver(&connector, "localhost", &credentials(), &envelope, MESSAGE)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::SenderRejected { .. }));
}

#[tokio::test]
async fn test_message_rejected_after_data() {
    let mock = authenticated()
        .write(b"MAIL FROM:<a@example.com>\r\n")
        .read(b"250 OK\r\n")
        .write(b"RCPT TO:<b@example.com>\r\n")
        .read(b"250 OK\r\n")
        .write(b"DATA\r\n")
        .read(b"354 go\r\n")
        .write(b"From: a@example.com\r\nTo: b@example.com\r\nSubject: Hi\r\n\r\nHello\r\n.\r\n")
        .read(b"554 5.6.0 Message rejected as spam\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 Bye\r\n")
        .build();
    let connector = ScriptedConnector::new(mock);
    let envelope = Envelope::parse("a@example.com", ["b@example.com"]).unwrap();

    let err = deliver(&connector, "localhost", &credentials(), &envelope, MESSAGE)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Data(_)));
    assert_eq!(err.source_error().reply_code(), Some(554));
}

#[tokio::test]
async fn test_oversized_message_never_sends_mail_from() {
    let mock = Builder::new()
        .read(GREETING)
        .write(b"EHLO localhost\r\n")
        .read(b"250-smtp.example.com\r\n250-SIZE 16\r\n250 AUTH PLAIN\r\n")
        .write(AUTH_LINE)
        .read(b"235 2.7.0 Accepted\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 Bye\r\n")
        .build();
    let connector = ScriptedConnector::new(mock);
    let envelope = Envelope::parse("a@example.com", ["b@example.com"]).unwrap();

    let err = deliver(&connector, "localhost", &credentials(), &envelope, MESSAGE)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Data(Error::MessageTooLarge { limit: 16, .. })
    ));
}

#[tokio::test]
async fn test_legacy_auth_advertisement_end_to_end() {
    let mock = Builder::new()
        .read(GREETING)
        .write(b"EHLO localhost\r\n")
        .read(b"250-smtp.example.com\r\n250 AUTH=PLAIN LOGIN\r\n")
        .write(AUTH_LINE)
        .read(b"235 2.7.0 Accepted\r\n")
        .write(b"MAIL FROM:<a@example.com>\r\n")
        .read(b"250 OK\r\n")
        .write(b"RCPT TO:<b@example.com>\r\n")
        .read(b"250 OK\r\n")
        .write(b"DATA\r\n")
        .read(b"354 go\r\n")
        .write(b"From: a@example.com\r\nTo: b@example.com\r\nSubject: Hi\r\n\r\nHello\r\n.\r\n")
        .read(b"250 queued\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 Bye\r\n")
        .build();
    let connector = ScriptedConnector::new(mock);
    let envelope = Envelope::parse("a@example.com", ["b@example.com"]).unwrap();

    deliver(&connector, "localhost", &credentials(), &envelope, MESSAGE)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_auth_attempted_without_advertisement() {
    let mock = Builder::new()
        .read(GREETING)
        .write(b"EHLO localhost\r\n")
        .read(b"250 smtp.example.com\r\n")
        .write(AUTH_LINE)
        .read(b"502 5.5.1 Command not implemented\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 Bye\r\n")
        .build();
    let connector = ScriptedConnector::new(mock);
    let envelope = Envelope::parse("a@example.com", ["b@example.com"]).unwrap();

    let err = deliver(&connector, "localhost", &credentials(), &envelope, MESSAGE)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Auth(_)));
    assert_eq!(err.source_error().reply_code(), Some(502));
}

#[tokio::test]
async fn test_ehlo_rejected_is_protocol_init() {
    let mock = Builder::new()
        .read(GREETING)
        .write(b"EHLO localhost\r\n")
        .read(b"501 5.5.4 Invalid domain\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 Bye\r\n")
        .build();
    let connector = ScriptedConnector::new(mock);
    let envelope = Envelope::parse("a@example.com", ["b@example.com"]).unwrap();

    let err = deliver(&connector, "localhost", &credentials(), &envelope, MESSAGE)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::ProtocolInit(_)));
}

#[tokio::test]
async fn test_server_closes_before_greeting() {
    let connector = ScriptedConnector::new(Builder::new().build());
    let envelope = Envelope::parse("a@example.com", ["b@example.com"]).unwrap();

    let err = deliver(&connector, "localhost", &credentials(), &envelope, MESSAGE)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::ProtocolInit(Error::ConnectionClosed)
    ));
}

#[tokio::test]
async fn test_connection_failure() {
    let envelope = Envelope::parse("a@example.com", ["b@example.com"]).unwrap();

    let err = deliver(
        &RefusingConnector,
        "localhost",
        &credentials(),
        &envelope,
        MESSAGE,
    )
    .await
    .unwrap_err();
    match err {
        SessionError::Connection { endpoint, source } => {
            assert_eq!(endpoint, "smtp.example.com:465");
            assert!(matches!(source, Error::Io(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
