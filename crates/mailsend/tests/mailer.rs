//! Integration tests for the mailer.
//!
//! The connector hands out a scripted `tokio_test` stream and counts how
//! often it is asked to connect.

#![allow(clippy::unwrap_used)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use mailsend::smtp::{Connector, Envelope, SmtpStream};
use mailsend::{AttachmentMail, Config, ErrorKind, Mailer};
use tokio_test::io::{Builder, Mock};

const SESSION_START: &[&[u8]] = &[
    b"220 smtp.example.com ESMTP\r\n",
    b"EHLO localhost\r\n",
    b"250-smtp.example.com\r\n250-SIZE 10485760\r\n250 AUTH PLAIN LOGIN\r\n",
    // base64("\0a@example.com\0p")
    b"AUTH PLAIN AGFAZXhhbXBsZS5jb20AcA==\r\n",
    b"235 2.7.0 Accepted\r\n",
];

struct CountingConnector {
    script: Mutex<Option<Mock>>,
    attempts: AtomicUsize,
}

impl CountingConnector {
    fn new(mock: Option<Mock>) -> Self {
        Self {
            script: Mutex::new(mock),
            attempts: AtomicUsize::new(0),
        }
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for &CountingConnector {
    type Stream = Mock;

    async fn connect(&self) -> mailsend::smtp::Result<SmtpStream<Mock>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let mock = self
            .script
            .lock()
            .unwrap()
            .take()
            .ok_or(mailsend::smtp::Error::ConnectionClosed)?;
        Ok(SmtpStream::tls(mock))
    }

    fn endpoint(&self) -> String {
        "smtp.example.com:465".to_string()
    }
}

fn config() -> Config {
    Config::new("smtp.example.com", "a@example.com", "p")
}

/// Starts a script with greeting, EHLO and a successful AUTH.
fn authenticated() -> Builder {
    let mut builder = Builder::new();
    builder
        .read(SESSION_START[0])
        .write(SESSION_START[1])
        .read(SESSION_START[2])
        .write(SESSION_START[3])
        .read(SESSION_START[4]);
    builder
}

#[tokio::test]
async fn test_send_plain_end_to_end() {
    let message = b"From: a@example.com\r\nTo: b@example.com\r\nSubject: Hi\r\n\r\nHello";
    let mock = authenticated()
        .write(format!("MAIL FROM:<a@example.com> SIZE={}\r\n", message.len()).as_bytes())
        .read(b"250 2.1.0 OK\r\n")
        .write(b"RCPT TO:<b@example.com>\r\n")
        .read(b"250 2.1.5 OK\r\n")
        .write(b"DATA\r\n")
        .read(b"354 go ahead\r\n")
        .write(b"From: a@example.com\r\nTo: b@example.com\r\nSubject: Hi\r\n\r\nHello\r\n.\r\n")
        .read(b"250 2.0.0 queued\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 2.0.0 Bye\r\n")
        .build();
    let connector = CountingConnector::new(Some(mock));
    let mailer = Mailer::with_connector(config(), &connector);

    mailer.send_plain("b@example.com", "Hi", "Hello").await.unwrap();
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test]
async fn test_unreadable_attachment_never_connects() {
    let connector = CountingConnector::new(None);
    let mailer = Mailer::with_connector(config(), &connector);
    let mail = AttachmentMail::new(
        "Report",
        "See attached",
        "report.pdf",
        "/nonexistent/mailsend/report.pdf",
    )
    .to("b@example.com");

    let err = mailer.send_with_attachment(&mail).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Read);
    assert_eq!(connector.attempts(), 0);
}

#[tokio::test]
async fn test_invalid_recipient_never_connects() {
    let connector = CountingConnector::new(None);
    let mailer = Mailer::with_connector(config(), &connector);

    let err = mailer.send_plain("not an address", "Hi", "Hello").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(connector.attempts(), 0);
}

#[tokio::test]
async fn test_auth_failure_kind() {
    let mock = Builder::new()
        .read(SESSION_START[0])
        .write(SESSION_START[1])
        .read(SESSION_START[2])
        .write(SESSION_START[3])
        .read(b"535 5.7.8 Authentication credentials invalid\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 Bye\r\n")
        .build();
    let connector = CountingConnector::new(Some(mock));
    let mailer = Mailer::with_connector(config(), &connector);

    let err = mailer.send_plain("b@example.com", "Hi", "Hello").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(err.reply_code(), Some(535));
}

#[tokio::test]
async fn test_send_prebuilt_multipart_to_and_cc() {
    let message = mailsend::mime::MessageBuilder::new()
        .from("a@example.com")
        .to("b@example.com")
        .cc("c@example.com")
        .subject("Report")
        .html_body("Numbers inside")
        .attach(mailsend::mime::Attachment::new(
            "numbers.txt",
            b"quarterly numbers".to_vec(),
        ))
        .boundary("=_mailsend_fixed")
        .build()
        .unwrap();
    assert!(message.as_str().contains("Cc: c@example.com\r\n"));
    assert!(message.as_str().ends_with("--=_mailsend_fixed--\r\n"));

    let mut data = message.as_bytes().to_vec();
    data.extend_from_slice(b".\r\n");
    let mock = authenticated()
        .write(format!("MAIL FROM:<a@example.com> SIZE={}\r\n", message.len()).as_bytes())
        .read(b"250 OK\r\n")
        .write(b"RCPT TO:<b@example.com>\r\n")
        .read(b"250 OK\r\n")
        .write(b"RCPT TO:<c@example.com>\r\n")
        .read(b"250 OK\r\n")
        .write(b"DATA\r\n")
        .read(b"354 go ahead\r\n")
        .write(&data)
        .read(b"250 queued\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 Bye\r\n")
        .build();
    let connector = CountingConnector::new(Some(mock));
    let mailer = Mailer::with_connector(config(), &connector);

    let envelope = Envelope::parse("a@example.com", ["b@example.com", "c@example.com"]).unwrap();
    mailer.send_message(&envelope, &message).await.unwrap();
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test]
async fn test_send_with_attachment_rcpt_rejected() {
    let path = std::env::temp_dir().join(format!("mailsend-rcpt-{}.txt", std::process::id()));
    tokio::fs::write(&path, b"data").await.unwrap();

    let mail = AttachmentMail::new("Report", "Body", "data.txt", &path)
        .to("b@example.com")
        .cc("nobody@example.com");

    // No SIZE advertised, so MAIL FROM does not depend on the random
    // boundary.
    let mock = Builder::new()
        .read(SESSION_START[0])
        .write(SESSION_START[1])
        .read(b"250-smtp.example.com\r\n250 AUTH PLAIN\r\n")
        .write(SESSION_START[3])
        .read(SESSION_START[4])
        .write(b"MAIL FROM:<a@example.com>\r\n")
        .read(b"250 OK\r\n")
        .write(b"RCPT TO:<b@example.com>\r\n")
        .read(b"250 OK\r\n")
        .write(b"RCPT TO:<nobody@example.com>\r\n")
        .read(b"550 5.1.1 User unknown\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 Bye\r\n")
        .build();
    let connector = CountingConnector::new(Some(mock));
    let mailer = Mailer::with_connector(config(), &connector);

    let err = mailer.send_with_attachment(&mail).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RecipientRejected);
    assert_eq!(err.reply_code(), Some(550));

    tokio::fs::remove_file(&path).await.unwrap();
}
