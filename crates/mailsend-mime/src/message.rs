//! Message serialization.

use crate::attachment::Attachment;
use crate::boundary::{generate_boundary_for, validate_boundary};
use crate::content_type::ContentType;
use crate::encoding::encode_base64_wrapped;
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;

/// Separator used between addresses in `To` and `Cc` headers.
pub const ADDRESS_SEPARATOR: &str = ";";

/// Longest line, without CRLF, allowed in a 7bit body (RFC 5322).
pub const MAX_7BIT_LINE_LENGTH: usize = 998;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII with bounded lines.
    SevenBit,
    /// Base64 encoding.
    Base64,
}

impl TransferEncoding {
    /// Picks 7bit for ASCII text whose lines fit the SMTP limit, base64
    /// otherwise.
    #[must_use]
    pub fn for_text(text: &str) -> Self {
        let fits = text.is_ascii()
            && text
                .split('\n')
                .all(|line| line.trim_end_matches('\r').len() <= MAX_7BIT_LINE_LENGTH);
        if fits { Self::SevenBit } else { Self::Base64 }
    }

    /// Encodes `text` for a part labelled with this encoding.
    #[must_use]
    pub fn apply(self, text: &str) -> String {
        match self {
            Self::SevenBit => text.to_string(),
            Self::Base64 => encode_base64_wrapped(text.as_bytes()),
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::Base64 => write!(f, "base64"),
        }
    }
}

/// A fully serialized message, ready to be handed to the DATA phase.
///
/// Built once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltMessage(String);

impl BuiltMessage {
    /// Returns the message bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Returns the message text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the message is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the message, returning its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0.into_bytes()
    }
}

impl fmt::Display for BuiltMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds a plain text message: `From`, `To` and `Subject` headers, a
/// blank line, then `body` exactly as given.
#[must_use]
pub fn build_plain(from: &str, to: &str, subject: &str, body: &str) -> BuiltMessage {
    let mut headers = Headers::new();
    headers.add("From", from);
    headers.add("To", to);
    headers.add("Subject", subject);

    let mut out = headers.to_string();
    out.push_str("\r\n");
    out.push_str(body);

    tracing::debug!(bytes = out.len(), "built plain message");
    BuiltMessage(out)
}

/// Wraps body content in the HTML fragment used for the HTML part.
#[must_use]
pub fn html_fragment(content: &str) -> String {
    format!("<html><body><h1>{content}</h1></body></html>")
}

/// Builder for a `multipart/mixed` message carrying an HTML part and one
/// attachment.
///
/// ```ignore
/// use mailsend_mime::{Attachment, MessageBuilder};
///
/// let message = MessageBuilder::new()
///     .from("sender@example.com")
///     .to("recipient@example.com")
///     .subject("Monthly report")
///     .html_body("See attached")
///     .attach(Attachment::new("report.pdf", std::fs::read("/tmp/report.pdf")?))
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<String>,
    to: Vec<String>,
    cc: Vec<String>,
    subject: String,
    html_body: String,
    attachment: Option<Attachment>,
    boundary: Option<String>,
}

impl MessageBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sender.
    #[must_use]
    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Adds a `To` recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.to.push(recipient.into());
        self
    }

    /// Adds a `Cc` recipient.
    #[must_use]
    pub fn cc(mut self, recipient: impl Into<String>) -> Self {
        self.cc.push(recipient.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the content shown in the HTML part.
    #[must_use]
    pub fn html_body(mut self, content: impl Into<String>) -> Self {
        self.html_body = content.into();
        self
    }

    /// Sets the attachment.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Uses an explicit boundary instead of a generated one.
    #[must_use]
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Serializes the message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingHeader`] without a sender or recipient, and a
    /// boundary error if an explicit boundary is malformed or occurs in the
    /// content.
    pub fn build(self) -> Result<BuiltMessage> {
        let from = self.from.ok_or(Error::MissingHeader("From"))?;
        if self.to.is_empty() {
            return Err(Error::MissingHeader("To"));
        }

        let fragment = html_fragment(&self.html_body);
        let html_encoding = TransferEncoding::for_text(&fragment);
        let html = html_encoding.apply(&fragment);
        let encoded = self
            .attachment
            .as_ref()
            .map(|a| encode_base64_wrapped(a.data()))
            .unwrap_or_default();

        let contents = [html.as_str(), encoded.as_str()];
        let boundary = match self.boundary {
            Some(boundary) => {
                validate_boundary(&boundary, &contents)?;
                boundary
            }
            None => generate_boundary_for(&contents),
        };

        let mut headers = Headers::new();
        headers.add("From", from);
        headers.add("To", self.to.join(ADDRESS_SEPARATOR));
        if !self.cc.is_empty() {
            headers.add("Cc", self.cc.join(ADDRESS_SEPARATOR));
        }
        headers.add("Subject", self.subject);
        headers.add("MIME-Version", "1.0");
        headers.add(
            "Content-Type",
            ContentType::multipart_mixed(boundary.as_str()).to_string(),
        );

        let mut out = headers.to_string();
        out.push_str("\r\n");

        let mut html_headers = Headers::new();
        html_headers.add("Content-Type", ContentType::text_html().to_string());
        html_headers.add("Content-Transfer-Encoding", html_encoding.to_string());
        push_part(&mut out, &boundary, &html_headers, &html);
        if !html.ends_with("\r\n") {
            out.push_str("\r\n");
        }

        if let Some(attachment) = &self.attachment {
            let content_type = attachment
                .content_type()
                .clone()
                .with_parameter("name", attachment.filename());

            let mut part_headers = Headers::new();
            part_headers.add("Content-Type", content_type.to_string());
            part_headers.add("Content-Transfer-Encoding", TransferEncoding::Base64.to_string());
            part_headers.add(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", attachment.filename()),
            );
            push_part(&mut out, &boundary, &part_headers, &encoded);
        }

        out.push_str("--");
        out.push_str(&boundary);
        out.push_str("--\r\n");

        tracing::debug!(
            bytes = out.len(),
            recipients = self.to.len() + self.cc.len(),
            has_attachment = self.attachment.is_some(),
            "built multipart message"
        );
        Ok(BuiltMessage(out))
    }
}

fn push_part(out: &mut String, boundary: &str, headers: &Headers, body: &str) {
    out.push_str("--");
    out.push_str(boundary);
    out.push_str("\r\n");
    out.push_str(&headers.to_string());
    out.push_str("\r\n");
    out.push_str(body);
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
    use crate::encoding::decode_base64;

    fn sample() -> MessageBuilder {
        MessageBuilder::new()
            .from("a@example.com")
            .to("b@example.com")
            .subject("Report")
            .html_body("Quarterly numbers")
            .attach(Attachment::new("report.pdf", b"%PDF-1.4 binary\x00\xff".to_vec()))
            .boundary("test-boundary")
    }

    #[test]
    fn test_plain_layout() {
        let message = build_plain("a@example.com", "b@example.com", "Hi", "Hello");
        assert_eq!(
            message.as_str(),
            "From: a@example.com\r\nTo: b@example.com\r\nSubject: Hi\r\n\r\nHello"
        );
    }

    #[test]
    fn test_plain_body_untouched() {
        let body = "line one\nline two\r\n.\r\n";
        let message = build_plain("a@example.com", "b@example.com", "s", body);
        assert!(message.as_str().ends_with(body));
    }

    #[test]
    fn test_multipart_headers_in_order() {
        let message = sample().cc("c@example.com").cc("d@example.com").build().unwrap();
        let text = message.as_str();
        let (head, _) = text.split_once("\r\n\r\n").unwrap();

        let parsed = Headers::parse(head);
        let names: Vec<&str> = parsed.iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec!["From", "To", "Cc", "Subject", "MIME-Version", "Content-Type"]
        );
        assert!(head.contains("Cc: c@example.com;d@example.com\r\n"));
        assert!(head.contains("Content-Type: multipart/mixed; boundary=\"test-boundary\"\r\n"));
    }

    #[test]
    fn test_multipart_without_cc_has_no_cc_header() {
        let message = sample().to("e@example.com").build().unwrap();
        let text = message.as_str();
        assert!(text.contains("To: b@example.com;e@example.com\r\n"));
        assert!(!text.contains("Cc:"));
    }

    #[test]
    fn test_multipart_parts() {
        let message = sample().build().unwrap();
        let text = message.as_str();

        let markers = text.split("\r\n").filter(|l| *l == "--test-boundary").count();
        assert_eq!(markers, 2);
        assert!(text.ends_with("--test-boundary--\r\n"));

        let parts: Vec<&str> = text.split("--test-boundary\r\n").collect();
        assert_eq!(parts.len(), 3);

        let html = parts[1];
        assert!(html.starts_with("Content-Type: text/html; charset=\"utf-8\"\r\n"));
        assert!(html.contains("Content-Transfer-Encoding: 7bit\r\n"));
        assert!(html.contains("<html><body><h1>Quarterly numbers</h1></body></html>"));

        let attachment = parts[2];
        assert!(attachment.contains("Content-Type: application/pdf; name=\"report.pdf\"\r\n"));
        assert!(attachment.contains("Content-Transfer-Encoding: base64\r\n"));
        assert!(attachment.contains("Content-Disposition: attachment; filename=\"report.pdf\"\r\n"));

        let (_, body) = attachment.split_once("\r\n\r\n").unwrap();
        let body = body.trim_end_matches("--test-boundary--\r\n");
        assert_eq!(decode_base64(body).unwrap(), b"%PDF-1.4 binary\x00\xff");
    }

    fn html_part(message: &BuiltMessage) -> (String, String) {
        let parts: Vec<&str> = message.as_str().split("--test-boundary\r\n").collect();
        let (head, body) = parts[1].split_once("\r\n\r\n").unwrap();
        (head.to_string(), body.to_string())
    }

    #[test]
    fn test_non_ascii_html_is_base64() {
        let message = sample().html_body("Grüße").build().unwrap();
        let (head, body) = html_part(&message);

        assert!(head.contains("Content-Transfer-Encoding: base64"));
        assert!(body.is_ascii());
        assert_eq!(
            decode_base64(&body).unwrap(),
            "<html><body><h1>Grüße</h1></body></html>".as_bytes()
        );
    }

    #[test]
    fn test_long_html_line_is_base64() {
        let content = "x".repeat(MAX_7BIT_LINE_LENGTH);
        let message = sample().html_body(content.clone()).build().unwrap();
        let (head, body) = html_part(&message);

        assert!(head.contains("Content-Transfer-Encoding: base64"));
        for line in message.as_str().split("\r\n") {
            assert!(line.len() <= MAX_7BIT_LINE_LENGTH);
        }
        assert_eq!(decode_base64(&body).unwrap(), html_fragment(&content).into_bytes());
    }

    #[test]
    fn test_transfer_encoding_choice() {
        assert_eq!(TransferEncoding::for_text("plain ascii"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::for_text("é"), TransferEncoding::Base64);
        let edge = "a".repeat(MAX_7BIT_LINE_LENGTH);
        assert_eq!(TransferEncoding::for_text(&edge), TransferEncoding::SevenBit);
        assert_eq!(
            TransferEncoding::for_text(&format!("{edge}a")),
            TransferEncoding::Base64
        );
    }

    #[test]
    fn test_generated_boundary_is_random() {
        let a = sample().boundary_reset().build().unwrap();
        let b = sample().boundary_reset().build().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_explicit_boundary_collision() {
        let err = sample().html_body("contains test-boundary").build().unwrap_err();
        assert!(matches!(err, Error::BoundaryCollision(_)));
    }

    #[test]
    fn test_missing_from_and_to() {
        let err = MessageBuilder::new().to("b@example.com").build().unwrap_err();
        assert!(matches!(err, Error::MissingHeader("From")));

        let err = MessageBuilder::new().from("a@example.com").build().unwrap_err();
        assert!(matches!(err, Error::MissingHeader("To")));
    }

    #[test]
    fn test_unknown_extension_is_octet_stream() {
        let message = sample()
            .attach(Attachment::new("dump.zzz", vec![0, 1, 2]))
            .build()
            .unwrap();
        assert!(
            message
                .as_str()
                .contains("Content-Type: application/octet-stream; name=\"dump.zzz\"\r\n")
        );
    }

    impl MessageBuilder {
        fn boundary_reset(mut self) -> Self {
            self.boundary = None;
            self
        }
    }
}
