//! Property tests for message serialization.

#![allow(clippy::unwrap_used)]

use mailsend_mime::encoding::decode_base64;
use mailsend_mime::{Attachment, Headers, MessageBuilder, build_plain};
use proptest::prelude::*;

/// Splits a multipart message into its parts using the part-opening
/// delimiter lines.
fn split_parts<'a>(message: &'a str, boundary: &str) -> Vec<&'a str> {
    let marker = format!("--{boundary}\r\n");
    message.split(marker.as_str()).skip(1).collect()
}

fn header_field() -> impl Strategy<Value = String> {
    "[A-Za-z0-9@._ -]{1,40}"
}

proptest! {
    #[test]
    fn plain_message_has_one_header_block_and_literal_body(
        from in header_field(),
        to in header_field(),
        subject in header_field(),
        body in "[^\r]{0,200}",
    ) {
        let message = build_plain(&from, &to, &subject, &body);
        let text = message.as_str();

        let (head, rest) = text.split_once("\r\n\r\n").unwrap();
        prop_assert_eq!(rest, body.as_str());

        let headers = Headers::parse(head);
        prop_assert_eq!(headers.len(), 3);
        prop_assert_eq!(headers.get("From"), Some(from.trim()));
        prop_assert_eq!(headers.get("To"), Some(to.trim()));
        prop_assert_eq!(headers.get("Subject"), Some(subject.trim()));
    }

    #[test]
    fn attachment_round_trips_through_base64(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let message = MessageBuilder::new()
            .from("a@example.com")
            .to("b@example.com")
            .subject("bytes")
            .html_body("see attachment")
            .attach(Attachment::new("blob.bin", data.clone()))
            .boundary("prop-boundary")
            .build()
            .unwrap();

        let parts = split_parts(message.as_str(), "prop-boundary");
        prop_assert_eq!(parts.len(), 2);

        let (_, encoded) = parts[1].split_once("\r\n\r\n").unwrap();
        let encoded = encoded.trim_end_matches("--prop-boundary--\r\n");
        prop_assert_eq!(decode_base64(encoded).unwrap(), data);
    }

    #[test]
    fn parts_split_cleanly_on_boundary(
        boundary in "[A-Za-z0-9'()+_,./:=?-]{1,60}",
        html in "[a-z ]{0,80}",
    ) {
        prop_assume!(!html.contains(boundary.as_str()));
        // An all-dash boundary is a suffix of its own close delimiter.
        prop_assume!(!boundary.chars().all(|c| c == '-'));

        let message = MessageBuilder::new()
            .from("a@example.com")
            .to("b@example.com")
            .subject("split")
            .html_body(html.clone())
            .attach(Attachment::new("notes.txt", html.clone().into_bytes()))
            .boundary(boundary.clone())
            .build();

        // Base64 output may itself contain a short boundary; that is reported.
        let Ok(message) = message else {
            return Ok(());
        };

        let marker = format!("--{boundary}");
        let markers = message
            .as_str()
            .split("\r\n")
            .filter(|line| *line == marker)
            .count();
        prop_assert_eq!(markers, 2);

        let parts = split_parts(message.as_str(), &boundary);
        prop_assert_eq!(parts.len(), 2);
        prop_assert!(parts[0].starts_with("Content-Type: text/html"));
        let html_fragment = format!("<h1>{html}</h1>");
        prop_assert!(parts[0].contains(html_fragment.as_str()));
        prop_assert!(parts[1].starts_with("Content-Type: text/plain"));
    }
}
