//! Base64 transfer encoding.

use crate::error::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Maximum encoded line length for MIME bodies (RFC 2045).
pub const MAX_LINE_LENGTH: usize = 76;

/// Encodes data as Base64 split into CRLF-terminated lines of at most
/// [`MAX_LINE_LENGTH`] characters.
///
/// Empty input yields an empty string.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2 + 2);

    // Base64 output is pure ASCII, so slicing on byte offsets is safe.
    let mut rest = encoded.as_str();
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest.len().min(MAX_LINE_LENGTH));
        result.push_str(line);
        result.push_str("\r\n");
        rest = tail;
    }

    result
}

/// Decodes Base64 data, ignoring any whitespace and line breaks.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned).map_err(Into::into)
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
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64_wrapped(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==\r\n");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_wrapped_lines_are_bounded() {
        let data = vec![0xAB_u8; 1000];
        let encoded = encode_base64_wrapped(&data);

        assert!(encoded.ends_with("\r\n"));
        for line in encoded.split("\r\n").filter(|l| !l.is_empty()) {
            assert!(line.len() <= MAX_LINE_LENGTH);
        }
        assert_eq!(decode_base64(&encoded).unwrap(), data);
    }

    #[test]
    fn test_wrapped_short_input_single_line() {
        assert_eq!(encode_base64_wrapped(b"abc"), "YWJj\r\n");
    }

    #[test]
    fn test_wrapped_empty() {
        assert_eq!(encode_base64_wrapped(b""), "");
        assert!(decode_base64("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_invalid() {
        assert!(decode_base64("not base64!").is_err());
    }
}
