//! Multipart boundary generation and validation.

use crate::error::{Error, Result};
use uuid::Uuid;

/// Longest boundary allowed by RFC 2046.
pub const MAX_BOUNDARY_LENGTH: usize = 70;

/// Prefix of generated boundaries. `=_` never occurs in Base64 output.
const PREFIX: &str = "=_mailsend_";

/// Generates a fresh random boundary.
#[must_use]
pub fn generate_boundary() -> String {
    format!("{PREFIX}{}", Uuid::new_v4().simple())
}

/// Generates a boundary that does not occur in any of `contents`.
#[must_use]
pub fn generate_boundary_for(contents: &[&str]) -> String {
    loop {
        let boundary = generate_boundary();
        if !collides(&boundary, contents) {
            return boundary;
        }
        tracing::debug!(%boundary, "generated boundary collides with content, retrying");
    }
}

/// Checks that a caller-supplied boundary is well formed and absent from
/// the content it will delimit.
///
/// # Errors
///
/// Returns [`Error::InvalidBoundary`] for malformed boundaries and
/// [`Error::BoundaryCollision`] if the boundary occurs in `contents`.
pub fn validate_boundary(boundary: &str, contents: &[&str]) -> Result<()> {
    if boundary.is_empty()
        || boundary.len() > MAX_BOUNDARY_LENGTH
        || boundary.ends_with(' ')
        || !boundary.chars().all(is_bchar)
    {
        return Err(Error::InvalidBoundary(boundary.to_string()));
    }

    if collides(boundary, contents) {
        return Err(Error::BoundaryCollision(boundary.to_string()));
    }

    Ok(())
}

fn collides(boundary: &str, contents: &[&str]) -> bool {
    contents.iter().any(|content| content.contains(boundary))
}

/// `bchars` from RFC 2046 section 5.1.1.
const fn is_bchar(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '\'' | '(' | ')' | '+' | '_' | ',' | '-' | '.' | '/' | ':' | '=' | '?' | ' '
        )
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
    fn test_generated_boundaries_differ() {
        let a = generate_boundary();
        let b = generate_boundary();
        assert_ne!(a, b);
        assert!(a.starts_with(PREFIX));
        assert!(a.len() <= MAX_BOUNDARY_LENGTH);
    }

    #[test]
    fn test_generated_boundary_is_valid() {
        let boundary = generate_boundary_for(&["hello"]);
        assert!(validate_boundary(&boundary, &["hello"]).is_ok());
    }

    #[test]
    fn test_validate_rejects_collision() {
        let err = validate_boundary("frontier", &["a frontier town"]).unwrap_err();
        assert!(matches!(err, Error::BoundaryCollision(_)));
    }

    #[test]
    fn test_validate_rejects_malformed() {
        assert!(matches!(
            validate_boundary("", &[]),
            Err(Error::InvalidBoundary(_))
        ));
        assert!(matches!(
            validate_boundary(&"x".repeat(71), &[]),
            Err(Error::InvalidBoundary(_))
        ));
        assert!(matches!(
            validate_boundary("bad\"quote", &[]),
            Err(Error::InvalidBoundary(_))
        ));
        assert!(matches!(
            validate_boundary("trailing ", &[]),
            Err(Error::InvalidBoundary(_))
        ));
    }

    #[test]
    fn test_validate_accepts_legacy_style() {
        assert!(validate_boundary("simple-boundary_42", &["body"]).is_ok());
    }
}
