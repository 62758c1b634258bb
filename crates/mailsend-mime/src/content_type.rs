//! MIME content type handling.

use std::fmt;

/// MIME content type with ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "application", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "octet-stream").
    pub sub_type: String,
    /// Parameters in emission order (e.g., charset, boundary, name).
    pub parameters: Vec<(String, String)>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: Vec::new(),
        }
    }

    /// Creates a text/plain content type.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "utf-8")
    }

    /// Creates a text/html content type.
    #[must_use]
    pub fn text_html() -> Self {
        Self::new("text", "html").with_parameter("charset", "utf-8")
    }

    /// Creates a multipart/mixed content type with boundary.
    #[must_use]
    pub fn multipart_mixed(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "mixed").with_parameter("boundary", boundary)
    }

    /// Creates an application/octet-stream content type.
    #[must_use]
    pub fn octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// Guesses the content type from a filename extension.
    ///
    /// Unknown extensions map to `application/octet-stream`.
    #[must_use]
    pub fn from_filename(filename: &str) -> Self {
        mime_guess::from_path(filename)
            .first()
            .map_or_else(Self::octet_stream, |mime| {
                Self::new(mime.type_().as_str(), mime.subtype().as_str())
            })
    }

    /// Adds a parameter, replacing an existing one with the same key.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self
            .parameters
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            Some(slot) => slot.1 = value,
            None => self.parameters.push((key, value)),
        }
        self
    }

    /// Returns the bare `type/subtype` string.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;

        // Always quoted; boundaries and filenames routinely contain tspecials.
        for (key, value) in &self.parameters {
            write!(f, "; {key}=\"{value}\"")?;
        }

        Ok(())
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

    #[test]
    fn test_content_type_new() {
        let ct = ContentType::new("text", "plain");
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert!(ct.parameters.is_empty());
    }

    #[test]
    fn test_text_html_display() {
        assert_eq!(
            ContentType::text_html().to_string(),
            "text/html; charset=\"utf-8\""
        );
    }

    #[test]
    fn test_multipart_mixed() {
        let ct = ContentType::multipart_mixed("boundary123");
        assert_eq!(
            ct.parameters,
            vec![("boundary".to_string(), "boundary123".to_string())]
        );
        assert_eq!(ct.to_string(), "multipart/mixed; boundary=\"boundary123\"");
    }

    #[test]
    fn test_from_filename() {
        assert_eq!(ContentType::from_filename("report.pdf").essence(), "application/pdf");
        assert_eq!(ContentType::from_filename("photo.PNG").essence(), "image/png");
        assert_eq!(ContentType::from_filename("notes.txt").essence(), "text/plain");
    }

    #[test]
    fn test_from_filename_unknown_is_octet_stream() {
        assert_eq!(
            ContentType::from_filename("blob.unknownext").essence(),
            "application/octet-stream"
        );
        assert_eq!(
            ContentType::from_filename("no_extension").essence(),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_with_parameter_replaces() {
        let ct = ContentType::new("text", "plain")
            .with_parameter("charset", "iso-8859-1")
            .with_parameter("format", "flowed")
            .with_parameter("Charset", "utf-8");

        assert_eq!(
            ct.parameters,
            vec![
                ("charset".to_string(), "utf-8".to_string()),
                ("format".to_string(), "flowed".to_string()),
            ]
        );
    }
}
