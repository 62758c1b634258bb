//! File attachments.

use crate::content_type::ContentType;

/// An attachment: display filename, content type and raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    filename: String,
    content_type: ContentType,
    data: Vec<u8>,
}

impl Attachment {
    /// Creates an attachment, guessing the content type from `filename`.
    #[must_use]
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = ContentType::from_filename(&filename);
        Self {
            filename,
            content_type,
            data,
        }
    }

    /// Overrides the guessed content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Returns the filename shown to recipients.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns the content type.
    #[must_use]
    pub const fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
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
    fn test_new_guesses_type() {
        let attachment = Attachment::new("invoice.pdf", vec![1, 2, 3]);
        assert_eq!(attachment.filename(), "invoice.pdf");
        assert_eq!(attachment.content_type().essence(), "application/pdf");
        assert_eq!(attachment.data(), &[1, 2, 3]);
    }

    #[test]
    fn test_with_content_type() {
        let attachment =
            Attachment::new("data.bin", Vec::new()).with_content_type(ContentType::text_plain());
        assert_eq!(attachment.content_type().essence(), "text/plain");
    }
}
