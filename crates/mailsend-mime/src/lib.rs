//! # mailsend-mime
//!
//! RFC 2822 / MIME message builder for outgoing mail.
//!
//! ## Features
//!
//! - **Plain messages**: `From`/`To`/`Subject` headers and a literal body
//! - **Multipart messages**: `multipart/mixed` with an HTML part and a
//!   Base64-encoded attachment; the HTML part falls back to Base64 when it
//!   is not short-lined ASCII
//! - **Ordered headers**: deterministic header emission order
//! - **Random boundaries**: per-message boundaries checked against content
//! - **Content types**: attachment types guessed from the filename
//!
//! ## Quick Start
//!
//! ### Plain Messages
//!
//! ```ignore
//! use mailsend_mime::build_plain;
//!
//! let message = build_plain("a@example.com", "b@example.com", "Hi", "Hello");
//! assert!(message.as_str().ends_with("\r\n\r\nHello"));
//! ```
//!
//! ### Attachments
//!
//! ```ignore
//! use mailsend_mime::{Attachment, MessageBuilder};
//!
//! let message = MessageBuilder::new()
//!     .from("sender@example.com")
//!     .to("recipient@example.com")
//!     .cc("audit@example.com")
//!     .subject("Document")
//!     .html_body("Please find the attached document.")
//!     .attach(Attachment::new("document.pdf", std::fs::read("/srv/out/document.pdf")?))
//!     .build()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod attachment;
mod content_type;
mod error;
mod header;
mod message;

pub mod boundary;
pub mod encoding;

pub use attachment::Attachment;
pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{
    ADDRESS_SEPARATOR, BuiltMessage, MAX_7BIT_LINE_LENGTH, MessageBuilder, TransferEncoding,
    build_plain, html_fragment,
};
