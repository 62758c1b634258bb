//! # mailsend
//!
//! Send plain text and HTML-with-attachment emails through an SMTP server
//! that requires TLS from the first byte (port 465).
//!
//! The message is always built before any connection is opened; the
//! session then runs EHLO, AUTH PLAIN, MAIL FROM, RCPT TO for every
//! recipient, DATA and QUIT, stopping at the first failure.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailsend::{AttachmentMail, Config, Mailer};
//!
//! #[tokio::main]
//! async fn main() -> mailsend::Result<()> {
//!     let config = Config::new("smtp.example.com", "a@example.com", "p");
//!     let mailer = Mailer::new(config);
//!
//!     mailer.send_plain("b@example.com", "Hi", "Hello").await?;
//!
//!     let mail = AttachmentMail::new("Report", "Monthly report", "report.pdf", "out/report.pdf")
//!         .to("b@example.com")
//!         .cc("c@example.com");
//!     mailer.send_with_attachment(&mail).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod mailer;

pub use config::{Config, ConfigBuilder};
pub use error::{Error, ErrorKind, Result};
pub use mailer::{AttachmentMail, Mailer};

pub use mailsend_mime as mime;
pub use mailsend_smtp as smtp;
