//! # mailsend-smtp
//!
//! SMTP submission client for servers that speak TLS from the first byte
//! (implicit TLS, port 465), following RFC 5321.
//!
//! ## Features
//!
//! - **Type-state connection management**: Compile-time enforcement of valid
//!   SMTP state transitions
//! - **Protocol subset**: EHLO, AUTH PLAIN, MAIL FROM, RCPT TO, DATA, QUIT
//! - **Implicit TLS**: rustls with the webpki root store; certificate
//!   verification can only be disabled explicitly
//! - **One-shot delivery**: [`deliver`] runs a whole session and reports
//!   the step that failed
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailsend_smtp::{Credentials, Envelope, ImplicitTls, TlsSettings, deliver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connector = ImplicitTls::new(TlsSettings::new("smtp.example.com"));
//!     let credentials = Credentials::new("a@example.com", "p");
//!     let envelope = Envelope::parse("a@example.com", ["b@example.com"])?;
//!
//!     let message = b"From: a@example.com\r\nTo: b@example.com\r\nSubject: Hi\r\n\r\nHello";
//!     deliver(&connector, "localhost", &credentials, &envelope, message).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! Connected ── auth_plain() ──→ Authenticated ── mail_from() ──→ MailTransaction
//!                                     ↑                                │
//!                                     │                            rcpt_to()
//!                               send_message()                         ↓
//!                                     │                          RecipientAdded
//!                                    Data ←────────── data() ──────────┘
//! ```
//!
//! A rejected reply in any state closes the session with a best-effort
//! `QUIT` before the error is returned.
//!
//! ## Modules
//!
//! - [`command`]: SMTP command builders
//! - [`connection`]: Transport, TLS connector and type-state client
//! - [`parser`]: Response parser
//! - [`types`]: Core SMTP types (addresses, extensions, replies)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
mod session;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Connector, Data, ImplicitTls, MailTransaction,
    RecipientAdded, SMTPS_PORT, ServerInfo, SmtpStream, TlsSettings, connect_tls,
};
pub use error::{Error, Result};
pub use session::{Credentials, Envelope, SessionError, deliver};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
