#![allow(clippy::doc_markdown, clippy::uninlined_format_args)]
//! Example: send a plain message, and optionally one with an attachment
//!
//! Reads the account from a JSON file:
//!
//! ```json
//! {
//!   "host": "smtp.example.com",
//!   "username": "a@example.com",
//!   "password": "app-password"
//! }
//! ```
//!
//! ## Running
//!
//! ```bash
//! RUST_LOG=mailsend_smtp=debug cargo run --package mailsend --example send -- \
//!     account.json b@example.com [attachment-path]
//! ```

use std::path::Path;

use mailsend::{AttachmentMail, Config, Mailer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailsend=debug,mailsend_smtp=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(config_path), Some(to)) = (args.next(), args.next()) else {
        eprintln!("usage: send <config.json> <recipient> [attachment]");
        std::process::exit(2);
    };

    let config = Config::from_json(&std::fs::read_to_string(&config_path)?)?;
    println!("Sending as {} via {}:{}", config.username, config.host, config.port);
    let mailer = Mailer::new(config);

    mailer
        .send_plain(&to, "mailsend test", "Hello from mailsend.")
        .await?;
    println!("✓ Plain message accepted");

    if let Some(path) = args.next() {
        let name = Path::new(&path)
            .file_name()
            .map_or_else(|| "attachment".to_string(), |n| n.to_string_lossy().into_owned());
        let mail = AttachmentMail::new("mailsend attachment test", "See attached", name, &path).to(&to);

        mailer.send_with_attachment(&mail).await?;
        println!("✓ Attachment message accepted");
    }

    Ok(())
}
