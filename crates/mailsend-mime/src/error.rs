//! Error types for message construction.

use std::io;
use std::path::PathBuf;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Attachment source could not be read.
    #[error("Failed to read attachment {}: {source}", path.display())]
    Read {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// Missing required header.
    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    /// Boundary occurs inside the content it is meant to delimit.
    #[error("Boundary {0:?} collides with message content")]
    BoundaryCollision(String),

    /// Boundary is empty, too long, or contains characters not allowed
    /// by RFC 2046.
    #[error("Invalid boundary: {0:?}")]
    InvalidBoundary(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}
