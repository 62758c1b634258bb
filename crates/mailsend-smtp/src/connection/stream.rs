//! Low-level SMTP stream handling.

use crate::error::{Error, Result};
use std::fmt;
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Line-oriented SMTP stream over any byte transport.
///
/// The stream records whether the transport is encrypted so that the
/// client can refuse to send PLAIN credentials in the clear.
pub struct SmtpStream<S> {
    reader: BufReader<S>,
    encrypted: bool,
    io_timeout: Option<Duration>,
}

impl<S> SmtpStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an unencrypted transport.
    pub fn plain(inner: S) -> Self {
        Self {
            reader: BufReader::new(inner),
            encrypted: false,
            io_timeout: None,
        }
    }

    /// Wraps a transport that is already protected by TLS.
    pub fn tls(inner: S) -> Self {
        Self {
            reader: BufReader::new(inner),
            encrypted: true,
            io_timeout: None,
        }
    }

    /// Bounds every read and write by `timeout`.
    #[must_use]
    pub const fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Returns true if the transport is encrypted.
    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Reads a line from the stream, without the line terminator.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or times out, and
    /// [`Error::ConnectionClosed`] at end of stream.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = bounded(self.io_timeout, self.reader.read_line(&mut line)).await?;
        if read == 0 {
            return Err(Error::ConnectionClosed);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Writes data to the stream and flushes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or times out.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let inner = self.reader.get_mut();
        bounded(self.io_timeout, async {
            inner.write_all(data).await?;
            inner.flush().await
        })
        .await
    }

    /// Shuts the write side down (TLS `close_notify` for TLS transports).
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown fails or times out.
    pub async fn shutdown(&mut self) -> Result<()> {
        let inner = self.reader.get_mut();
        bounded(self.io_timeout, inner.shutdown()).await
    }
}

impl<S> fmt::Debug for SmtpStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpStream")
            .field("encrypted", &self.encrypted)
            .field("io_timeout", &self.io_timeout)
            .finish_non_exhaustive()
    }
}

async fn bounded<T>(
    limit: Option<Duration>,
    operation: impl Future<Output = io::Result<T>>,
) -> Result<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, operation)
            .await
            .map_err(|_| Error::Timeout(limit))?
            .map_err(Into::into),
        None => operation.await.map_err(Into::into),
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
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_read_line_strips_crlf() {
        let mock = Builder::new().read(b"220 ready\r\n250 OK\r\n").build();
        let mut stream = SmtpStream::tls(mock);

        assert_eq!(stream.read_line().await.unwrap(), "220 ready");
        assert_eq!(stream.read_line().await.unwrap(), "250 OK");
    }

    #[tokio::test]
    async fn test_read_line_eof_is_connection_closed() {
        let mock = Builder::new().build();
        let mut stream = SmtpStream::plain(mock);

        assert!(matches!(
            stream.read_line().await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_write_all() {
        let mock = Builder::new().write(b"QUIT\r\n").build();
        let mut stream = SmtpStream::plain(mock);
        stream.write_all(b"QUIT\r\n").await.unwrap();
        assert!(!stream.is_encrypted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_timeout() {
        let mock = Builder::new().wait(Duration::from_secs(10)).build();
        let mut stream = SmtpStream::tls(mock).with_io_timeout(Some(Duration::from_secs(1)));

        let err = stream.read_line().await.unwrap_err();
        assert!(matches!(err, Error::Timeout(d) if d == Duration::from_secs(1)));
    }
}
