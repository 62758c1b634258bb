//! Implicit TLS connections (SMTPS, port 465).

use super::SmtpStream;
use crate::error::{Error, Result};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};

/// Default port for SMTP submission over implicit TLS.
pub const SMTPS_PORT: u16 = 465;

/// Opens the transport for one SMTP session.
///
/// Implementations decide how bytes reach the server; the session only
/// needs a ready [`SmtpStream`].
pub trait Connector {
    /// Transport produced by this connector.
    type Stream: AsyncRead + AsyncWrite + Unpin;

    /// Opens a new connection.
    fn connect(&self) -> impl Future<Output = Result<SmtpStream<Self::Stream>>>;

    /// Describes the remote endpoint for logs.
    fn endpoint(&self) -> String;
}

/// Settings for an implicit TLS connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSettings {
    /// Server hostname, also used for SNI and certificate checks.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Skip server certificate verification.
    pub accept_invalid_certs: bool,
    /// Bound on TCP connect plus TLS handshake.
    pub connect_timeout: Option<Duration>,
    /// Bound on each read and write once connected.
    pub io_timeout: Option<Duration>,
}

impl TlsSettings {
    /// Creates settings for `host` on port 465 with certificate
    /// verification enabled.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: SMTPS_PORT,
            accept_invalid_certs: false,
            connect_timeout: Some(Duration::from_secs(30)),
            io_timeout: Some(Duration::from_secs(60)),
        }
    }
}

/// Connector that performs the TLS handshake as the first action on the
/// socket.
#[derive(Debug, Clone)]
pub struct ImplicitTls {
    settings: TlsSettings,
}

impl ImplicitTls {
    /// Creates a connector from settings.
    #[must_use]
    pub const fn new(settings: TlsSettings) -> Self {
        Self { settings }
    }

    /// Returns the connection settings.
    #[must_use]
    pub const fn settings(&self) -> &TlsSettings {
        &self.settings
    }
}

impl Connector for ImplicitTls {
    type Stream = TlsStream<TcpStream>;

    async fn connect(&self) -> Result<SmtpStream<Self::Stream>> {
        connect_tls(&self.settings).await
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.settings.host, self.settings.port)
    }
}

/// Connects to an SMTP server over implicit TLS.
///
/// # Errors
///
/// Returns an error if the connection or TLS handshake fails or does not
/// finish within the connect timeout.
pub async fn connect_tls(settings: &TlsSettings) -> Result<SmtpStream<TlsStream<TcpStream>>> {
    let addr = format!("{}:{}", settings.host, settings.port);
    let server_name = ServerName::try_from(settings.host.clone())
        .map_err(|_| Error::Protocol(format!("Invalid hostname: {}", settings.host)))?;

    if settings.accept_invalid_certs {
        tracing::warn!(host = %settings.host, "TLS certificate verification is disabled");
    }
    let connector = create_tls_connector(settings.accept_invalid_certs);

    let handshake = async {
        let tcp_stream = TcpStream::connect(&addr).await?;
        tracing::debug!(%addr, "TCP connection established");
        connector.connect(server_name, tcp_stream).await
    };

    let tls_stream = match settings.connect_timeout {
        Some(limit) => tokio::time::timeout(limit, handshake)
            .await
            .map_err(|_| Error::Timeout(limit))??,
        None => handshake.await?,
    };

    tracing::debug!(%addr, "TLS handshake complete");
    Ok(SmtpStream::tls(tls_stream).with_io_timeout(settings.io_timeout))
}

/// Creates a TLS connector trusting the webpki roots, or trusting any
/// certificate when `accept_invalid_certs` is set.
fn create_tls_connector(accept_invalid_certs: bool) -> TlsConnector {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let mut config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    if accept_invalid_certs {
        config
            .dangerous()
            .set_certificate_verifier(Arc::new(NoVerifier));
    }

    TlsConnector::from(Arc::new(config))
}

/// Accepts every server certificate. Only installed on explicit opt-in.
#[derive(Debug)]
struct NoVerifier;

impl ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ED25519,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
        ]
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
    fn test_settings_defaults() {
        let settings = TlsSettings::new("smtp.example.com");
        assert_eq!(settings.port, 465);
        assert!(!settings.accept_invalid_certs);
        assert_eq!(settings.connect_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_endpoint() {
        let mut settings = TlsSettings::new("smtp.example.com");
        settings.port = 2465;
        assert_eq!(ImplicitTls::new(settings).endpoint(), "smtp.example.com:2465");
    }

    #[tokio::test]
    async fn test_invalid_hostname_rejected_before_connecting() {
        let settings = TlsSettings::new("not a hostname");
        let err = connect_tls(&settings).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(msg) if msg.contains("Invalid hostname")));
    }

    #[tokio::test]
    async fn test_refused_connection_is_io_error() {
        // Port 1 on loopback is closed on any sane test host.
        let mut settings = TlsSettings::new("127.0.0.1");
        settings.port = 1;
        let err = connect_tls(&settings).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
