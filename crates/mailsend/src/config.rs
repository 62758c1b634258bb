//! Connection configuration.

use crate::error::{Error, Result};
use mailsend_smtp::{Credentials, SMTPS_PORT, TlsSettings};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

const DEFAULT_CLIENT_NAME: &str = "localhost";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(60);

/// SMTP submission settings.
///
/// `username` is both the AUTH identity and the `From` address of the
/// messages sent by [`Mailer`](crate::Mailer).
///
/// Deserializes from JSON with every field except `host`, `username` and
/// `password` optional:
///
/// ```json
/// {
///   "host": "smtp.example.com",
///   "username": "a@example.com",
///   "password": "p",
///   "connect_timeout_secs": 10
/// }
/// ```
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Server hostname.
    pub host: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Authentication identity and sender address.
    pub username: String,
    /// Password for AUTH PLAIN.
    pub password: String,
    /// Name sent with EHLO.
    #[serde(default = "default_client_name")]
    pub client_name: String,
    /// Skip server certificate verification.
    #[serde(default)]
    pub accept_invalid_certs: bool,
    /// Bound on TCP connect plus TLS handshake. Zero disables it.
    #[serde(default = "default_connect_timeout", rename = "connect_timeout_secs", with = "secs")]
    pub connect_timeout: Duration,
    /// Bound on each read and write. Zero disables it.
    #[serde(default = "default_io_timeout", rename = "io_timeout_secs", with = "secs")]
    pub io_timeout: Duration,
}

impl Config {
    /// Creates a configuration with defaults for everything but the
    /// server and credentials.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::builder(host).credentials(username, password).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }

    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the JSON is malformed or a required
    /// field is missing.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    pub(crate) fn tls_settings(&self) -> TlsSettings {
        TlsSettings {
            host: self.host.clone(),
            port: self.port,
            accept_invalid_certs: self.accept_invalid_certs,
            connect_timeout: enabled(self.connect_timeout),
            io_timeout: enabled(self.io_timeout),
        }
    }

    pub(crate) fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("client_name", &self.client_name)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("connect_timeout", &self.connect_timeout)
            .field("io_timeout", &self.io_timeout)
            .finish()
    }
}

/// Builder for [`Config`].
#[derive(Clone)]
pub struct ConfigBuilder {
    host: String,
    port: u16,
    username: String,
    password: String,
    client_name: String,
    accept_invalid_certs: bool,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl ConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: SMTPS_PORT,
            username: String::new(),
            password: String::new(),
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            accept_invalid_certs: false,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the username and password.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the name sent with EHLO.
    #[must_use]
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    /// Disables server certificate verification.
    ///
    /// Only for test servers with self-signed certificates.
    #[must_use]
    pub const fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Sets the connection timeout. Zero disables it.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the I/O timeout. Zero disables it.
    #[must_use]
    pub const fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            host: self.host,
            port: self.port,
            username: self.username,
            password: self.password,
            client_name: self.client_name,
            accept_invalid_certs: self.accept_invalid_certs,
            connect_timeout: self.connect_timeout,
            io_timeout: self.io_timeout,
        }
    }
}

impl fmt::Debug for ConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigBuilder")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

fn enabled(timeout: Duration) -> Option<Duration> {
    (!timeout.is_zero()).then_some(timeout)
}

const fn default_port() -> u16 {
    SMTPS_PORT
}

fn default_client_name() -> String {
    DEFAULT_CLIENT_NAME.to_string()
}

const fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

const fn default_io_timeout() -> Duration {
    DEFAULT_IO_TIMEOUT
}

mod secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
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
    fn test_config_new_defaults() {
        let config = Config::new("smtp.example.com", "a@example.com", "p");
        assert_eq!(config.host, "smtp.example.com");
        assert_eq!(config.port, 465);
        assert_eq!(config.client_name, "localhost");
        assert!(!config.accept_invalid_certs);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.io_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_builder() {
        let config = Config::builder("smtp.example.com")
            .port(2465)
            .credentials("a@example.com", "p")
            .client_name("client.example.com")
            .accept_invalid_certs(true)
            .connect_timeout(Duration::from_secs(5))
            .io_timeout(Duration::from_secs(10))
            .build();

        assert_eq!(config.port, 2465);
        assert_eq!(config.client_name, "client.example.com");
        assert!(config.accept_invalid_certs);

        let settings = config.tls_settings();
        assert_eq!(settings.port, 2465);
        assert!(settings.accept_invalid_certs);
        assert_eq!(settings.io_timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = Config::new("smtp.example.com", "a@example.com", "hunter2");
        let shown = format!("{config:?}");
        assert!(shown.contains("a@example.com"));
        assert!(!shown.contains("hunter2"));

        let builder = Config::builder("smtp.example.com").credentials("a@example.com", "hunter2");
        assert!(!format!("{builder:?}").contains("hunter2"));
    }

    #[test]
    fn test_from_json_defaults() {
        let config = Config::from_json(
            r#"{"host": "smtp.example.com", "username": "a@example.com", "password": "p"}"#,
        )
        .unwrap();
        assert_eq!(config, Config::new("smtp.example.com", "a@example.com", "p"));
    }

    #[test]
    fn test_from_json_overrides() {
        let config = Config::from_json(
            r#"{
                "host": "mail.example.org",
                "port": 2465,
                "username": "a@example.org",
                "password": "p",
                "client_name": "relay",
                "accept_invalid_certs": true,
                "connect_timeout_secs": 5,
                "io_timeout_secs": 15
            }"#,
        )
        .unwrap();
        assert_eq!(config.port, 2465);
        assert_eq!(config.client_name, "relay");
        assert!(config.accept_invalid_certs);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.io_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_zero_timeouts_disable_bounds() {
        let config = Config::from_json(
            r#"{
                "host": "smtp.example.com",
                "username": "a@example.com",
                "password": "p",
                "connect_timeout_secs": 0,
                "io_timeout_secs": 0
            }"#,
        )
        .unwrap();

        let settings = config.tls_settings();
        assert_eq!(settings.connect_timeout, None);
        assert_eq!(settings.io_timeout, None);

        let settings = Config::new("smtp.example.com", "a@example.com", "p").tls_settings();
        assert_eq!(settings.connect_timeout, Some(Duration::from_secs(30)));
        assert_eq!(settings.io_timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_from_json_missing_field() {
        let err = Config::from_json(r#"{"host": "smtp.example.com"}"#).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("username")));
    }
}
