//! Connection configuration types.

use std::time::Duration;

use crate::error::{Error, Result};

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// No encryption. **Only for local testing.**
    None,
    /// Start with plaintext, STARTTLS is required before AUTH (port 587).
    StartTls,
    /// TLS from the start (port 465).
    #[default]
    Implicit,
}

impl Security {
    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None => 25,
            Self::StartTls => 587,
            Self::Implicit => 465,
        }
    }

    /// Picks the security mode conventionally used on `port`.
    #[must_use]
    pub const fn for_port(port: u16) -> Self {
        match port {
            465 => Self::Implicit,
            _ => Self::StartTls,
        }
    }
}

/// SMTP connection configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Hostname announced in EHLO.
    pub client_hostname: String,
    /// Connection timeout (TCP connect and TLS handshake).
    pub connect_timeout: Duration,
    /// Per read/write timeout.
    pub io_timeout: Duration,
    /// Bound on a whole operation, from connect to the final reply.
    pub operation_timeout: Duration,
}

impl Config {
    /// Creates a new configuration with implicit TLS on port 465.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self::builder(host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }

    /// Parses a `host` or `host:port` server string.
    ///
    /// Without a port, implicit TLS on 465 is used. With a port, the
    /// security mode follows [`Security::for_port`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidServer`] if the host is empty or the port is
    /// not a number in `1..=65535`.
    pub fn from_server(server: &str) -> Result<Self> {
        let server = server.trim();
        let (host, port) = match server.rsplit_once(':') {
            // Bare IPv6 literals contain colons but no port.
            Some((host, _)) if host.contains(':') && !host.ends_with(']') => (server, None),
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .ok()
                    .filter(|p| *p != 0)
                    .ok_or_else(|| Error::InvalidServer(format!("bad port in {server:?}")))?;
                (host, Some(port))
            }
            None => (server, None),
        };

        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(Error::InvalidServer(format!("missing host in {server:?}")));
        }

        let builder = Self::builder(host);
        Ok(match port {
            Some(port) => builder.port(port).security(Security::for_port(port)).build(),
            None => builder.build(),
        })
    }
}

/// Builder for connection configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    client_hostname: String,
    connect_timeout: Duration,
    io_timeout: Duration,
    operation_timeout: Duration,
}

impl ConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::Implicit,
            client_hostname: "localhost".to_string(),
            connect_timeout: Duration::from_secs(30),
            io_timeout: Duration::from_secs(60),
            operation_timeout: Duration::from_secs(300),
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the hostname sent with EHLO.
    #[must_use]
    pub fn client_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.client_hostname = hostname.into();
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the I/O timeout.
    #[must_use]
    pub const fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Sets the overall operation timeout.
    #[must_use]
    pub const fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            host: self.host,
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            security: self.security,
            client_hostname: self.client_hostname,
            connect_timeout: self.connect_timeout,
            io_timeout: self.io_timeout,
            operation_timeout: self.operation_timeout,
        }
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
    fn test_default_ports() {
        assert_eq!(Security::None.default_port(), 25);
        assert_eq!(Security::StartTls.default_port(), 587);
        assert_eq!(Security::Implicit.default_port(), 465);
    }

    #[test]
    fn test_config_new() {
        let config = Config::new("smtp.example.com");
        assert_eq!(config.host, "smtp.example.com");
        assert_eq!(config.port, 465);
        assert_eq!(config.security, Security::Implicit);
        assert_eq!(config.client_hostname, "localhost");
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder("smtp.example.com")
            .security(Security::StartTls)
            .client_hostname("client.example.com")
            .io_timeout(Duration::from_secs(5))
            .operation_timeout(Duration::from_secs(20))
            .build();

        assert_eq!(config.port, 587);
        assert_eq!(config.client_hostname, "client.example.com");
        assert_eq!(config.io_timeout, Duration::from_secs(5));
        assert_eq!(config.operation_timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_from_server_host_only() {
        let config = Config::from_server("smtp.gmail.com").unwrap();
        assert_eq!(config.host, "smtp.gmail.com");
        assert_eq!(config.port, 465);
        assert_eq!(config.security, Security::Implicit);
    }

    #[test]
    fn test_from_server_with_port() {
        let config = Config::from_server("mail.example.com:587").unwrap();
        assert_eq!(config.host, "mail.example.com");
        assert_eq!(config.port, 587);
        assert_eq!(config.security, Security::StartTls);

        let config = Config::from_server("mail.example.com:465").unwrap();
        assert_eq!(config.security, Security::Implicit);
    }

    #[test]
    fn test_from_server_ipv6() {
        let config = Config::from_server("[::1]:2525").unwrap();
        assert_eq!(config.host, "::1");
        assert_eq!(config.port, 2525);

        let config = Config::from_server("::1").unwrap();
        assert_eq!(config.host, "::1");
        assert_eq!(config.port, 465);
    }

    #[test]
    fn test_from_server_invalid() {
        assert!(matches!(
            Config::from_server("mail.example.com:smtp"),
            Err(Error::InvalidServer(_))
        ));
        assert!(Config::from_server("mail.example.com:0").is_err());
        assert!(Config::from_server(":25").is_err());
        assert!(Config::from_server("").is_err());
    }
}
