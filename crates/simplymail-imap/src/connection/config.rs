//! Where and how to connect.

use std::time::Duration;

/// Transport protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// Plain TCP throughout. Meant for loopback tests.
    None,
    /// Plain TCP upgraded with STARTTLS before LOGIN.
    StartTls,
    /// TLS handshake right after connecting.
    #[default]
    Implicit,
}

impl Security {
    /// 993 for implicit TLS, 143 otherwise.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Implicit => 993,
            Self::None | Self::StartTls => 143,
        }
    }
}

/// Connection settings for one server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host name, also used for certificate verification.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Transport protection.
    pub security: Security,
    /// Limit for the TCP connect plus the TLS handshake.
    pub connect_timeout: Duration,
    /// Limit for each read or write once connected.
    pub io_timeout: Duration,
}

impl Config {
    /// Implicit TLS on port 993 with default timeouts.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self::builder(host).build()
    }

    /// Starts a [`ConfigBuilder`] for `host`.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder {
            host: host.into(),
            port: None,
            security: Security::default(),
            connect_timeout: ConfigBuilder::CONNECT_TIMEOUT,
            io_timeout: ConfigBuilder::IO_TIMEOUT,
        }
    }
}

/// Builder for [`Config`]. The port follows the security mode unless set.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl ConfigBuilder {
    const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
    const IO_TIMEOUT: Duration = Duration::from_secs(60);

    /// Uses `port` instead of the security mode's default.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the transport protection.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the connect plus handshake limit.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per read or write limit.
    #[must_use]
    pub const fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Finishes the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        let port = self.port.unwrap_or(self.security.default_port());
        Config {
            host: self.host,
            port,
            security: self.security,
            connect_timeout: self.connect_timeout,
            io_timeout: self.io_timeout,
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
    fn test_defaults() {
        let config = Config::new("imap.example.com");
        assert_eq!(config.host, "imap.example.com");
        assert_eq!((config.port, config.security), (993, Security::Implicit));
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.io_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_port_follows_security_unless_set() {
        let starttls = Config::builder("imap.example.com")
            .security(Security::StartTls)
            .build();
        assert_eq!(starttls.port, 143);

        let explicit = Config::builder("imap.example.com")
            .port(10993)
            .io_timeout(Duration::from_millis(250))
            .build();
        assert_eq!((explicit.port, explicit.security), (10993, Security::Implicit));
        assert_eq!(explicit.io_timeout, Duration::from_millis(250));
    }
}
