//! Error types for SMTP operations.

use std::io;
use std::time::Duration;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error on an established connection.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The TCP connection could not be established.
    #[error("Could not connect to {address}: {source}")]
    Connect {
        /// `host:port` that was dialed.
        address: String,
        /// Underlying socket error.
        source: io::Error,
    },

    /// TLS error (certificate validation or TLS protocol violation).
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// The TLS handshake failed at the transport level.
    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),

    /// The hostname cannot be used as a TLS server name.
    #[error("Invalid hostname for TLS: {0}")]
    InvalidDnsName(String),

    /// STARTTLS is required but the server does not offer it.
    #[error("Server does not offer STARTTLS")]
    StartTlsUnavailable,

    /// The server closed the connection.
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// A connect, read or write did not finish in time.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The server greeting was not `220`.
    #[error("Unexpected greeting {code}: {message}")]
    Greeting {
        /// Reply code of the greeting.
        code: u16,
        /// Greeting text.
        message: String,
    },

    /// Server returned error response (4xx or 5xx).
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code (e.g., 550).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Server returned a non-error reply other than the one the command requires.
    #[error("Unexpected reply {code}: {message}")]
    UnexpectedReply {
        /// Reply code.
        code: u16,
        /// Reply text.
        message: String,
    },

    /// Malformed reply.
    #[error("Malformed reply: {0}")]
    Parse(String),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Invalid `host[:port]` server string.
    #[error("Invalid server: {0}")]
    InvalidServer(String),

    /// Message too large.
    #[error("Message exceeds size limit: {size} bytes (max {limit})")]
    MessageTooLarge {
        /// Size of the message.
        size: usize,
        /// Limit advertised by the server.
        limit: usize,
    },

    /// Invalid state for operation.
    #[error("Invalid state for operation: {0}")]
    InvalidState(String),
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code >= 500 && *code < 600)
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code >= 400 && *code < 500)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn classifies_reply_errors() {
        assert!(Error::smtp_error(535, "bad credentials").is_permanent());
        assert!(!Error::smtp_error(535, "bad credentials").is_transient());
        assert!(Error::smtp_error(451, "try later").is_transient());
        assert!(!Error::ConnectionClosed.is_permanent());
    }

    #[test]
    fn display_includes_code() {
        let err = Error::smtp_error(550, "no such user");
        assert_eq!(err.to_string(), "SMTP error 550: no such user");
    }
}
