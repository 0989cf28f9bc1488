//! Client errors.

use std::time::Duration;

use thiserror::Error;

/// Everything that can end an IMAP exchange early.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Certificate rejected or TLS protocol violation.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// The handshake broke off at the transport level.
    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),

    /// The host cannot be used as a TLS server name.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(String),

    /// A response that does not follow the grammar.
    #[error("Malformed response at byte {position}: {message}")]
    Parse {
        /// Offset into the response.
        position: usize,
        /// What the parser expected.
        message: String,
    },

    /// LOGIN was rejected.
    #[error("Login rejected: {0}")]
    Auth(String),

    /// Tagged `NO`.
    #[error("Command failed (NO): {0}")]
    No(String),

    /// Tagged `BAD`.
    #[error("Command rejected (BAD): {0}")]
    Bad(String),

    /// Untagged `BYE`; the server is closing the connection.
    #[error("Server closing connection (BYE): {0}")]
    Bye(String),

    /// Connect, write or a partly received response took too long.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Not a byte of the expected response arrived in time.
    #[error("No response within {0:?}")]
    NoResponse(Duration),

    /// EOF from the server.
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// The client cannot do this in its current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Well-formed data that is missing something the command needs.
    #[error("Unexpected server data: {0}")]
    Protocol(String),
}

impl Error {
    /// EOF or `BYE`.
    #[must_use]
    pub const fn is_connection_lost(&self) -> bool {
        matches!(self, Self::ConnectionClosed | Self::Bye(_))
    }
}

/// `Result` with this crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_lost_variants() {
        assert!(Error::ConnectionClosed.is_connection_lost());
        assert!(Error::Bye("shutting down".into()).is_connection_lost());
        assert!(!Error::No("nope".into()).is_connection_lost());
    }

    #[test]
    fn parse_error_display() {
        let err = Error::Parse {
            position: 4,
            message: "Expected SP".into(),
        };
        assert_eq!(err.to_string(), "Malformed response at byte 4: Expected SP");
    }
}
