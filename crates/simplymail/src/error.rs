//! Flat error types returned by the public operations.
//!
//! Every variant carries only a message, so callers can match on the
//! variant alone and forward the text wherever it needs to go. The protocol
//! crates' richer errors are classified here through `From`.

use thiserror::Error;

/// Failure of an IMAP operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImapError {
    /// Network I/O failed or timed out.
    #[error("I/O error: {message}")]
    IoException {
        /// Description of the failure.
        message: String,
    },

    /// The TLS handshake failed at the transport level.
    #[error("TLS handshake failed: {message}")]
    TlsHandshakeException {
        /// Description of the failure.
        message: String,
    },

    /// Certificate validation failed or the host is not a valid TLS name.
    #[error("TLS error: {message}")]
    TlsException {
        /// Description of the failure.
        message: String,
    },

    /// The server answered a command with NO or BAD.
    #[error("Bad response: {message}")]
    BadResponse {
        /// Server text.
        message: String,
    },

    /// The server did not start answering before the read timed out.
    #[error("No response: {message}")]
    NoResponse {
        /// Description of the failure.
        message: String,
    },

    /// The server closed the connection or said BYE.
    #[error("Connection lost: {message}")]
    ConnectionLost {
        /// Description of the failure.
        message: String,
    },

    /// A response could not be parsed or lacked mandatory data.
    #[error("Parse error: {message}")]
    ParseException {
        /// Description of the failure.
        message: String,
    },

    /// The server rejected the credentials.
    #[error("Login rejected: {message}")]
    ValidateException {
        /// Server text.
        message: String,
    },

    /// Appending a message failed. Reserved; never produced.
    #[error("Append failed: {message}")]
    AppendException {
        /// Description of the failure.
        message: String,
    },

    /// Placeholder for variants added later. Never produced.
    #[error("Unknown error: {message}")]
    Nonexhaustive {
        /// Description of the failure.
        message: String,
    },
}

impl ImapError {
    /// Returns the message carried by any variant.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::IoException { message }
            | Self::TlsHandshakeException { message }
            | Self::TlsException { message }
            | Self::BadResponse { message }
            | Self::NoResponse { message }
            | Self::ConnectionLost { message }
            | Self::ParseException { message }
            | Self::ValidateException { message }
            | Self::AppendException { message }
            | Self::Nonexhaustive { message } => message,
        }
    }
}

impl From<simplymail_imap::Error> for ImapError {
    fn from(err: simplymail_imap::Error) -> Self {
        use simplymail_imap::Error as E;

        let message = err.to_string();
        match err {
            E::Io(_) | E::Timeout(_) => Self::IoException { message },
            E::TlsHandshake(_) => Self::TlsHandshakeException { message },
            E::Tls(_) | E::InvalidDnsName(_) => Self::TlsException { message },
            E::No(_) | E::Bad(_) => Self::BadResponse { message },
            E::NoResponse(_) => Self::NoResponse { message },
            E::ConnectionClosed | E::Bye(_) => Self::ConnectionLost { message },
            E::Parse { .. } | E::Protocol(_) | E::InvalidState(_) => {
                Self::ParseException { message }
            }
            E::Auth(text) => Self::ValidateException { message: text },
        }
    }
}

/// Failure of an SMTP operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmtpError {
    /// The server answered with a 4xx reply; retrying later may succeed.
    #[error("Transient SMTP error: {message}")]
    TransientSmtpException {
        /// Reply code and text.
        message: String,
    },

    /// The server answered with a 5xx reply.
    #[error("Permanent SMTP error: {message}")]
    PermanentSmtpException {
        /// Reply code and text.
        message: String,
    },

    /// A reply did not follow the SMTP reply grammar.
    #[error("Malformed reply: {message}")]
    ResponseParseException {
        /// Description of the failure.
        message: String,
    },

    /// Local validation failed before or without contacting the server.
    #[error("Client error: {message}")]
    InternalClientException {
        /// Description of the failure.
        message: String,
    },

    /// The connection could not be established or the greeting was refused.
    #[error("Connection failed: {message}")]
    ConnectionException {
        /// Description of the failure.
        message: String,
    },

    /// I/O failed on an established connection.
    #[error("Network error: {message}")]
    NetworkException {
        /// Description of the failure.
        message: String,
    },

    /// TLS could not be established or validated.
    #[error("TLS error: {message}")]
    TlsException {
        /// Description of the failure.
        message: String,
    },

    /// A connect, read or the whole operation took too long.
    #[error("Timed out: {message}")]
    Timeout {
        /// Description of the failure.
        message: String,
    },

    /// Anything not covered by the other variants.
    #[error("SMTP failure: {message}")]
    OtherException {
        /// Description of the failure.
        message: String,
    },
}

impl SmtpError {
    /// Returns the message carried by any variant.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::TransientSmtpException { message }
            | Self::PermanentSmtpException { message }
            | Self::ResponseParseException { message }
            | Self::InternalClientException { message }
            | Self::ConnectionException { message }
            | Self::NetworkException { message }
            | Self::TlsException { message }
            | Self::Timeout { message }
            | Self::OtherException { message } => message,
        }
    }

    /// Returns true for failures the caller may retry unchanged.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::TransientSmtpException { .. })
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::InternalClientException {
            message: message.into(),
        }
    }
}

impl From<simplymail_smtp::Error> for SmtpError {
    fn from(err: simplymail_smtp::Error) -> Self {
        use simplymail_smtp::Error as E;

        let message = err.to_string();
        match err {
            E::SmtpError { code, .. } if (400..500).contains(&code) => {
                Self::TransientSmtpException { message }
            }
            E::SmtpError { code, .. } if (500..600).contains(&code) => {
                Self::PermanentSmtpException { message }
            }
            E::SmtpError { .. } | E::UnexpectedReply { .. } => Self::OtherException { message },
            E::Parse(_) => Self::ResponseParseException { message },
            E::Connect { .. } | E::Greeting { .. } => Self::ConnectionException { message },
            E::Io(_) | E::ConnectionClosed => Self::NetworkException { message },
            E::Tls(_) | E::TlsHandshake(_) | E::InvalidDnsName(_) | E::StartTlsUnavailable => {
                Self::TlsException { message }
            }
            E::Timeout(_) => Self::Timeout { message },
            E::InvalidAddress(_)
            | E::InvalidServer(_)
            | E::MessageTooLarge { .. }
            | E::InvalidState(_) => Self::InternalClientException { message },
        }
    }
}

impl From<simplymail_mime::Error> for SmtpError {
    fn from(err: simplymail_mime::Error) -> Self {
        Self::internal(err.to_string())
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
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_imap_mapping() {
        use simplymail_imap::Error as E;

        let cases = [
            (E::Timeout(Duration::from_secs(1)), "IoException"),
            (E::TlsHandshake("eof".into()), "TlsHandshakeException"),
            (E::InvalidDnsName("bad host".into()), "TlsException"),
            (E::No("nope".into()), "BadResponse"),
            (E::Bad("what".into()), "BadResponse"),
            (E::NoResponse(Duration::from_secs(1)), "NoResponse"),
            (E::ConnectionClosed, "ConnectionLost"),
            (E::Bye("shutdown".into()), "ConnectionLost"),
            (E::Protocol("no body".into()), "ParseException"),
            (E::Auth("Invalid credentials".into()), "ValidateException"),
        ];

        for (err, expected) in cases {
            let mapped = ImapError::from(err);
            let name = format!("{mapped:?}");
            assert!(name.starts_with(expected), "{name}");
        }
    }

    #[test]
    fn test_imap_message_is_flattened() {
        let mapped = ImapError::from(simplymail_imap::Error::Auth("Invalid credentials".into()));
        assert_eq!(
            mapped,
            ImapError::ValidateException {
                message: "Invalid credentials".into()
            }
        );
        assert_eq!(mapped.to_string(), "Login rejected: Invalid credentials");
    }

    #[test]
    fn test_smtp_reply_classification() {
        use simplymail_smtp::Error as E;

        let transient = SmtpError::from(E::smtp_error(451, "try again"));
        assert!(transient.is_transient());
        assert_eq!(transient.message(), "SMTP error 451: try again");

        let permanent = SmtpError::from(E::smtp_error(535, "bad credentials"));
        assert!(matches!(permanent, SmtpError::PermanentSmtpException { .. }));

        let unexpected = SmtpError::from(E::UnexpectedReply {
            code: 250,
            message: "ok".into(),
        });
        assert!(matches!(unexpected, SmtpError::OtherException { .. }));
    }

    #[test]
    fn test_smtp_transport_classification() {
        use simplymail_smtp::Error as E;

        let refused = E::Connect {
            address: "127.0.0.1:1".into(),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        };
        assert!(matches!(
            SmtpError::from(refused),
            SmtpError::ConnectionException { .. }
        ));
        assert!(matches!(
            SmtpError::from(E::Greeting {
                code: 554,
                message: "go away".into()
            }),
            SmtpError::ConnectionException { .. }
        ));
        assert!(matches!(
            SmtpError::from(E::ConnectionClosed),
            SmtpError::NetworkException { .. }
        ));
        assert!(matches!(
            SmtpError::from(E::StartTlsUnavailable),
            SmtpError::TlsException { .. }
        ));
        assert!(matches!(
            SmtpError::from(E::Timeout(Duration::from_secs(2))),
            SmtpError::Timeout { .. }
        ));
        assert!(matches!(
            SmtpError::from(E::Parse("bad".into())),
            SmtpError::ResponseParseException { .. }
        ));
        assert!(matches!(
            SmtpError::from(E::InvalidAddress("x".into())),
            SmtpError::InternalClientException { .. }
        ));
    }

    #[test]
    fn test_mime_errors_are_internal() {
        let err = SmtpError::from(simplymail_mime::Error::MissingHeader("From".into()));
        assert_eq!(
            err,
            SmtpError::InternalClientException {
                message: "Missing required header: From".into()
            }
        );
    }
}
