//! Commands sent by the client and the DATA payload encoding.

use std::fmt;

use crate::types::{Address, AuthMechanism};

/// One command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `EHLO <hostname>`
    Ehlo {
        /// Name the client announces.
        hostname: String,
    },
    /// `STARTTLS`
    StartTls,
    /// `AUTH <mechanism> [initial-response]`
    Auth {
        /// SASL mechanism.
        mechanism: AuthMechanism,
        /// Base64 initial response (RFC 4954 section 4).
        initial_response: Option<String>,
    },
    /// Base64 answer to a `334` challenge.
    AuthResponse(String),
    /// `MAIL FROM:<address> [SIZE=n]`
    MailFrom {
        /// Envelope sender.
        from: Address,
        /// Message size declared up front (RFC 1870).
        size: Option<usize>,
    },
    /// `RCPT TO:<address>`
    RcptTo {
        /// Envelope recipient.
        to: Address,
    },
    /// `DATA`
    Data,
    /// `QUIT`
    Quit,
}

impl Command {
    /// The command line with its CRLF terminator.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        format!("{self}\r\n").into_bytes()
    }

    /// The command line with credentials replaced, for logging.
    #[must_use]
    pub fn redacted(&self) -> String {
        match self {
            Self::Auth { mechanism, .. } => format!("AUTH {} <redacted>", mechanism.as_str()),
            Self::AuthResponse(_) => "<redacted>".to_string(),
            other => other.to_string(),
        }
    }
}

/// Writes the command line without the terminator.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ehlo { hostname } => write!(f, "EHLO {hostname}"),
            Self::StartTls => f.write_str("STARTTLS"),
            Self::Auth {
                mechanism,
                initial_response: None,
            } => write!(f, "AUTH {}", mechanism.as_str()),
            Self::Auth {
                mechanism,
                initial_response: Some(response),
            } => write!(f, "AUTH {} {response}", mechanism.as_str()),
            Self::AuthResponse(response) => f.write_str(response),
            Self::MailFrom { from, size: None } => write!(f, "MAIL FROM:<{}>", from.as_str()),
            Self::MailFrom {
                from,
                size: Some(size),
            } => write!(f, "MAIL FROM:<{}> SIZE={size}", from.as_str()),
            Self::RcptTo { to } => write!(f, "RCPT TO:<{}>", to.as_str()),
            Self::Data => f.write_str("DATA"),
            Self::Quit => f.write_str("QUIT"),
        }
    }
}

/// Normalizes line endings to CRLF, dot-stuffs lines starting with `.` and
/// appends the `.` terminator line.
#[must_use]
pub fn encode_data(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + message.len() / 64 + 5);

    let body = message.strip_suffix(b"\n").unwrap_or(message);
    let body = body.strip_suffix(b"\r").unwrap_or(body);

    if !body.is_empty() {
        for line in body.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                out.push(b'.');
            }
            out.extend_from_slice(line);
            out.extend_from_slice(b"\r\n");
        }
    }

    out.extend_from_slice(b".\r\n");
    out
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
    fn test_bare_commands() {
        let ehlo = Command::Ehlo {
            hostname: "client.example.com".to_string(),
        };
        assert_eq!(ehlo.serialize(), b"EHLO client.example.com\r\n");
        assert_eq!(Command::StartTls.serialize(), b"STARTTLS\r\n");
        assert_eq!(Command::Data.serialize(), b"DATA\r\n");
        assert_eq!(Command::Quit.to_string(), "QUIT");
    }

    #[test]
    fn test_auth_plain() {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some("AHVzZXIAcGFzcw==".to_string()),
        };
        assert_eq!(cmd.serialize(), b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n");
        assert_eq!(cmd.redacted(), "AUTH PLAIN <redacted>");
    }

    #[test]
    fn test_auth_login_exchange() {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        };
        assert_eq!(cmd.serialize(), b"AUTH LOGIN\r\n");
        let answer = Command::AuthResponse("dXNlcg==".to_string());
        assert_eq!(answer.serialize(), b"dXNlcg==\r\n");
        assert_eq!(answer.redacted(), "<redacted>");
    }

    #[test]
    fn test_mail_from_simple() {
        let cmd = Command::MailFrom {
            from: Address::new("sender@example.com").unwrap(),
            size: None,
        };
        assert_eq!(cmd.serialize(), b"MAIL FROM:<sender@example.com>\r\n");
        assert_eq!(cmd.redacted(), "MAIL FROM:<sender@example.com>");
    }

    #[test]
    fn test_mail_from_with_size() {
        let cmd = Command::MailFrom {
            from: Address::new("sender@example.com").unwrap(),
            size: Some(12345),
        };
        assert_eq!(
            cmd.serialize(),
            b"MAIL FROM:<sender@example.com> SIZE=12345\r\n"
        );
    }

    #[test]
    fn test_rcpt_to_command() {
        let cmd = Command::RcptTo {
            to: Address::new("recipient@example.com").unwrap(),
        };
        assert_eq!(cmd.serialize(), b"RCPT TO:<recipient@example.com>\r\n");
    }

    #[test]
    fn test_encode_data_normalizes_and_stuffs() {
        let encoded = encode_data(b"Subject: x\n\n.hidden\r\nend\n");
        assert_eq!(encoded, b"Subject: x\r\n\r\n..hidden\r\nend\r\n.\r\n");
    }

    #[test]
    fn test_encode_data_lone_dot_line() {
        let encoded = encode_data(b"a\r\n.\r\nb");
        assert_eq!(encoded, b"a\r\n..\r\nb\r\n.\r\n");
    }

    #[test]
    fn test_encode_data_empty() {
        assert_eq!(encode_data(b""), b".\r\n");
    }
}
