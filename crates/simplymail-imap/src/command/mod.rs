//! IMAP command builder.
//!
//! Commands serialize to one or more wire fragments. Every fragment after
//! the first follows a synchronizing literal and may only be sent once the
//! server has answered with a `+` continuation.

mod serialize;
mod tag_generator;
mod types;

use crate::types::SeqNum;

pub use tag_generator::TagGenerator;
pub use types::FetchAttribute;

use serialize::write_astring;

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Any State Commands
    /// CAPABILITY command.
    Capability,
    /// LOGOUT command.
    Logout,

    // Not Authenticated State Commands
    /// STARTTLS command.
    StartTls,
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },

    // Authenticated State Commands
    /// EXAMINE command (read-only SELECT).
    Examine {
        /// Mailbox to examine.
        mailbox: String,
    },

    // Selected State Commands
    /// FETCH command for a single message.
    Fetch {
        /// Message sequence number.
        sequence: SeqNum,
        /// Data items to fetch.
        attributes: Vec<FetchAttribute>,
    },
}

impl Command {
    /// Serializes the command with the given tag.
    ///
    /// Returns the wire fragments in order; see the module docs for how
    /// fragments after the first must be sent.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<Vec<u8>> {
        let mut fragments = Vec::new();
        let mut buf = Vec::new();
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Capability => buf.extend_from_slice(b"CAPABILITY"),
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
            Self::StartTls => buf.extend_from_slice(b"STARTTLS"),
            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                push_astring(&mut fragments, &mut buf, username);
                buf.push(b' ');
                push_astring(&mut fragments, &mut buf, password);
            }
            Self::Examine { mailbox } => {
                buf.extend_from_slice(b"EXAMINE ");
                push_astring(&mut fragments, &mut buf, mailbox);
            }
            Self::Fetch {
                sequence,
                attributes,
            } => {
                buf.extend_from_slice(format!("FETCH {sequence} ").as_bytes());
                let names: Vec<&str> = attributes.iter().map(|a| a.as_str()).collect();
                if names.len() == 1 {
                    buf.extend_from_slice(names[0].as_bytes());
                } else {
                    buf.extend_from_slice(format!("({})", names.join(" ")).as_bytes());
                }
            }
        }

        buf.extend_from_slice(b"\r\n");
        fragments.push(buf);
        fragments
    }

    /// Returns a loggable form of the command with credentials redacted.
    #[must_use]
    pub fn redacted(&self, tag: &str) -> String {
        match self {
            Self::Login { .. } => format!("{tag} LOGIN <redacted>"),
            other => other
                .serialize(tag)
                .iter()
                .map(|fragment| String::from_utf8_lossy(fragment).trim_end().to_string())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Appends an astring, closing the current fragment when it turns into a
/// synchronizing literal.
fn push_astring(fragments: &mut Vec<Vec<u8>>, buf: &mut Vec<u8>, value: &str) {
    if let Some(literal) = write_astring(buf, value) {
        buf.extend_from_slice(b"\r\n");
        fragments.push(std::mem::replace(buf, literal));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn single(cmd: &Command, tag: &str) -> String {
        let fragments = cmd.serialize(tag);
        assert_eq!(fragments.len(), 1);
        String::from_utf8(fragments[0].clone()).unwrap()
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(single(&Command::Capability, "A1"), "A1 CAPABILITY\r\n");
        assert_eq!(single(&Command::Logout, "A3"), "A3 LOGOUT\r\n");
        assert_eq!(single(&Command::StartTls, "A4"), "A4 STARTTLS\r\n");
    }

    #[test]
    fn test_login_quoted() {
        let cmd = Command::Login {
            username: "user@example.com".into(),
            password: "p@ss w\"rd".into(),
        };
        assert_eq!(
            single(&cmd, "A0001"),
            "A0001 LOGIN user@example.com \"p@ss w\\\"rd\"\r\n"
        );
        assert_eq!(cmd.redacted("A0001"), "A0001 LOGIN <redacted>");
    }

    #[test]
    fn test_login_with_literal_password() {
        let cmd = Command::Login {
            username: "user".into(),
            password: "grüße".into(),
        };
        let fragments = cmd.serialize("A0001");
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0], b"A0001 LOGIN user {7}\r\n");
        assert_eq!(fragments[1], "grüße\r\n".as_bytes());
    }

    #[test]
    fn test_login_both_literals() {
        let cmd = Command::Login {
            username: "ü".into(),
            password: "ö".into(),
        };
        let fragments = cmd.serialize("T");
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[0], b"T LOGIN {2}\r\n");
        assert_eq!(fragments[1], "ü {2}\r\n".as_bytes());
        assert_eq!(fragments[2], "ö\r\n".as_bytes());
    }

    #[test]
    fn test_examine() {
        let cmd = Command::Examine {
            mailbox: "INBOX".into(),
        };
        assert_eq!(single(&cmd, "A2"), "A2 EXAMINE INBOX\r\n");

        let cmd = Command::Examine {
            mailbox: "Sent Items".into(),
        };
        assert_eq!(single(&cmd, "A3"), "A3 EXAMINE \"Sent Items\"\r\n");
    }

    #[test]
    fn test_fetch() {
        let cmd = Command::Fetch {
            sequence: SeqNum::new(42).unwrap(),
            attributes: vec![FetchAttribute::BodyPeek],
        };
        assert_eq!(single(&cmd, "A3"), "A3 FETCH 42 BODY.PEEK[]\r\n");
        assert_eq!(cmd.redacted("A3"), "A3 FETCH 42 BODY.PEEK[]");

        let cmd = Command::Fetch {
            sequence: SeqNum::new(1).unwrap(),
            attributes: vec![FetchAttribute::Uid, FetchAttribute::Rfc822],
        };
        assert_eq!(single(&cmd, "A4"), "A4 FETCH 1 (UID RFC822)\r\n");
    }
}
