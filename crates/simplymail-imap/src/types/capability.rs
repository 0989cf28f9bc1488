//! Status keywords and the capabilities the client looks at.

use std::fmt;

/// Condition of a status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// `OK`
    Ok,
    /// `NO`: the command was understood but failed.
    No,
    /// `BAD`: the command was not understood.
    Bad,
    /// `PREAUTH`: greeting of an already authenticated connection.
    PreAuth,
    /// `BYE`: the server is closing the connection.
    Bye,
}

impl Status {
    /// Maps a status keyword, ignoring case. Anything else is `None`.
    #[must_use]
    pub fn parse(keyword: &str) -> Option<Self> {
        [
            ("OK", Self::Ok),
            ("NO", Self::No),
            ("BAD", Self::Bad),
            ("PREAUTH", Self::PreAuth),
            ("BYE", Self::Bye),
        ]
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(keyword))
        .map(|(_, status)| status)
    }
}

/// Capability advertised in a `CAPABILITY` response or response code.
///
/// Only the entries that change what the client does get their own variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `IMAP4rev1`
    Imap4Rev1,
    /// `STARTTLS`
    StartTls,
    /// `LOGINDISABLED`: LOGIN is refused on this connection.
    LoginDisabled,
    /// `AUTH=<mechanism>`
    Auth(String),
    /// Anything else, kept as sent.
    Other(String),
}

impl Capability {
    /// Maps one capability atom, ignoring case of the known names.
    #[must_use]
    pub fn parse(atom: &str) -> Self {
        if atom.eq_ignore_ascii_case("IMAP4rev1") {
            Self::Imap4Rev1
        } else if atom.eq_ignore_ascii_case("STARTTLS") {
            Self::StartTls
        } else if atom.eq_ignore_ascii_case("LOGINDISABLED") {
            Self::LoginDisabled
        } else {
            match atom.split_once('=') {
                Some((prefix, mechanism)) if prefix.eq_ignore_ascii_case("AUTH") => {
                    Self::Auth(mechanism.to_string())
                }
                _ => Self::Other(atom.to_string()),
            }
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Imap4Rev1 => f.write_str("IMAP4rev1"),
            Self::StartTls => f.write_str("STARTTLS"),
            Self::LoginDisabled => f.write_str("LOGINDISABLED"),
            Self::Auth(mechanism) => write!(f, "AUTH={mechanism}"),
            Self::Other(atom) => f.write_str(atom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_keywords() {
        assert_eq!(Status::parse("ok"), Some(Status::Ok));
        assert_eq!(Status::parse("PreAuth"), Some(Status::PreAuth));
        assert_eq!(Status::parse("Bye"), Some(Status::Bye));
        assert_eq!(Status::parse("MAYBE"), None);
    }

    #[test]
    fn capability_atoms() {
        assert_eq!(Capability::parse("imap4REV1"), Capability::Imap4Rev1);
        assert_eq!(Capability::parse("auth=PLAIN"), Capability::Auth("PLAIN".into()));
        assert_eq!(
            Capability::parse("X-GM-EXT-1"),
            Capability::Other("X-GM-EXT-1".into())
        );
        assert_eq!(Capability::parse("LITERAL+").to_string(), "LITERAL+");
    }

    #[test]
    fn known_capabilities_print_canonically() {
        for atom in ["IMAP4rev1", "STARTTLS", "LOGINDISABLED", "AUTH=XOAUTH2"] {
            assert_eq!(Capability::parse(atom).to_string(), atom);
        }
    }
}
