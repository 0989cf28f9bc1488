//! EHLO keywords the client acts on.

/// One line of the EHLO reply after the greeting line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// `STARTTLS` (RFC 3207).
    StartTls,
    /// `AUTH` with the mechanisms this client can use, in server order.
    Auth(Vec<AuthMechanism>),
    /// `SIZE`, with the limit in bytes when the server states one.
    Size(Option<usize>),
    /// Any other keyword, upper-cased, parameters dropped.
    Other(String),
}

impl Extension {
    /// Interprets one EHLO line such as `AUTH PLAIN LOGIN` or `SIZE 35882577`.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let keyword = words.next().unwrap_or_default().to_ascii_uppercase();

        match keyword.as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => Self::Auth(words.filter_map(AuthMechanism::parse).collect()),
            "SIZE" => Self::Size(words.next().and_then(|n| n.parse().ok())),
            _ => Self::Other(keyword),
        }
    }
}

/// SASL mechanisms the client implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// `PLAIN` (RFC 4616): credentials in one base64 blob.
    Plain,
    /// `LOGIN`: username and password in separate challenge rounds.
    Login,
}

impl AuthMechanism {
    /// `None` for mechanisms this client cannot speak.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("PLAIN") {
            Some(Self::Plain)
        } else if name.eq_ignore_ascii_case("LOGIN") {
            Some(Self::Login)
        } else {
            None
        }
    }

    /// Name as sent after `AUTH`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
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
    fn starttls_any_case() {
        assert_eq!(Extension::parse("starttls"), Extension::StartTls);
    }

    #[test]
    fn auth_keeps_usable_mechanisms_in_order() {
        assert_eq!(
            Extension::parse("AUTH LOGIN XOAUTH2 plain CRAM-MD5"),
            Extension::Auth(vec![AuthMechanism::Login, AuthMechanism::Plain])
        );
        assert_eq!(Extension::parse("AUTH"), Extension::Auth(vec![]));
    }

    #[test]
    fn size_limit_is_optional() {
        assert_eq!(
            Extension::parse("SIZE 35882577"),
            Extension::Size(Some(35_882_577))
        );
        assert_eq!(Extension::parse("SIZE"), Extension::Size(None));
        assert_eq!(Extension::parse("SIZE lots"), Extension::Size(None));
    }

    #[test]
    fn other_keywords_keep_only_the_keyword() {
        assert_eq!(
            Extension::parse("8bitmime"),
            Extension::Other("8BITMIME".into())
        );
        assert_eq!(
            Extension::parse("DSN NOTIFY"),
            Extension::Other("DSN".into())
        );
        assert_eq!(Extension::parse(""), Extension::Other(String::new()));
    }

    #[test]
    fn mechanism_names() {
        assert_eq!(AuthMechanism::parse("Login"), Some(AuthMechanism::Login));
        assert_eq!(AuthMechanism::parse("XOAUTH2"), None);
        assert_eq!(AuthMechanism::Plain.as_str(), "PLAIN");
    }
}
