//! Envelope addresses and header mailboxes.

use std::fmt;

use crate::error::{Error, Result};

/// An address usable in `MAIL FROM:<...>` and `RCPT TO:<...>`.
///
/// Anything that could end the angle-bracketed path early or smuggle a
/// second command (whitespace, controls, `<`, `>`) is refused.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Checks `addr` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] unless `addr` is `local@domain`
    /// with both parts non-empty and no forbidden characters.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        check(&addr)?;
        Ok(Self(addr))
    }

    /// The address text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn check(addr: &str) -> Result<()> {
    let reject = |why: &str| Err(Error::InvalidAddress(format!("{why}: {addr:?}")));

    if addr
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || c == '<' || c == '>')
    {
        return reject("Forbidden character in address");
    }
    let Some((local, domain)) = addr.rsplit_once('@') else {
        return reject("Address has no @");
    };
    if local.is_empty() || domain.is_empty() {
        return reject("Address has an empty local part or domain");
    }
    // A quoted local part may contain '@'; a bare one may not.
    if local.contains('@') && !local.starts_with('"') {
        return reject("Address has more than one @");
    }
    Ok(())
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A header mailbox: `addr` or `Display Name <addr>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Display name, unquoted.
    pub name: Option<String>,
    /// The address inside the angle brackets, or the whole entry.
    pub address: Address,
}

impl Mailbox {
    /// Parses one mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] for unbalanced angle brackets or an
    /// invalid address.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let (name, address) = match (input.rfind('<'), input.strip_suffix('>')) {
            (Some(open), Some(rest)) => {
                let name = input[..open].trim().trim_matches('"').trim();
                ((!name.is_empty()).then(|| name.to_string()), &rest[open + 1..])
            }
            (None, None) => (None, input),
            _ => {
                return Err(Error::InvalidAddress(format!(
                    "Unbalanced angle brackets: {input}"
                )));
            }
        };
        Ok(Self {
            name,
            address: Address::new(address.trim())?,
        })
    }

    /// Parses a comma-separated header value such as a `To` line.
    ///
    /// Commas inside a quoted name or angle brackets do not separate
    /// entries, and empty entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if an entry is invalid or the value
    /// holds no mailbox at all.
    pub fn parse_list(input: &str) -> Result<Vec<Self>> {
        let mut entries = Vec::new();
        let (mut quoted, mut angled) = (false, false);
        let mut start = 0;

        for (i, c) in input.char_indices() {
            match c {
                '"' => quoted = !quoted,
                '<' if !quoted => angled = true,
                '>' if !quoted => angled = false,
                ',' if !quoted && !angled => {
                    entries.push(&input[start..i]);
                    start = i + 1;
                }
                _ => {}
            }
        }
        entries.push(&input[start..]);

        let mailboxes = entries
            .into_iter()
            .filter(|entry| !entry.trim().is_empty())
            .map(Self::parse)
            .collect::<Result<Vec<_>>>()?;
        if mailboxes.is_empty() {
            return Err(Error::InvalidAddress(format!("No mailbox in {input:?}")));
        }
        Ok(mailboxes)
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            None => write!(f, "{}", self.address),
            Some(name) if name.contains(|c: char| ",;:<>@\"".contains(c)) => {
                write!(f, "\"{}\" <{}>", name.replace('"', "\\\""), self.address)
            }
            Some(name) => write!(f, "{name} <{}>", self.address),
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
    fn test_address_shapes() {
        assert_eq!(
            Address::new("postmaster@mx.example").unwrap().as_str(),
            "postmaster@mx.example"
        );
        assert!(Address::new("\"odd@local\"@example.com").is_ok());
        for bad in ["", "no-at-sign", "@example.com", "user@", "a@b@c"] {
            assert!(Address::new(bad).is_err(), "{bad:?} accepted");
        }
    }

    #[test]
    fn test_address_cannot_smuggle_commands() {
        assert!(Address::new("a@example.com>\r\nRCPT TO:<b@example.com").is_err());
        assert!(Address::new("a b@example.com").is_err());
        assert!(Address::new("a\t@example.com").is_err());
    }

    #[test]
    fn test_parse_mailbox_forms() {
        let bare = Mailbox::parse("  ops@example.net ").unwrap();
        assert_eq!(bare.name, None);
        assert_eq!(bare.address.as_str(), "ops@example.net");

        let named = Mailbox::parse("\"Ops Team\" <ops@example.net>").unwrap();
        assert_eq!(named.name.as_deref(), Some("Ops Team"));
        assert_eq!(named.to_string(), "Ops Team <ops@example.net>");

        assert_eq!(Mailbox::parse("< ops@example.net >").unwrap().name, None);
        assert!(Mailbox::parse("Ops <ops@example.net").is_err());
        assert!(Mailbox::parse("ops@example.net>").is_err());
    }

    #[test]
    fn test_parse_list_splits_outside_quotes() {
        let list = Mailbox::parse_list("\"Lee, Sam\" <sam@example.org>, kim@example.org,").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name.as_deref(), Some("Lee, Sam"));
        assert_eq!(list[0].to_string(), "\"Lee, Sam\" <sam@example.org>");
        assert_eq!(list[1].address.as_str(), "kim@example.org");
    }

    #[test]
    fn test_parse_list_rejects_empty_and_bad_entries() {
        assert!(Mailbox::parse_list(" , ").is_err());
        assert!(Mailbox::parse_list("kim@example.org, not-an-address").is_err());
    }
}
