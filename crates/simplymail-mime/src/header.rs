//! MIME header handling.

use crate::encoding::{encode_rfc2047, encoded_words};
use crate::error::{Error, Result};
use std::fmt;

/// Column at which values are folded when whitespace allows.
const FOLD_WIDTH: usize = 78;

/// Hard limit on a header line, CRLF excluded (RFC 5322 section 2.1.1).
const MAX_LINE: usize = 998;

const CHARSET: &str = "utf-8";

/// Ordered collection of email headers.
///
/// Lookups ignore case; names keep the spelling they were added with and
/// headers are rendered in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    headers: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if the name is not a valid field
    /// name or the value contains a bare CR or LF.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        let value = value.into();
        validate(&name, &value)?;
        self.headers.push((name, value));
        Ok(())
    }

    /// Sets a header, replacing every existing value of the same name.
    ///
    /// # Errors
    ///
    /// Same as [`Headers::add`].
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.remove(&name);
        self.add(name, value)
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Removes all values for a header.
    pub fn remove(&mut self, name: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Returns true if a header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the number of header fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns true if there are no header fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Returns an iterator over all headers in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Capitalizes each hyphen-separated word of a field name, so `reply-to`
    /// is written as `Reply-To`.
    #[must_use]
    pub fn canonical_name(name: &str) -> String {
        name.split('-')
            .map(|word| {
                let mut chars = word.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                })
            })
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Encodes and folds an unstructured value such as `Subject`.
    ///
    /// Non-ASCII text becomes RFC 2047 encoded words. A value with a word
    /// too long to fold under the line limit is sent as encoded words too.
    #[must_use]
    pub fn encode_value(name: &str, value: &str) -> String {
        let folded = Self::fold(name, &encode_rfc2047(value, CHARSET));
        if fits(name, &folded) {
            folded
        } else {
            encoded_words(value, CHARSET)
        }
    }

    /// Encodes and folds an address list value (`From`, `To`, `Cc`).
    ///
    /// Entries are split outside quoted names and angle brackets. A
    /// non-ASCII display name is encoded whole; addresses stay as given.
    #[must_use]
    pub fn encode_address_list(name: &str, value: &str) -> String {
        let entries: Vec<String> = split_address_list(value)
            .into_iter()
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(encode_mailbox)
            .collect();
        Self::fold(name, &entries.join(", "))
    }

    /// Folds `value` at spaces so lines stay within 78 columns where a
    /// space allows it. Existing folds are kept.
    #[must_use]
    pub fn fold(name: &str, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + value.len() / 16);
        let mut column = name.len() + 2;

        for (n, segment) in value.split("\r\n ").enumerate() {
            let mut line_has_word = false;
            if n > 0 {
                out.push_str("\r\n ");
                column = 1;
            }
            for (i, word) in segment.split(' ').enumerate() {
                if i > 0 {
                    if line_has_word && !word.is_empty() && column + 1 + word.len() > FOLD_WIDTH {
                        out.push_str("\r\n ");
                        column = 1;
                        line_has_word = false;
                    } else {
                        out.push(' ');
                        column += 1;
                    }
                }
                out.push_str(word);
                column += word.len();
                line_has_word |= !word.is_empty();
            }
        }
        out
    }
}

/// Whether every physical line of `name: value` is within [`MAX_LINE`].
fn fits(name: &str, value: &str) -> bool {
    value
        .split("\r\n")
        .enumerate()
        .all(|(n, line)| {
            let prefix = if n == 0 { name.len() + 2 } else { 0 };
            prefix + line.len() <= MAX_LINE
        })
}

/// Splits at commas outside quoted strings and angle brackets.
fn split_address_list(value: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let (mut quoted, mut angled, mut escaped) = (false, false, false);
    let mut start = 0;

    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            '<' if !quoted => angled = true,
            '>' if !quoted => angled = false,
            ',' if !quoted && !angled => {
                entries.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    entries.push(&value[start..]);
    entries
}

/// Replaces a non-ASCII display name with encoded words.
fn encode_mailbox(entry: &str) -> String {
    let Some(open) = entry.rfind('<').filter(|&open| open > 0 && entry.ends_with('>')) else {
        return entry.to_string();
    };
    let display = entry[..open].trim();
    if display.is_ascii() {
        return entry.to_string();
    }
    let display = display
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .map_or_else(
            || display.to_string(),
            |inner| inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        );
    format!("{} {}", encoded_words(&display, CHARSET), &entry[open..])
}

/// Checks a header for anything that would let it spill into other lines.
fn validate(name: &str, value: &str) -> Result<()> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_graphic() && b != b':') {
        return Err(Error::InvalidHeader(format!("bad field name {name:?}")));
    }

    // Folded values (CRLF followed by whitespace) are the only line breaks allowed.
    let mut rest = value;
    while let Some(pos) = rest.find(['\r', '\n']) {
        let folded = rest[pos..]
            .strip_prefix("\r\n")
            .is_some_and(|after| after.starts_with([' ', '\t']));
        if !folded {
            return Err(Error::InvalidHeader(format!(
                "line break in value of {name}"
            )));
        }
        rest = &rest[pos + 2..];
    }

    if !fits(name, value) {
        return Err(Error::InvalidHeader(format!(
            "{name} has a line over {MAX_LINE} octets"
        )));
    }

    Ok(())
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.headers {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
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
    use base64::Engine as _;

    #[test]
    fn test_canonical_name() {
        assert_eq!(Headers::canonical_name("cc"), "Cc");
        assert_eq!(Headers::canonical_name("REPLY-TO"), "Reply-To");
        assert_eq!(Headers::canonical_name("x-mailer"), "X-Mailer");
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain").unwrap();
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain")); // Case insensitive
    }

    #[test]
    fn test_headers_set() {
        let mut headers = Headers::new();
        headers.add("To", "alice@example.com").unwrap();
        headers.add("to", "bob@example.com").unwrap();
        assert_eq!(headers.get_all("TO").len(), 2);

        headers.set("To", "charlie@example.com").unwrap();
        assert_eq!(headers.get_all("To"), vec!["charlie@example.com"]);
    }

    #[test]
    fn test_headers_remove() {
        let mut headers = Headers::new();
        headers.add("Subject", "Test").unwrap();
        assert!(headers.contains("subject"));

        headers.remove("SUBJECT");
        assert!(headers.is_empty());
    }

    #[test]
    fn test_headers_display_keeps_order() {
        let mut headers = Headers::new();
        headers.add("To", "recipient@example.com").unwrap();
        headers.add("From", "sender@example.com").unwrap();

        assert_eq!(
            headers.to_string(),
            "To: recipient@example.com\r\nFrom: sender@example.com\r\n"
        );
    }

    #[test]
    fn test_header_injection_rejected() {
        let mut headers = Headers::new();
        assert!(headers.add("Subject", "hi\r\nBcc: victim@example.com").is_err());
        assert!(headers.add("Subject", "hi\nthere").is_err());
        assert!(headers.add("Subject", "trailing\r").is_err());
        assert!(headers.add("Bad Name", "x").is_err());
        assert!(headers.add("Bad:Name", "x").is_err());
        assert!(headers.add("", "x").is_err());
        assert!(headers.is_empty());

        headers.add("Subject", "=?utf-8?B?YQ==?=\r\n =?utf-8?B?Yg==?=").unwrap();
    }

    fn lines(name: &str, value: &str) -> Vec<String> {
        format!("{name}: {value}")
            .split("\r\n")
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_encode_address_list() {
        assert_eq!(
            Headers::encode_address_list("To", "alice@example.com,  Bob <bob@example.com>"),
            "alice@example.com, Bob <bob@example.com>"
        );
        assert_eq!(
            Headers::encode_address_list("To", "\"Jürgen\" <j@example.com>"),
            "=?utf-8?B?SsO8cmdlbg==?= <j@example.com>"
        );
    }

    #[test]
    fn test_quoted_comma_in_non_ascii_name() {
        let value = Headers::encode_address_list(
            "From",
            "\"Müller, Jörg\" <j@example.com>, kim@example.org",
        );
        assert!(value.is_ascii(), "{value}");
        assert!(!value.contains('"'), "{value}");
        assert!(value.ends_with(" <j@example.com>, kim@example.org"), "{value}");

        let payload = value
            .strip_prefix("=?utf-8?B?")
            .and_then(|rest| rest.split_once("?="))
            .map(|(payload, _)| payload)
            .unwrap();
        let name = base64::engine::general_purpose::STANDARD.decode(payload).unwrap();
        assert_eq!(String::from_utf8(name).unwrap(), "Müller, Jörg");
    }

    #[test]
    fn test_split_address_list_honours_quotes_and_escapes() {
        assert_eq!(
            split_address_list(r#""a \" , b" <a@x>, <c,d@x>, e@x"#),
            vec![r#""a \" , b" <a@x>"#, " <c,d@x>", " e@x"]
        );
    }

    #[test]
    fn test_long_subject_is_folded() {
        let subject = "word ".repeat(300);
        let value = Headers::encode_value("Subject", &subject);
        for line in lines("Subject", &value) {
            assert!(line.len() <= FOLD_WIDTH, "{} bytes: {line}", line.len());
        }
        assert_eq!(value.replace("\r\n", ""), subject);

        let mut headers = Headers::new();
        headers.add("Subject", value).unwrap();
    }

    #[test]
    fn test_short_values_are_not_folded() {
        assert_eq!(Headers::encode_value("Subject", "Hello there"), "Hello there");
        assert_eq!(Headers::fold("X-Long", "a  b"), "a  b");
    }

    #[test]
    fn test_unbreakable_value_becomes_encoded_words() {
        let value = Headers::encode_value("Subject", &"x".repeat(1500));
        assert!(value.starts_with("=?utf-8?B?"));
        for line in lines("Subject", &value) {
            assert!(line.len() <= MAX_LINE, "{} bytes", line.len());
        }
    }

    #[test]
    fn test_overlong_line_rejected() {
        let mut headers = Headers::new();
        let err = headers.add("X-Token", "a".repeat(MAX_LINE)).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));
        headers.add("X-Token", "a".repeat(MAX_LINE - 9)).unwrap();
    }
}
