//! `Content-Type` values for generated parts.

use std::fmt;

/// Media type plus parameters, rendered in the order they were added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    essence: &'static str,
    parameters: Vec<(&'static str, String)>,
}

impl ContentType {
    /// `text/plain; charset=utf-8`
    #[must_use]
    pub fn text_plain() -> Self {
        Self::utf8("text/plain")
    }

    /// `text/html; charset=utf-8`
    #[must_use]
    pub fn text_html() -> Self {
        Self::utf8("text/html")
    }

    /// `multipart/alternative` with the given boundary.
    #[must_use]
    pub fn multipart_alternative(boundary: impl Into<String>) -> Self {
        Self {
            essence: "multipart/alternative",
            parameters: vec![("boundary", boundary.into())],
        }
    }

    fn utf8(essence: &'static str) -> Self {
        Self {
            essence,
            parameters: vec![("charset", "utf-8".to_string())],
        }
    }

    /// `type/subtype` without parameters.
    #[must_use]
    pub const fn essence(&self) -> &'static str {
        self.essence
    }

    /// Value of the named parameter.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The `boundary` parameter of a multipart type.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary")
    }
}

/// RFC 2045 `tspecials`; values containing any of them must be quoted.
const TSPECIALS: &str = "()<>@,;:\\\"/[]?=";

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.essence)?;
        for (key, value) in &self.parameters {
            let quote = value.is_empty()
                || value.contains(|c: char| c.is_ascii_whitespace() || TSPECIALS.contains(c));
            if quote {
                write!(f, "; {key}=\"{value}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
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

    #[test]
    fn test_text_types_carry_utf8_charset() {
        assert_eq!(ContentType::text_plain().to_string(), "text/plain; charset=utf-8");
        assert_eq!(ContentType::text_html().essence(), "text/html");
        assert_eq!(ContentType::text_html().parameter("CHARSET"), Some("utf-8"));
        assert_eq!(ContentType::text_plain().boundary(), None);
    }

    #[test]
    fn test_boundary_with_tspecials_is_quoted() {
        let ct = ContentType::multipart_alternative("=_b123");
        assert_eq!(ct.boundary(), Some("=_b123"));
        assert_eq!(ct.to_string(), "multipart/alternative; boundary=\"=_b123\"");
    }

    #[test]
    fn test_plain_boundary_is_bare() {
        let ct = ContentType::multipart_alternative("simple");
        assert_eq!(ct.to_string(), "multipart/alternative; boundary=simple");
    }
}
