//! MIME message structure and serialization.

use crate::content_type::ContentType;
use crate::encoding::encode_quoted_printable;
use crate::header::Headers;
use std::fmt;

/// Longest line that is sent as-is in a `7bit` body.
const MAX_SEVEN_BIT_LINE: usize = 78;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII with short lines.
    SevenBit,
    /// Quoted-Printable encoding.
    QuotedPrintable,
}

impl TransferEncoding {
    /// Picks the encoding for a text body.
    ///
    /// ASCII text with short lines goes out unchanged; anything else is
    /// quoted-printable.
    #[must_use]
    pub fn for_text(text: &str) -> Self {
        let plain = text.is_ascii()
            && text
                .split('\n')
                .all(|line| line.trim_end_matches('\r').len() <= MAX_SEVEN_BIT_LINE)
            && !text
                .bytes()
                .any(|b| b.is_ascii_control() && !matches!(b, b'\r' | b'\n' | b'\t'));
        if plain {
            Self::SevenBit
        } else {
            Self::QuotedPrintable
        }
    }

    /// Encodes a text body, normalizing line breaks to CRLF.
    #[must_use]
    pub fn encode(self, text: &str) -> String {
        match self {
            Self::SevenBit => normalize_line_breaks(text),
            Self::QuotedPrintable => encode_quoted_printable(text),
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// Converts lone `\n` and `\r` into CRLF.
fn normalize_line_breaks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\r\n");
            }
            '\n' => out.push_str("\r\n"),
            _ => out.push(ch),
        }
    }
    out
}

/// One text rendering of the message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    content_type: ContentType,
    encoding: TransferEncoding,
    body: String,
}

impl Part {
    /// Creates a part from text, choosing the transfer encoding.
    #[must_use]
    pub fn text(content_type: ContentType, text: &str) -> Self {
        let encoding = TransferEncoding::for_text(text);
        Self {
            content_type,
            encoding,
            body: encoding.encode(text),
        }
    }

    /// Creates a text/plain part.
    #[must_use]
    pub fn plain(text: &str) -> Self {
        Self::text(ContentType::text_plain(), text)
    }

    /// Creates a text/html part.
    #[must_use]
    pub fn html(text: &str) -> Self {
        Self::text(ContentType::text_html(), text)
    }

    /// Returns the content type.
    #[must_use]
    pub const fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Returns the transfer encoding.
    #[must_use]
    pub const fn transfer_encoding(&self) -> TransferEncoding {
        self.encoding
    }

    /// Returns the encoded body, as it appears on the wire.
    #[must_use]
    pub fn encoded_body(&self) -> &str {
        &self.body
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Content-Type: {}\r\n", self.content_type)?;
        write!(f, "Content-Transfer-Encoding: {}\r\n\r\n", self.encoding)?;
        write!(f, "{}\r\n", self.body)
    }
}

/// Message body layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// A single text part; its headers are merged into the message header.
    Single(Part),
    /// `multipart/alternative` with one part per rendering, plain text first.
    Alternative {
        /// Boundary token; never occurs in any part body.
        boundary: String,
        /// The renderings.
        parts: Vec<Part>,
    },
}

/// A complete MIME message ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    headers: Headers,
    body: Body,
}

impl Message {
    /// Creates a message from top-level headers and a body.
    ///
    /// `headers` should not carry `Content-Type` or
    /// `Content-Transfer-Encoding`; those are derived from `body`.
    #[must_use]
    pub const fn new(headers: Headers, body: Body) -> Self {
        Self { headers, body }
    }

    /// Returns the top-level headers (without the content headers).
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the body.
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Returns the top-level content type.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        match &self.body {
            Body::Single(part) => part.content_type.clone(),
            Body::Alternative { boundary, .. } => ContentType::multipart_alternative(boundary),
        }
    }

    /// Checks if this is a multipart message.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        matches!(self.body, Body::Alternative { .. })
    }

    /// Returns the multipart boundary, if any.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        match &self.body {
            Body::Single(_) => None,
            Body::Alternative { boundary, .. } => Some(boundary),
        }
    }

    /// Serializes the message with CRLF line endings.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.headers)?;
        match &self.body {
            Body::Single(part) => write!(f, "{part}"),
            Body::Alternative { boundary, parts } => {
                write!(f, "Content-Type: {}\r\n\r\n", self.content_type())?;
                for part in parts {
                    write!(f, "--{boundary}\r\n{part}")?;
                }
                write!(f, "--{boundary}--\r\n")
            }
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
    fn test_transfer_encoding_choice() {
        assert_eq!(TransferEncoding::for_text("Hello\nWorld"), TransferEncoding::SevenBit);
        assert_eq!(
            TransferEncoding::for_text("Héllo"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(
            TransferEncoding::for_text(&"x".repeat(100)),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(
            TransferEncoding::for_text("bell\u{7}"),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_seven_bit_normalizes_line_breaks() {
        assert_eq!(TransferEncoding::SevenBit.encode("a\nb\rc\r\nd"), "a\r\nb\r\nc\r\nd");
    }

    #[test]
    fn test_part_display() {
        let part = Part::plain("Hello, World!");
        assert_eq!(
            part.to_string(),
            "Content-Type: text/plain; charset=utf-8\r\n\
             Content-Transfer-Encoding: 7bit\r\n\
             \r\n\
             Hello, World!\r\n"
        );
    }

    #[test]
    fn test_message_single_part() {
        let mut headers = Headers::new();
        headers.add("From", "sender@example.com").unwrap();
        headers.add("Subject", "Test").unwrap();

        let message = Message::new(headers, Body::Single(Part::plain("Grüße")));
        assert!(!message.is_multipart());
        assert_eq!(message.boundary(), None);
        assert_eq!(
            message.to_string(),
            "From: sender@example.com\r\n\
             Subject: Test\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             Content-Transfer-Encoding: quoted-printable\r\n\
             \r\n\
             Gr=C3=BC=C3=9Fe\r\n"
        );
    }

    #[test]
    fn test_message_alternative() {
        let message = Message::new(
            Headers::new(),
            Body::Alternative {
                boundary: "=_b".to_string(),
                parts: vec![Part::plain("plain"), Part::html("<b>html</b>")],
            },
        );

        assert!(message.is_multipart());
        assert_eq!(message.content_type().boundary(), Some("=_b"));
        let text = message.to_string();
        assert!(text.starts_with("Content-Type: multipart/alternative; boundary=\"=_b\"\r\n\r\n"));
        assert!(text.contains("--=_b\r\nContent-Type: text/plain; charset=utf-8\r\n"));
        assert!(text.contains("--=_b\r\nContent-Type: text/html; charset=utf-8\r\n"));
        assert!(text.ends_with("<b>html</b>\r\n--=_b--\r\n"));
        assert_eq!(text.matches("--=_b\r\n").count(), 2);
    }
}
