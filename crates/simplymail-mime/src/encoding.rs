//! Transfer and header encodings for outgoing messages.
//!
//! Base64, Quoted-Printable and RFC 2047 encoded words.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Maximum line length for Quoted-Printable encoding.
const MAX_LINE_LENGTH: usize = 76;

/// Longest input chunk per RFC 2047 encoded word.
///
/// 45 bytes become 60 Base64 characters, which keeps `=?utf-8?B?...?=`
/// under the 75 character limit for an encoded word.
const ENCODED_WORD_CHUNK: usize = 45;

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Line breaks (`\n` or `\r\n`) are kept as CRLF hard breaks. Lines longer
/// than 76 characters get soft breaks, and whitespace at the end of a line
/// is escaped so transports cannot strip it.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 8);

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            result.push_str("\r\n");
        }
        let line = line.strip_suffix('\r').unwrap_or(line);
        encode_quoted_printable_line(line.as_bytes(), &mut result);
    }

    result
}

fn encode_quoted_printable_line(line: &[u8], out: &mut String) {
    let mut line_length = 0;

    for (i, &byte) in line.iter().enumerate() {
        let at_end = i + 1 == line.len();
        let literal = match byte {
            b'!'..=b'<' | b'>'..=b'~' => true,
            b' ' | b'\t' => !at_end,
            _ => false,
        };
        let width = if literal { 1 } else { 3 };

        // One column stays free for the soft break marker.
        if line_length + width > MAX_LINE_LENGTH - 1 {
            out.push_str("=\r\n");
            line_length = 0;
        }

        if literal {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "={byte:02X}");
        }
        line_length += width;
    }
}

/// Encodes a header value using RFC 2047 encoding.
///
/// Format: `=?charset?B?encoded-text?=`. Values that are plain ASCII are
/// returned unchanged. Long values are split into several encoded words
/// separated by folding whitespace, never inside a UTF-8 sequence.
#[must_use]
pub fn encode_rfc2047(text: &str, charset: &str) -> String {
    if text.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) && !text.contains("=?") {
        return text.to_string();
    }
    encoded_words(text, charset)
}

/// B-encodes `text` unconditionally as folded encoded words.
pub(crate) fn encoded_words(text: &str, charset: &str) -> String {
    let mut words = Vec::new();
    let mut start = 0;
    let mut end = 0;
    for (offset, ch) in text.char_indices() {
        let next = offset + ch.len_utf8();
        if next - start > ENCODED_WORD_CHUNK {
            words.push(&text[start..end]);
            start = end;
        }
        end = next;
    }
    words.push(&text[start..end]);

    words
        .into_iter()
        .map(|word| format!("=?{charset}?B?{}?=", encode_base64(word.as_bytes())))
        .collect::<Vec<_>>()
        .join("\r\n ")
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
    fn test_base64_encode() {
        assert_eq!(encode_base64(b"Hello, World!"), "SGVsbG8sIFdvcmxkIQ==");
    }

    #[test]
    fn test_quoted_printable_encode() {
        assert_eq!(encode_quoted_printable("Hello, World!"), "Hello, World!");
        assert_eq!(
            encode_quoted_printable("Héllo, Wørld!"),
            "H=C3=A9llo, W=C3=B8rld!"
        );
    }

    #[test]
    fn test_quoted_printable_keeps_line_breaks() {
        assert_eq!(encode_quoted_printable("a\nb\r\nc"), "a\r\nb\r\nc");
        assert_eq!(encode_quoted_printable("x = 1"), "x =3D 1");
    }

    #[test]
    fn test_quoted_printable_trailing_whitespace() {
        assert_eq!(encode_quoted_printable("end \nnext\t"), "end=20\r\nnext=09");
    }

    #[test]
    fn test_quoted_printable_soft_breaks() {
        let encoded = encode_quoted_printable(&"é".repeat(40));
        for line in encoded.split("\r\n") {
            assert!(line.len() <= MAX_LINE_LENGTH, "{line}");
        }
        // Soft breaks fall between escapes, never inside one.
        assert_eq!(encoded.replace("=\r\n", ""), "=C3=A9".repeat(40));
    }

    #[test]
    fn test_rfc2047_encode() {
        assert_eq!(encode_rfc2047("Hello", "utf-8"), "Hello");
        assert_eq!(encode_rfc2047("Héllo", "utf-8"), "=?utf-8?B?SMOpbGxv?=");
        assert_eq!(encode_rfc2047("a =?b?= c", "utf-8"), "=?utf-8?B?YSA9P2I/PSBj?=");
    }

    #[test]
    fn test_rfc2047_splits_long_values() {
        let text = "Grüße aus München, ".repeat(6);
        let encoded = encode_rfc2047(&text, "utf-8");
        assert!(encoded.contains("\r\n "));

        let mut decoded = Vec::new();
        for word in encoded.split("\r\n ") {
            assert!(word.len() <= 75, "{word}");
            let payload = word
                .strip_prefix("=?utf-8?B?")
                .and_then(|w| w.strip_suffix("?="))
                .unwrap();
            decoded.extend(STANDARD.decode(payload).unwrap());
        }
        assert_eq!(String::from_utf8(decoded).unwrap(), text);
    }

    #[test]
    fn test_encoded_words_force_ascii() {
        assert_eq!(encoded_words("abc", "utf-8"), "=?utf-8?B?YWJj?=");
    }
}
