//! Command serialization helpers.

/// Writes an astring: an atom when safe, otherwise a quoted string.
///
/// Returns the bytes of a synchronizing literal instead when the value
/// cannot be quoted (CR, LF, NUL or 8-bit data). The caller must then send
/// `{n}\r\n`, wait for the `+` continuation and send the returned bytes.
pub fn write_astring(buf: &mut Vec<u8>, s: &str) -> Option<Vec<u8>> {
    if s.bytes().any(needs_literal) {
        buf.extend_from_slice(format!("{{{}}}", s.len()).as_bytes());
        return Some(s.as_bytes().to_vec());
    }

    if s.is_empty() || s.bytes().any(needs_quoting) {
        write_quoted(buf, s);
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
    None
}

/// Writes a quoted string, escaping `"` and `\`.
///
/// The value must not contain bytes for which [`needs_literal`] holds.
pub fn write_quoted(buf: &mut Vec<u8>, s: &str) {
    buf.push(b'"');
    for b in s.bytes() {
        if b == b'"' || b == b'\\' {
            buf.push(b'\\');
        }
        buf.push(b);
    }
    buf.push(b'"');
}

/// Returns true if the byte needs quoting.
const fn needs_quoting(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'}' | b'%' | b'*' | b']'
    ) || b < 0x20
        || b == 0x7F
}

/// Returns true if the byte cannot appear inside a quoted string.
const fn needs_literal(b: u8) -> bool {
    matches!(b, b'\r' | b'\n' | 0) || b >= 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    fn astring(s: &str) -> (String, Option<Vec<u8>>) {
        let mut buf = Vec::new();
        let literal = write_astring(&mut buf, s);
        (String::from_utf8(buf).unwrap_or_default(), literal)
    }

    #[test]
    fn atoms_are_bare() {
        assert_eq!(astring("INBOX"), ("INBOX".to_string(), None));
        assert_eq!(astring("user@example.com"), ("user@example.com".to_string(), None));
    }

    #[test]
    fn specials_are_quoted() {
        assert_eq!(astring(""), ("\"\"".to_string(), None));
        assert_eq!(astring("pass word"), ("\"pass word\"".to_string(), None));
        assert_eq!(astring("a\"b\\c"), ("\"a\\\"b\\\\c\"".to_string(), None));
    }

    #[test]
    fn eight_bit_becomes_literal() {
        let (prefix, literal) = astring("pässword");
        assert_eq!(prefix, "{9}");
        assert_eq!(literal.as_deref(), Some("pässword".as_bytes()));
    }

    #[test]
    fn crlf_becomes_literal() {
        let (prefix, literal) = astring("a\r\nb");
        assert_eq!(prefix, "{4}");
        assert_eq!(literal.as_deref(), Some(&b"a\r\nb"[..]));
    }
}
