//! Tokenizer for framed server responses.
//!
//! Input is one complete response as produced by the framed reader, with
//! every `{n}` literal already inline. Tokens borrow from that buffer.

#![allow(clippy::missing_errors_doc)]

mod token;

use std::borrow::Cow;

pub use token::Token;

use crate::{Error, Result};

/// Cursor over one response.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Starts at the first byte of `input`.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Bytes not consumed yet.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    /// True once every byte has been consumed.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// The next byte, not consumed.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Consumes and returns the next byte.
    pub fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Consumes up to `n` bytes.
    pub fn skip(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n).min(self.input.len());
    }

    /// Consumes bytes while `pred` holds and returns them.
    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a [u8] {
        let input = self.input;
        let start = self.pos;
        let len = self.remaining().iter().take_while(|&&b| pred(b)).count();
        self.pos += len;
        &input[start..self.pos]
    }

    /// Produces the next token.
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        let Some(byte) = self.peek() else {
            return Ok(Token::Eof);
        };

        let single = match byte {
            b' ' => Some(Token::Space),
            b'(' => Some(Token::LParen),
            b')' => Some(Token::RParen),
            b'[' => Some(Token::LBracket),
            b']' => Some(Token::RBracket),
            b'*' => Some(Token::Asterisk),
            b'+' => Some(Token::Plus),
            _ => None,
        };
        if let Some(token) = single {
            self.pos += 1;
            return Ok(token);
        }

        match byte {
            b'\r' if self.remaining().starts_with(b"\r\n") => {
                self.pos += 2;
                Ok(Token::Crlf)
            }
            b'"' => self.quoted(),
            b'{' => self.literal(),
            _ if is_atom_char(byte) => self.atom(),
            _ => Err(self.error(&format!("Unexpected byte {byte:#04x}"))),
        }
    }

    /// `"..."` with `\"` and `\\` escapes. Borrowed unless an escape occurs.
    fn quoted(&mut self) -> Result<Token<'a>> {
        let input = self.input;
        self.pos += 1;
        let start = self.pos;
        let mut unescaped: Option<Vec<u8>> = None;

        loop {
            let at = self.pos;
            match self.advance() {
                Some(b'"') => break,
                Some(b'\\') => {
                    let escaped = match self.advance() {
                        Some(c @ (b'"' | b'\\')) => c,
                        Some(c) => {
                            let c = char::from(c);
                            return Err(self.error(&format!("Invalid escape \\{c}")));
                        }
                        None => return Err(self.error("Unterminated quoted string")),
                    };
                    unescaped
                        .get_or_insert_with(|| input[start..at].to_vec())
                        .push(escaped);
                }
                Some(c) => {
                    if let Some(buf) = unescaped.as_mut() {
                        buf.push(c);
                    }
                }
                None => return Err(self.error("Unterminated quoted string")),
            }
        }

        let text = match unescaped {
            Some(buf) => Cow::Owned(String::from_utf8_lossy(&buf).into_owned()),
            None => String::from_utf8_lossy(&input[start..self.pos - 1]),
        };
        Ok(Token::QuotedString(text))
    }

    /// `{n}` or `{n+}`, CRLF, then exactly `n` bytes.
    fn literal(&mut self) -> Result<Token<'a>> {
        self.pos += 1;
        let digits = self.take_while(|b| b.is_ascii_digit());
        let size: usize = std::str::from_utf8(digits)
            .ok()
            .and_then(|d| d.parse().ok())
            .ok_or_else(|| self.error("Invalid literal size"))?;

        if self.peek() == Some(b'+') {
            self.pos += 1;
        }
        if !self.remaining().starts_with(b"}\r\n") {
            return Err(self.error("Expected }CRLF after literal size"));
        }
        self.pos += 3;

        let data = self
            .remaining()
            .get(..size)
            .ok_or_else(|| self.error("Incomplete literal data"))?;
        self.pos += size;
        Ok(Token::Literal(data))
    }

    /// Atom, number or `NIL`.
    fn atom(&mut self) -> Result<Token<'a>> {
        let raw = self.take_while(is_atom_char);
        let text = std::str::from_utf8(raw).map_err(|_| self.error("Invalid UTF-8 in atom"))?;

        if text.bytes().all(|b| b.is_ascii_digit()) {
            return text
                .parse()
                .map(Token::Number)
                .map_err(|_| self.error("Number too large"));
        }
        if text.eq_ignore_ascii_case("NIL") {
            return Ok(Token::Nil);
        }
        Ok(Token::Atom(text))
    }

    /// Parse error at the current position.
    pub(crate) fn error(&self, message: &str) -> Error {
        Error::Parse {
            position: self.pos,
            message: message.to_string(),
        }
    }

    /// Consumes a token of the same kind as `expected`.
    #[allow(clippy::needless_pass_by_value)]
    pub fn expect(&mut self, expected: Token<'_>) -> Result<()> {
        let token = self.next_token()?;
        if std::mem::discriminant(&token) == std::mem::discriminant(&expected) {
            Ok(())
        } else {
            Err(self.error(&format!("Expected {expected:?}, got {token:?}")))
        }
    }

    /// Consumes a space.
    pub fn expect_space(&mut self) -> Result<()> {
        self.expect(Token::Space)
    }

    /// Consumes a line end.
    pub fn expect_crlf(&mut self) -> Result<()> {
        self.expect(Token::Crlf)
    }

    /// Reads `NIL`, a quoted string or a literal as raw bytes.
    pub fn read_nstring_bytes(&mut self) -> Result<Option<Vec<u8>>> {
        match self.next_token()? {
            Token::Nil => Ok(None),
            Token::QuotedString(s) => Ok(Some(s.into_owned().into_bytes())),
            Token::Literal(data) => Ok(Some(data.to_vec())),
            token => Err(self.error(&format!("Expected nstring, got {token:?}"))),
        }
    }

    /// Reads a number.
    pub fn read_number(&mut self) -> Result<u32> {
        match self.next_token()? {
            Token::Number(n) => Ok(n),
            token => Err(self.error(&format!("Expected number, got {token:?}"))),
        }
    }

    /// Reads an atom.
    pub fn read_atom_string(&mut self) -> Result<&'a str> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s),
            token => Err(self.error(&format!("Expected atom, got {token:?}"))),
        }
    }
}

/// Printable ASCII minus the atom-specials.
///
/// `\` counts as an atom character so that flags such as `\Seen` come out
/// as one token.
const fn is_atom_char(b: u8) -> bool {
    b.is_ascii_graphic()
        && !matches!(
            b,
            b'"' | b'%' | b'(' | b')' | b'*' | b'[' | b']' | b'{' | b'}'
        )
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

    fn tokens(input: &[u8]) -> Vec<Token<'_>> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            match lexer.next_token().unwrap() {
                Token::Eof => return out,
                token => out.push(token),
            }
        }
    }

    #[test]
    fn test_status_line() {
        assert_eq!(
            tokens(b"A0003 OK [READ-ONLY] done\r\n"),
            vec![
                Token::Atom("A0003"),
                Token::Space,
                Token::Atom("OK"),
                Token::Space,
                Token::LBracket,
                Token::Atom("READ-ONLY"),
                Token::RBracket,
                Token::Space,
                Token::Atom("done"),
                Token::Crlf,
            ]
        );
    }

    #[test]
    fn test_untagged_and_continuation_prefixes() {
        assert_eq!(
            tokens(b"* 12 EXISTS"),
            vec![
                Token::Asterisk,
                Token::Space,
                Token::Number(12),
                Token::Space,
                Token::Atom("EXISTS")
            ]
        );
        assert_eq!(tokens(b"+ go")[0], Token::Plus);
    }

    #[test]
    fn test_digits_followed_by_letters_are_an_atom() {
        assert_eq!(tokens(b"3rd"), vec![Token::Atom("3rd")]);
    }

    #[test]
    fn test_number_overflow() {
        let mut lexer = Lexer::new(b"99999999999");
        assert!(matches!(lexer.next_token(), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_nil_any_case() {
        assert_eq!(
            tokens(b"NIL nil"),
            vec![Token::Nil, Token::Space, Token::Nil]
        );
    }

    #[test]
    fn test_quoted_borrowed_and_escaped() {
        let plain = tokens(b"\"17-Jul-1996 02:44:25 -0700\"");
        assert!(matches!(
            &plain[0],
            Token::QuotedString(Cow::Borrowed("17-Jul-1996 02:44:25 -0700"))
        ));

        let escaped = tokens(br#""say \"hi\" \\ bye""#);
        assert_eq!(
            escaped,
            vec![Token::QuotedString(Cow::Owned(r#"say "hi" \ bye"#.into()))]
        );
    }

    #[test]
    fn test_bad_escape_and_unterminated_quote() {
        assert!(Lexer::new(br#""a\nb""#).next_token().is_err());
        assert!(Lexer::new(b"\"open").next_token().is_err());
    }

    #[test]
    fn test_flag_list() {
        assert_eq!(
            tokens(b"(\\Seen $Junk)"),
            vec![
                Token::LParen,
                Token::Atom("\\Seen"),
                Token::Space,
                Token::Atom("$Junk"),
                Token::RParen
            ]
        );
    }

    #[test]
    fn test_literal_keeps_crlf_and_parens() {
        assert_eq!(
            tokens(b"{7}\r\na\r\n(b)\r)"),
            vec![Token::Literal(b"a\r\n(b)\r"), Token::RParen]
        );
    }

    #[test]
    fn test_non_synchronizing_literal_marker() {
        assert_eq!(tokens(b"{2+}\r\nok"), vec![Token::Literal(b"ok")]);
    }

    #[test]
    fn test_literal_errors() {
        assert!(Lexer::new(b"{10}\r\nshort").next_token().is_err());
        assert!(Lexer::new(b"{x}\r\n").next_token().is_err());
        assert!(Lexer::new(b"{3}abc").next_token().is_err());
    }

    #[test]
    fn test_read_nstring_bytes() {
        let mut lexer = Lexer::new(b"NIL \"hi\" {2}\r\n\xff\xfe");
        assert_eq!(lexer.read_nstring_bytes().unwrap(), None);
        lexer.expect_space().unwrap();
        assert_eq!(lexer.read_nstring_bytes().unwrap(), Some(b"hi".to_vec()));
        lexer.expect_space().unwrap();
        assert_eq!(lexer.read_nstring_bytes().unwrap(), Some(vec![0xff, 0xfe]));
        assert!(lexer.is_eof());
    }

    #[test]
    fn test_lone_cr_rejected() {
        let err = Lexer::new(b"\rx").next_token().unwrap_err();
        assert!(matches!(err, Error::Parse { position: 0, .. }));
    }

    #[test]
    fn test_atom_chars() {
        for b in [b'A', b'z', b'0', b':', b'\\', b'$', b'.'] {
            assert!(is_atom_char(b), "{}", b as char);
        }
        for b in [b' ', b'(', b')', b'{', b']', b'[', b'"', b'*', b'%', 0x7f] {
            assert!(!is_atom_char(b), "{b:#x}");
        }
    }
}
