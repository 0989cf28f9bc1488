//! Tokens of the response grammar.

use std::borrow::Cow;

/// One token of a server response.
///
/// Tokens borrow from the framed response; only quoted strings containing
/// escapes need an owned copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Run of atom characters that is not all digits and not `NIL`.
    Atom(&'a str),
    /// Quoted string with escapes resolved.
    QuotedString(Cow<'a, str>),
    /// Raw bytes of a `{n}` literal.
    Literal(&'a [u8]),
    /// Unsigned 32-bit number.
    Number(u32),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// Single space.
    Space,
    /// `*`, the untagged prefix.
    Asterisk,
    /// `+`, the continuation prefix.
    Plus,
    /// `NIL`, any case.
    Nil,
    /// Line end.
    Crlf,
    /// No input left.
    Eof,
}
