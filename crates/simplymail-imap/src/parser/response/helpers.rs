//! Parser helper functions.

use crate::parser::lexer::{Lexer, Token};
use crate::types::{Capability, Flag, Flags, ResponseCode, SeqNum, Uid, UidValidity};
use crate::Result;

/// Parses a bracketed response code, `[` through `]`.
pub fn parse_response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    lexer.expect(Token::LBracket)?;

    let name = lexer.read_atom_string()?.to_ascii_uppercase();

    let code = match name.as_str() {
        "ALERT" => ResponseCode::Alert,
        "AUTHENTICATIONFAILED" => ResponseCode::AuthenticationFailed,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "UIDNEXT" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            ResponseCode::UidNext(Uid::new(n).ok_or_else(|| lexer.error("Invalid UID 0"))?)
        }
        "UIDVALIDITY" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            let validity =
                UidValidity::new(n).ok_or_else(|| lexer.error("Invalid UIDVALIDITY 0"))?;
            ResponseCode::UidValidity(validity)
        }
        "UNSEEN" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            ResponseCode::Unseen(
                SeqNum::new(n).ok_or_else(|| lexer.error("Invalid sequence number 0"))?,
            )
        }
        "CAPABILITY" => ResponseCode::Capability(parse_capability_data(lexer)?),
        "PERMANENTFLAGS" => {
            lexer.expect_space()?;
            ResponseCode::PermanentFlags(parse_flag_list(lexer)?)
        }
        _ => {
            let args = read_raw_until(lexer, b']')?;
            ResponseCode::Unknown {
                name,
                args: args.trim().to_string(),
            }
        }
    };

    lexer.expect(Token::RBracket)?;
    Ok(code)
}

/// Parses capability data: a space-separated list of atoms.
pub fn parse_capability_data(lexer: &mut Lexer<'_>) -> Result<Vec<Capability>> {
    let mut caps = Vec::new();

    while lexer.peek() == Some(b' ') {
        lexer.advance();
        if let Token::Atom(s) = lexer.next_token()? {
            caps.push(Capability::parse(s));
        }
    }

    Ok(caps)
}

/// Parses a parenthesized flag list.
pub fn parse_flag_list(lexer: &mut Lexer<'_>) -> Result<Flags> {
    lexer.expect(Token::LParen)?;

    let mut flags = Flags::new();

    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            // `\*` lexes as a lone backslash followed by an asterisk.
            Token::Atom("\\") if lexer.peek() == Some(b'*') => {
                lexer.advance();
                flags.insert(Flag::Wildcard);
            }
            Token::Atom(s) => flags.insert(Flag::parse(s)),
            token => {
                return Err(lexer.error(&format!("Unexpected token in flag list: {token:?}")));
            }
        }
    }

    Ok(flags)
}

/// Skips one value: an atom, number, string, literal, NIL or a
/// parenthesized list of values.
pub fn skip_value(lexer: &mut Lexer<'_>) -> Result<()> {
    let mut depth = 0usize;

    loop {
        match lexer.next_token()? {
            Token::LParen => depth += 1,
            Token::RParen if depth > 0 => depth -= 1,
            Token::Space if depth > 0 => continue,
            Token::Atom(_) if lexer.peek() == Some(b'[') => {
                // Section-bearing atoms such as `BODY[HEADER]` inside lists.
                lexer.advance();
                read_raw_until(lexer, b']')?;
                lexer.expect(Token::RBracket)?;
            }
            Token::Atom(_)
            | Token::Number(_)
            | Token::QuotedString(_)
            | Token::Literal(_)
            | Token::Nil
            | Token::Asterisk
            | Token::Plus => {}
            token => return Err(lexer.error(&format!("Unexpected token in value: {token:?}"))),
        }

        if depth == 0 {
            return Ok(());
        }
    }
}

/// Reads raw bytes up to (not including) `end`, without consuming it.
///
/// Fails if the line ends first.
pub fn read_raw_until(lexer: &mut Lexer<'_>, end: u8) -> Result<String> {
    let remaining = lexer.remaining();
    match remaining.iter().position(|&b| b == end || b == b'\r') {
        Some(len) if remaining[len] == end => {
            lexer.skip(len);
            Ok(String::from_utf8_lossy(&remaining[..len]).into_owned())
        }
        _ => Err(lexer.error(&format!("Missing '{}'", char::from(end)))),
    }
}

/// Reads text until CRLF, consuming the CRLF.
///
/// Invalid UTF-8 is replaced rather than rejected; servers put localized
/// text here.
pub fn read_text_until_crlf(lexer: &mut Lexer<'_>) -> String {
    let remaining = lexer.remaining();

    let end = remaining
        .windows(2)
        .position(|w| w == b"\r\n")
        .unwrap_or(remaining.len());

    lexer.skip(end);

    if lexer.peek() == Some(b'\r') {
        lexer.skip(2);
    }

    String::from_utf8_lossy(&remaining[..end]).into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_permanent_flags_with_wildcard() {
        let mut lexer = Lexer::new(b"[PERMANENTFLAGS (\\Seen \\Deleted \\*)]");
        let code = parse_response_code(&mut lexer).unwrap();
        let ResponseCode::PermanentFlags(flags) = code else {
            panic!("Expected PERMANENTFLAGS, got {code:?}");
        };
        assert!(flags.contains(&Flag::Seen));
        assert!(flags.contains(&Flag::Wildcard));
        assert_eq!(flags.len(), 3);
    }

    #[test]
    fn test_unknown_code_keeps_args() {
        let mut lexer = Lexer::new(b"[HIGHESTMODSEQ 715194045007] rest");
        let code = parse_response_code(&mut lexer).unwrap();
        assert_eq!(
            code,
            ResponseCode::Unknown {
                name: "HIGHESTMODSEQ".into(),
                args: "715194045007".into(),
            }
        );
        assert_eq!(lexer.remaining(), b" rest");
    }

    #[test]
    fn test_unterminated_code_fails() {
        let mut lexer = Lexer::new(b"[NOTCLOSED whatever\r\n");
        assert!(matches!(
            parse_response_code(&mut lexer),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_skip_nested_value() {
        let mut lexer = Lexer::new(b"(\"a\" (NIL {3}\r\nx)y 12) BODY[TEXT] NEXT");
        skip_value(&mut lexer).unwrap();
        assert_eq!(lexer.remaining(), b" BODY[TEXT] NEXT");
        lexer.advance();
        skip_value(&mut lexer).unwrap();
        assert_eq!(lexer.remaining(), b" NEXT");
    }

    #[test]
    fn test_text_is_lossy() {
        let mut lexer = Lexer::new(b"caf\xe9 ok\r\n");
        assert_eq!(read_text_until_crlf(&mut lexer), "caf\u{fffd} ok");
        assert!(lexer.is_eof());
    }
}
