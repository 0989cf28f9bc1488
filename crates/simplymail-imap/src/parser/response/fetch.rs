//! FETCH response parsing.

use crate::parser::lexer::{Lexer, Token};
use crate::types::Uid;
use crate::Result;

use super::helpers::{parse_flag_list, read_raw_until, skip_value};
use super::types::{FetchItem, MessagePart};

/// Parses the parenthesized item list of a FETCH response.
pub fn parse_fetch_response(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
    lexer.expect(Token::LParen)?;

    let mut items = Vec::new();

    loop {
        let name = match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => continue,
            Token::Atom(name) => name.to_ascii_uppercase(),
            token => {
                return Err(lexer.error(&format!("Unexpected token in FETCH: {token:?}")));
            }
        };

        match name.as_str() {
            "FLAGS" => {
                lexer.expect_space()?;
                items.push(FetchItem::Flags(parse_flag_list(lexer)?));
            }
            "UID" => {
                lexer.expect_space()?;
                let n = lexer.read_number()?;
                let uid = Uid::new(n).ok_or_else(|| lexer.error("Invalid UID 0"))?;
                items.push(FetchItem::Uid(uid));
            }
            "RFC822.SIZE" => {
                lexer.expect_space()?;
                items.push(FetchItem::Rfc822Size(lexer.read_number()?));
            }
            "INTERNALDATE" => {
                lexer.expect_space()?;
                match lexer.next_token()? {
                    Token::QuotedString(date) => {
                        items.push(FetchItem::InternalDate(date.into_owned()));
                    }
                    token => {
                        return Err(
                            lexer.error(&format!("Expected INTERNALDATE string, got {token:?}"))
                        );
                    }
                }
            }
            "BODY" | "BODY.PEEK" if lexer.peek() == Some(b'[') => {
                let (section, origin) = parse_section_and_origin(lexer)?;
                lexer.expect_space()?;
                let data = lexer.read_nstring_bytes()?;
                items.push(FetchItem::Body {
                    part: classify_section(&section),
                    section,
                    origin,
                    data,
                });
            }
            "RFC822" | "RFC822.TEXT" | "RFC822.HEADER" => {
                lexer.expect_space()?;
                let data = lexer.read_nstring_bytes()?;
                let part = match name.as_str() {
                    "RFC822" => MessagePart::Full,
                    "RFC822.TEXT" => MessagePart::Text,
                    _ => MessagePart::Header,
                };
                items.push(FetchItem::Body {
                    part,
                    section: String::new(),
                    origin: None,
                    data,
                });
            }
            other => {
                // ENVELOPE, BODYSTRUCTURE, MODSEQ and extensions.
                tracing::trace!(item = other, "Skipping FETCH item");
                lexer.expect_space()?;
                skip_value(lexer)?;
            }
        }
    }

    Ok(items)
}

/// Parses `[section]` and an optional `<origin>` following BODY.
fn parse_section_and_origin(lexer: &mut Lexer<'_>) -> Result<(String, Option<u32>)> {
    lexer.expect(Token::LBracket)?;
    let section = read_raw_until(lexer, b']')?;
    lexer.expect(Token::RBracket)?;

    let origin = if lexer.peek() == Some(b'<') {
        lexer.advance();
        let digits = read_raw_until(lexer, b'>')?;
        lexer.advance();
        let origin = digits
            .parse::<u32>()
            .map_err(|_| lexer.error(&format!("Invalid origin: {digits}")))?;
        Some(origin)
    } else {
        None
    };

    Ok((section, origin))
}

fn classify_section(section: &str) -> MessagePart {
    if section.is_empty() {
        MessagePart::Full
    } else if section.eq_ignore_ascii_case("TEXT") {
        MessagePart::Text
    } else if section.eq_ignore_ascii_case("HEADER") {
        MessagePart::Header
    } else {
        MessagePart::Section
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::types::Flag;

    fn parse(input: &[u8]) -> Vec<FetchItem> {
        parse_fetch_response(&mut Lexer::new(input)).unwrap()
    }

    #[test]
    fn test_body_literal_with_crlf() {
        let items = parse(b"(UID 7 BODY[] {12}\r\nSubject: x\r\n FLAGS (\\Seen))");
        assert_eq!(items.len(), 3);
        assert_eq!(
            items[1],
            FetchItem::Body {
                part: MessagePart::Full,
                section: String::new(),
                origin: None,
                data: Some(b"Subject: x\r\n".to_vec()),
            }
        );
        assert!(matches!(&items[2], FetchItem::Flags(f) if f.contains(&Flag::Seen)));
    }

    #[test]
    fn test_partial_section_and_nil() {
        let items = parse(b"(BODY[TEXT]<0> NIL BODY[1.MIME] \"x\")");
        assert_eq!(
            items[0],
            FetchItem::Body {
                part: MessagePart::Text,
                section: "TEXT".into(),
                origin: Some(0),
                data: None,
            }
        );
        assert!(matches!(
            &items[1],
            FetchItem::Body { part: MessagePart::Section, section, data: Some(d), .. }
                if section == "1.MIME" && d == b"x"
        ));
    }

    #[test]
    fn test_rfc822_items() {
        let items = parse(b"(RFC822.SIZE 44 RFC822 {2}\r\nhi INTERNALDATE \"17-Jul-1996 02:44:25 -0700\")");
        assert_eq!(items[0], FetchItem::Rfc822Size(44));
        assert!(matches!(
            &items[1],
            FetchItem::Body { part: MessagePart::Full, data: Some(d), .. } if d == b"hi"
        ));
        assert_eq!(
            items[2],
            FetchItem::InternalDate("17-Jul-1996 02:44:25 -0700".into())
        );
    }

    #[test]
    fn test_unknown_items_are_skipped() {
        let items = parse(
            b"(ENVELOPE (\"date\" \"subj\" ((NIL NIL \"a\" \"b.c\")) NIL NIL NIL NIL NIL NIL NIL) \
              MODSEQ (12345) X-GM-LABELS (\\Inbox \"Work\") UID 9)",
        );
        assert_eq!(items, vec![FetchItem::Uid(Uid::new(9).unwrap())]);
    }

    #[test]
    fn test_bodystructure_without_section_is_skipped() {
        let items = parse(b"(BODY (\"text\" \"plain\" NIL NIL NIL \"7bit\" 3 1) UID 2)");
        assert_eq!(items, vec![FetchItem::Uid(Uid::new(2).unwrap())]);
    }

    #[test]
    fn test_malformed_fetch_fails() {
        let result = parse_fetch_response(&mut Lexer::new(b"(UID abc)"));
        assert!(matches!(result, Err(Error::Parse { .. })));

        let result = parse_fetch_response(&mut Lexer::new(b"(BODY[] {50}\r\nshort)"));
        assert!(matches!(result, Err(Error::Parse { .. })));
    }
}
