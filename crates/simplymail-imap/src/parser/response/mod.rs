//! Response grammar.
//!
//! [`ResponseParser::parse`] takes exactly one framed response, literals
//! inline and trailing CRLF included, and rejects anything left over.

#![allow(clippy::missing_errors_doc)]

mod fetch;
mod helpers;
mod types;

pub use types::{FetchItem, MessagePart, UntaggedResponse, message_content};

use crate::parser::lexer::{Lexer, Token};
use crate::types::{ResponseCode, SeqNum, Status, Tag};
use crate::{Error, Result};

use helpers::{parse_capability_data, parse_flag_list, parse_response_code, read_text_until_crlf};

/// One server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Completion of the command carrying `tag`.
    Tagged {
        /// Tag of the completed command.
        tag: Tag,
        /// Outcome.
        status: Status,
        /// Bracketed response code, if any.
        code: Option<ResponseCode>,
        /// Remaining human-readable text.
        text: String,
    },
    /// `*` data.
    Untagged(UntaggedResponse),
    /// `+` request for more client data.
    Continuation {
        /// Text after the `+`, if any.
        text: Option<String>,
    },
}

/// Entry point of the grammar.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses one complete response.
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut lexer = Lexer::new(input);

        let response = match lexer.next_token()? {
            Token::Asterisk => Response::Untagged(untagged(&mut lexer)?),
            Token::Plus => continuation(&mut lexer),
            Token::Atom(tag) => tagged(&mut lexer, tag)?,
            Token::Number(n) => tagged(&mut lexer, &n.to_string())?,
            token => {
                return Err(Error::Parse {
                    position: 0,
                    message: format!("Expected *, + or a tag, got {token:?}"),
                });
            }
        };

        if lexer.is_eof() {
            Ok(response)
        } else {
            Err(lexer.error("Trailing data after response"))
        }
    }
}

/// `tag SP status SP resp-text CRLF`
fn tagged(lexer: &mut Lexer<'_>, tag: &str) -> Result<Response> {
    lexer.expect_space()?;
    let keyword = lexer.read_atom_string()?;
    let status = Status::parse(keyword)
        .ok_or_else(|| lexer.error(&format!("Invalid status: {keyword}")))?;
    let (code, text) = resp_text(lexer)?;

    Ok(Response::Tagged {
        tag: Tag::new(tag),
        status,
        code,
        text,
    })
}

/// Everything after `* `.
fn untagged(lexer: &mut Lexer<'_>) -> Result<UntaggedResponse> {
    lexer.expect_space()?;

    match lexer.next_token()? {
        Token::Number(n) => message_data(lexer, n),
        Token::Atom(keyword) => {
            if let Some(status) = Status::parse(keyword) {
                let (code, text) = resp_text(lexer)?;
                return Ok(UntaggedResponse::Status { status, code, text });
            }

            let keyword = keyword.to_ascii_uppercase();
            let data = match keyword.as_str() {
                "CAPABILITY" => UntaggedResponse::Capability(parse_capability_data(lexer)?),
                "FLAGS" => {
                    lexer.expect_space()?;
                    UntaggedResponse::Flags(parse_flag_list(lexer)?)
                }
                _ => {
                    tracing::trace!(%keyword, "Skipping untagged data");
                    read_text_until_crlf(lexer);
                    return Ok(UntaggedResponse::Other { keyword });
                }
            };
            lexer.expect_crlf()?;
            Ok(data)
        }
        token => Err(lexer.error(&format!("Unexpected token after *: {token:?}"))),
    }
}

/// `n SP keyword ...`: EXISTS, RECENT, EXPUNGE and FETCH.
fn message_data(lexer: &mut Lexer<'_>, n: u32) -> Result<UntaggedResponse> {
    lexer.expect_space()?;
    let keyword = lexer.read_atom_string()?.to_ascii_uppercase();

    let data = match keyword.as_str() {
        "EXISTS" => UntaggedResponse::Exists(n),
        "RECENT" => UntaggedResponse::Recent(n),
        "EXPUNGE" => UntaggedResponse::Expunge(seq_num(lexer, n)?),
        "FETCH" => {
            let seq = seq_num(lexer, n)?;
            lexer.expect_space()?;
            let items = fetch::parse_fetch_response(lexer)?;
            UntaggedResponse::Fetch { seq, items }
        }
        _ => return Err(lexer.error(&format!("Unknown message data: {keyword}"))),
    };
    lexer.expect_crlf()?;
    Ok(data)
}

fn seq_num(lexer: &Lexer<'_>, n: u32) -> Result<SeqNum> {
    SeqNum::new(n).ok_or_else(|| lexer.error("Invalid sequence number 0"))
}

/// `+ [text] CRLF`
fn continuation(lexer: &mut Lexer<'_>) -> Response {
    if lexer.peek() == Some(b' ') {
        lexer.advance();
    }
    let text = read_text_until_crlf(lexer);
    Response::Continuation {
        text: (!text.is_empty()).then_some(text),
    }
}

/// `SP ["[" resp-text-code "]" SP] text CRLF`.
///
/// A status with nothing after it (`A1 OK\r\n`) yields empty text.
fn resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<ResponseCode>, String)> {
    match lexer.peek() {
        Some(b' ') => {
            lexer.advance();
        }
        Some(b'\r') => {
            lexer.expect_crlf()?;
            return Ok((None, String::new()));
        }
        _ => return Err(lexer.error("Expected SP after status")),
    }

    let code = if lexer.peek() == Some(b'[') {
        let code = parse_response_code(lexer)?;
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }
        Some(code)
    } else {
        None
    };

    Ok((code, read_text_until_crlf(lexer)))
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
    use crate::types::{Capability, Flag};

    use super::*;

    fn untagged_of(input: &[u8]) -> UntaggedResponse {
        match ResponseParser::parse(input).unwrap() {
            Response::Untagged(data) => data,
            other => panic!("Expected untagged data, got {other:?}"),
        }
    }

    #[test]
    fn test_greeting() {
        assert_eq!(
            untagged_of(b"* OK IMAP4rev1 server ready\r\n"),
            UntaggedResponse::Status {
                status: Status::Ok,
                code: None,
                text: "IMAP4rev1 server ready".into()
            }
        );
        assert!(matches!(
            untagged_of(b"* PREAUTH welcome back\r\n"),
            UntaggedResponse::Status {
                status: Status::PreAuth,
                ..
            }
        ));
    }

    #[test]
    fn test_tagged_completion() {
        let response = ResponseParser::parse(b"A0001 OK LOGIN completed\r\n").unwrap();
        assert_eq!(
            response,
            Response::Tagged {
                tag: Tag::new("A0001"),
                status: Status::Ok,
                code: None,
                text: "LOGIN completed".into()
            }
        );
    }

    #[test]
    fn test_tagged_no_with_code() {
        let response =
            ResponseParser::parse(b"A0002 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n")
                .unwrap();
        let Response::Tagged {
            status, code, text, ..
        } = response
        else {
            panic!("Expected tagged response");
        };
        assert_eq!(status, Status::No);
        assert!(code.unwrap().is_auth_failure());
        assert_eq!(text, "Invalid credentials");
    }

    #[test]
    fn test_bare_tagged_ok() {
        let response = ResponseParser::parse(b"A3 OK\r\n").unwrap();
        assert!(matches!(response, Response::Tagged { text, .. } if text.is_empty()));
    }

    #[test]
    fn test_bye_with_code() {
        let data = untagged_of(b"* BYE [ALERT] maintenance\r\n");
        assert_eq!(
            data,
            UntaggedResponse::Status {
                status: Status::Bye,
                code: Some(ResponseCode::Alert),
                text: "maintenance".into()
            }
        );
    }

    #[test]
    fn test_capability_data() {
        let UntaggedResponse::Capability(caps) =
            untagged_of(b"* CAPABILITY IMAP4rev1 STARTTLS AUTH=PLAIN IDLE\r\n")
        else {
            panic!("Expected CAPABILITY");
        };
        assert_eq!(
            caps,
            vec![
                Capability::Imap4Rev1,
                Capability::StartTls,
                Capability::Auth("PLAIN".into()),
                Capability::Other("IDLE".into())
            ]
        );
    }

    #[test]
    fn test_mailbox_data() {
        assert_eq!(untagged_of(b"* 23 EXISTS\r\n"), UntaggedResponse::Exists(23));
        assert_eq!(untagged_of(b"* 0 RECENT\r\n"), UntaggedResponse::Recent(0));

        let UntaggedResponse::Flags(flags) =
            untagged_of(b"* FLAGS (\\Seen \\Answered \\Flagged \\Deleted \\Draft)\r\n")
        else {
            panic!("Expected FLAGS");
        };
        assert!(flags.contains(&Flag::Draft));
        assert_eq!(flags.len(), 5);
    }

    #[test]
    fn test_uidvalidity_code() {
        let UntaggedResponse::Status { code, text, .. } =
            untagged_of(b"* OK [UIDVALIDITY 1234567890] UIDs valid\r\n")
        else {
            panic!("Expected status");
        };
        assert!(matches!(code, Some(ResponseCode::UidValidity(v)) if v.get() == 1_234_567_890));
        assert_eq!(text, "UIDs valid");
    }

    #[test]
    fn test_unknown_untagged_is_tolerated() {
        assert_eq!(
            untagged_of(b"* LIST (\\HasNoChildren) \"/\" INBOX\r\n"),
            UntaggedResponse::Other {
                keyword: "LIST".into()
            }
        );
    }

    #[test]
    fn test_continuation() {
        assert_eq!(
            ResponseParser::parse(b"+ Ready for literal\r\n").unwrap(),
            Response::Continuation {
                text: Some("Ready for literal".to_string())
            }
        );
        assert_eq!(
            ResponseParser::parse(b"+\r\n").unwrap(),
            Response::Continuation { text: None }
        );
    }

    #[test]
    fn test_fetch_with_literal() {
        let UntaggedResponse::Fetch { seq, items } =
            untagged_of(b"* 3 FETCH (FLAGS (\\Seen) BODY[] {5}\r\nhello)\r\n")
        else {
            panic!("Expected FETCH");
        };
        assert_eq!(seq.get(), 3);
        assert_eq!(message_content(&items), Some(b"hello".to_vec()));
    }

    #[test]
    fn test_malformed_responses() {
        for input in [
            &b"* 0 EXPUNGE\r\n"[..],
            b"* 4 WHATEVER\r\n",
            b"A1 MAYBE done\r\n",
            b"* 5 EXISTS extra\r\n",
            b"(\r\n",
            b"* 1 FETCH (UID 1\r\n",
            b"A1 OK done\r\nA2 OK again\r\n",
        ] {
            assert!(
                matches!(ResponseParser::parse(input), Err(Error::Parse { .. })),
                "{:?} should not parse",
                String::from_utf8_lossy(input)
            );
        }
    }
}
