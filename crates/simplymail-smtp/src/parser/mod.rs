//! SMTP response parser.
//!
//! SMTP replies can be single-line or multi-line:
//! - Single: `250 OK\r\n`
//! - Multi: `250-First line\r\n250-Second line\r\n250 Last line\r\n`
//!
//! [`ReplyAccumulator`] is sans-I/O: the connection feeds it one line at a
//! time until it yields a complete [`Reply`].

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// One decoded reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ReplyLine<'a> {
    code: ReplyCode,
    last: bool,
    text: &'a str,
}

fn parse_line(line: &str) -> Result<ReplyLine<'_>> {
    let bytes = line.as_bytes();
    if bytes.len() < 3 {
        return Err(Error::Parse(format!("Reply too short: {line:?}")));
    }

    let code = ReplyCode::from_digits([bytes[0], bytes[1], bytes[2]])
        .ok_or_else(|| Error::Parse(format!("Invalid reply code: {line:?}")))?;

    match bytes.get(3) {
        None => Ok(ReplyLine {
            code,
            last: true,
            text: "",
        }),
        Some(b' ') => Ok(ReplyLine {
            code,
            last: true,
            text: &line[4..],
        }),
        Some(b'-') => Ok(ReplyLine {
            code,
            last: false,
            text: &line[4..],
        }),
        Some(_) => Err(Error::Parse(format!("Malformed reply line: {line:?}"))),
    }
}

/// Collects the lines of one (possibly multi-line) reply.
#[derive(Debug, Default)]
pub struct ReplyAccumulator {
    code: Option<ReplyCode>,
    lines: Vec<String>,
}

impl ReplyAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no line has been fed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_none()
    }

    /// Feeds one line (without CRLF).
    ///
    /// Returns the complete reply once the final line (code followed by a
    /// space, or a bare code) arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is malformed or its code differs from
    /// the code of the preceding lines.
    pub fn push_line(&mut self, line: &str) -> Result<Option<Reply>> {
        let parsed = parse_line(line)?;

        match self.code {
            Some(code) if code != parsed.code => {
                return Err(Error::Parse(format!(
                    "Reply code changed from {code} to {} within one reply",
                    parsed.code
                )));
            }
            Some(_) => {}
            None => self.code = Some(parsed.code),
        }

        self.lines.push(parsed.text.to_string());

        if parsed.last {
            let lines = std::mem::take(&mut self.lines);
            self.code = None;
            Ok(Some(Reply::new(parsed.code, lines)))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    /// Feeds `lines` through one accumulator and expects exactly one reply.
    fn parse_reply(lines: &[String]) -> Result<Reply> {
        let mut accumulator = ReplyAccumulator::new();
        let mut iter = lines.iter();

        while let Some(line) = iter.next() {
            if let Some(reply) = accumulator.push_line(line)? {
                if iter.next().is_some() {
                    return Err(Error::Parse("Lines after final reply line".into()));
                }
                return Ok(reply);
            }
        }
        Err(Error::Parse("Reply ended without a final line".into()))
    }

    #[test]
    fn test_parse_single_line_reply() {
        let reply = parse_reply(&lines(&["250 OK"])).unwrap();
        assert_eq!(reply.code.as_u16(), 250);
        assert_eq!(reply.message, vec!["OK"]);
        assert!(reply.is_success());
    }

    #[test]
    fn test_parse_multi_line_reply() {
        let reply = parse_reply(&lines(&[
            "250-First line",
            "250-Second line",
            "250 Last line",
        ]))
        .unwrap();
        assert_eq!(reply.code.as_u16(), 250);
        assert_eq!(
            reply.message,
            vec!["First line", "Second line", "Last line"]
        );
        assert_eq!(reply.message_text(), "First line Second line Last line");
    }

    #[test]
    fn test_parse_bare_code() {
        let reply = parse_reply(&lines(&["250-smtp.example.com", "250"])).unwrap();
        assert_eq!(reply.message, vec!["smtp.example.com", ""]);
    }

    #[test]
    fn test_parse_error_empty() {
        assert!(parse_reply(&[]).is_err());
    }

    #[test]
    fn test_parse_error_too_short() {
        assert!(parse_reply(&lines(&["25"])).is_err());
    }

    #[test]
    fn test_parse_error_invalid_code() {
        assert!(parse_reply(&lines(&["ABC OK"])).is_err());
        assert!(parse_reply(&lines(&["+25 OK"])).is_err());
    }

    #[test]
    fn test_parse_error_bad_separator() {
        assert!(parse_reply(&lines(&["250:OK"])).is_err());
    }

    #[test]
    fn test_parse_error_code_mismatch() {
        let err = parse_reply(&lines(&["250-First", "251 Last"])).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_parse_error_trailing_lines() {
        assert!(parse_reply(&lines(&["250 OK", "250 Again"])).is_err());
    }

    #[test]
    fn test_parse_error_unterminated() {
        assert!(parse_reply(&lines(&["250-First", "250-Second"])).is_err());
    }

    #[test]
    fn test_accumulator_is_reusable() {
        let mut acc = ReplyAccumulator::new();
        assert!(acc.push_line("220-hello").unwrap().is_none());
        assert!(!acc.is_empty());
        let first = acc.push_line("220 ready").unwrap().unwrap();
        assert_eq!(first.code, ReplyCode::SERVICE_READY);
        assert!(acc.is_empty());

        let second = acc.push_line("250 OK").unwrap().unwrap();
        assert_eq!(second.code, ReplyCode::OK);
        assert_eq!(second.message, vec!["OK"]);
    }

    proptest! {
        #[test]
        fn prop_code_digits_roundtrip(code in 0u16..1000, text in "[ -~]{0,40}") {
            let line = format!("{code:03} {text}");
            let reply = parse_reply(&[line]).unwrap();
            let response = crate::types::SmtpResponse::from(&reply);
            prop_assert_eq!(u16::from(response.severity), code / 100);
            prop_assert_eq!(u16::from(response.category), code / 10 % 10);
            prop_assert_eq!(u16::from(response.detail), code % 10);
            prop_assert_eq!(response.message, text.trim().to_string());
        }

        #[test]
        fn prop_multiline_concatenates_in_order(
            code in 200u16..600,
            texts in proptest::collection::vec("[a-zA-Z0-9.]{1,12}", 1..6),
        ) {
            let mut raw: Vec<String> = texts[..texts.len() - 1]
                .iter()
                .map(|t| format!("{code}-{t}"))
                .collect();
            raw.push(format!("{code} {}", texts[texts.len() - 1]));

            let reply = parse_reply(&raw).unwrap();
            prop_assert_eq!(reply.code.as_u16(), code);
            prop_assert_eq!(reply.message_text(), texts.join(" "));
        }
    }
}
