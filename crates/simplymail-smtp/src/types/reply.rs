//! Server replies.

use std::fmt;

/// Complete reply, possibly spanning several `xyz-` continuation lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Three-digit code shared by every line.
    pub code: ReplyCode,
    /// Text of each line after the code and separator.
    pub message: Vec<String>,
}

impl Reply {
    /// Pairs a code with its lines.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// Whether the code is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.severity() == 2
    }

    /// All non-blank lines, trimmed and joined by single spaces.
    #[must_use]
    pub fn message_text(&self) -> String {
        let lines: Vec<&str> = self
            .message
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect();
        lines.join(" ")
    }
}

/// Reply code kept as its three decimal digits.
///
/// The first digit says how the command fared (2 done, 3 send more,
/// 4 failed for now, 5 failed for good), the second names the subject area
/// and the third refines it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode([u8; 3]);

impl ReplyCode {
    /// 220 greeting.
    pub const SERVICE_READY: Self = Self([2, 2, 0]);
    /// 221 reply to QUIT.
    pub const CLOSING: Self = Self([2, 2, 1]);
    /// 235 AUTH accepted.
    pub const AUTH_SUCCEEDED: Self = Self([2, 3, 5]);
    /// 250 command completed.
    pub const OK: Self = Self([2, 5, 0]);
    /// 334 AUTH challenge.
    pub const AUTH_CONTINUE: Self = Self([3, 3, 4]);
    /// 354 go ahead with the message.
    pub const START_DATA: Self = Self([3, 5, 4]);
    /// 421 server shutting the channel.
    pub const SERVICE_UNAVAILABLE: Self = Self([4, 2, 1]);
    /// 450 mailbox busy.
    pub const MAILBOX_BUSY: Self = Self([4, 5, 0]);
    /// 535 credentials rejected.
    pub const AUTH_FAILED: Self = Self([5, 3, 5]);
    /// 554 transaction failed.
    pub const TRANSACTION_FAILED: Self = Self([5, 5, 4]);

    /// Reads three ASCII digits; `None` if any byte is not a digit.
    #[must_use]
    pub const fn from_digits(digits: [u8; 3]) -> Option<Self> {
        let [a, b, c] = digits;
        if a.is_ascii_digit() && b.is_ascii_digit() && c.is_ascii_digit() {
            Some(Self([a - b'0', b - b'0', c - b'0']))
        } else {
            None
        }
    }

    /// The code as a number, e.g. `250`.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn as_u16(self) -> u16 {
        let [a, b, c] = self.0;
        a as u16 * 100 + b as u16 * 10 + c as u16
    }

    /// First digit.
    #[must_use]
    pub const fn severity(self) -> u8 {
        self.0[0]
    }

    /// Second digit.
    #[must_use]
    pub const fn category(self) -> u8 {
        self.0[1]
    }

    /// Third digit.
    #[must_use]
    pub const fn detail(self) -> u8 {
        self.0[2]
    }

    /// Whether the command failed, temporarily (4xx) or for good (5xx).
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self.severity(), 4 | 5)
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{a}{b}{c}")
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
    fn digits_and_number_agree() {
        let code = ReplyCode::from_digits(*b"354").unwrap();
        assert_eq!(code, ReplyCode::START_DATA);
        assert_eq!(
            (code.severity(), code.category(), code.detail()),
            (3, 5, 4)
        );
        assert_eq!(code.as_u16(), 354);
        assert_eq!(ReplyCode::from_digits(*b"007").unwrap().as_u16(), 7);
    }

    #[test]
    fn non_digits_rejected() {
        assert_eq!(ReplyCode::from_digits(*b"+25"), None);
        assert_eq!(ReplyCode::from_digits(*b"2a0"), None);
    }

    #[test]
    fn display_keeps_leading_zeros() {
        assert_eq!(ReplyCode::OK.to_string(), "250");
        assert_eq!(ReplyCode::from_digits(*b"007").unwrap().to_string(), "007");
    }

    #[test]
    fn error_classes() {
        assert!(ReplyCode::MAILBOX_BUSY.is_error());
        assert!(ReplyCode::AUTH_FAILED.is_error());
        assert!(!ReplyCode::START_DATA.is_error());
        assert!(!ReplyCode::CLOSING.is_error());
    }

    #[test]
    fn message_text_joins_non_blank_lines() {
        let reply = Reply::new(
            ReplyCode::SERVICE_READY,
            vec![
                "smtp.example.com ESMTP".to_string(),
                String::new(),
                " Ready to serve ".to_string(),
            ],
        );
        assert_eq!(reply.message_text(), "smtp.example.com ESMTP Ready to serve");
        assert!(reply.is_success());
        assert_eq!(Reply::new(ReplyCode::OK, vec![]).message_text(), "");
    }

    #[test]
    fn busy_reply_is_not_success() {
        let reply = Reply::new(ReplyCode::MAILBOX_BUSY, vec!["Busy".to_string()]);
        assert!(!reply.is_success());
    }
}
