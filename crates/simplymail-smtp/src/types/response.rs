//! Decoded final reply handed back to callers.

use super::reply::Reply;

/// Final server reply of an SMTP operation, split into its code digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SmtpResponse {
    /// First digit of the reply code (2 success, 3 intermediate,
    /// 4 transient failure, 5 permanent failure).
    pub severity: u8,
    /// Second digit of the reply code.
    pub category: u8,
    /// Third digit of the reply code.
    pub detail: u8,
    /// Reply text with line breaks removed.
    pub message: String,
}

impl SmtpResponse {
    /// Returns true if the reply reported success (`severity == 2`).
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.severity == 2
    }

    /// Reassembles the three-digit reply code.
    #[must_use]
    pub fn code(&self) -> u16 {
        u16::from(self.severity) * 100 + u16::from(self.category) * 10 + u16::from(self.detail)
    }
}

impl From<&Reply> for SmtpResponse {
    fn from(reply: &Reply) -> Self {
        Self {
            severity: reply.code.severity(),
            category: reply.code.category(),
            detail: reply.code.detail(),
            message: reply.message_text(),
        }
    }
}

impl std::fmt::Display for SmtpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{} {}",
            self.severity, self.category, self.detail, self.message
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::ReplyCode;

    #[test]
    fn splits_code_digits() {
        let reply = Reply::new(ReplyCode::OK, vec!["OK".to_string()]);
        let response = SmtpResponse::from(&reply);
        assert_eq!(response.severity, 2);
        assert_eq!(response.category, 5);
        assert_eq!(response.detail, 0);
        assert_eq!(response.message, "OK");
        assert!(response.is_positive());
        assert_eq!(response.code(), 250);
    }

    #[test]
    fn keeps_enhanced_status_in_message() {
        let reply = Reply::new(
            ReplyCode::OK,
            vec!["2.0.0 OK: queued as 1234".to_string()],
        );
        let response = SmtpResponse::from(&reply);
        assert_eq!(response.message, "2.0.0 OK: queued as 1234");
        assert_eq!(response.to_string(), "250 2.0.0 OK: queued as 1234");
    }
}
