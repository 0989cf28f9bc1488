//! Response codes.

use super::{Capability, Flags, SeqNum, Uid, UidValidity};

/// Bracketed response code carried by status responses, e.g.
/// `* OK [UIDVALIDITY 3857529045] UIDs valid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// ALERT: Human-readable message that MUST be shown to user.
    Alert,
    /// AUTHENTICATIONFAILED: credentials rejected (RFC 5530).
    AuthenticationFailed,
    /// CAPABILITY response.
    Capability(Vec<Capability>),
    /// PERMANENTFLAGS: Flags that can be changed permanently.
    PermanentFlags(Flags),
    /// READ-ONLY: Mailbox selected as read-only.
    ReadOnly,
    /// READ-WRITE: Mailbox selected as read-write.
    ReadWrite,
    /// UIDNEXT: Next UID to be assigned.
    UidNext(Uid),
    /// UIDVALIDITY: Unique identifier validity value.
    UidValidity(UidValidity),
    /// UNSEEN: First unseen message sequence number.
    Unseen(SeqNum),
    /// Any other code, with its raw arguments.
    Unknown {
        /// Upper-cased code name.
        name: String,
        /// Raw text between the name and `]`.
        args: String,
    },
}

impl ResponseCode {
    /// Returns true if the code reports rejected credentials.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failure_detection() {
        assert!(ResponseCode::AuthenticationFailed.is_auth_failure());
        assert!(!ResponseCode::Alert.is_auth_failure());
    }
}
