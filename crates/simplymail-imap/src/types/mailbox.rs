//! What SELECT and EXAMINE report about a mailbox.

use super::{Flags, SeqNum, Uid, UidValidity};

/// Untagged data gathered while opening a mailbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    /// `* n EXISTS`
    pub exists: u32,
    /// `* n RECENT`
    pub recent: u32,
    /// `[UNSEEN n]`
    pub unseen: Option<SeqNum>,
    /// `[UIDNEXT n]`
    pub uid_next: Option<Uid>,
    /// `[UIDVALIDITY n]`
    pub uid_validity: Option<UidValidity>,
    /// `* FLAGS (...)`
    pub flags: Flags,
    /// `[PERMANENTFLAGS (...)]`
    pub permanent_flags: Flags,
    /// `[READ-ONLY]`, always set after EXAMINE.
    pub read_only: bool,
}

impl MailboxStatus {
    /// Sequence number of the message added last; `None` when empty.
    #[must_use]
    pub fn newest(&self) -> Option<SeqNum> {
        SeqNum::new(self.exists)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn newest_follows_exists() {
        let status = MailboxStatus {
            exists: 17,
            ..MailboxStatus::default()
        };
        assert_eq!(status.newest().unwrap().get(), 17);
        assert_eq!(MailboxStatus::default().newest(), None);
    }
}
