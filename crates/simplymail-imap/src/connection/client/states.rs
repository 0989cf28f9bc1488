//! Connection states used as the `State` parameter of [`Client`].
//!
//! [`Client`]: super::Client

use std::sync::Arc;

use crate::types::{MailboxStatus, Uid, UidValidity};

/// Greeted with `* OK`; LOGIN or STARTTLS come next.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Logged in (or `PREAUTH`); a mailbox can be opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// A mailbox is open, together with what the server reported when opening it.
#[derive(Debug, Clone)]
pub struct Selected {
    pub(crate) mailbox: Arc<str>,
    pub(crate) status: MailboxStatus,
}

impl Selected {
    /// Records `status` for the opened `mailbox`.
    #[must_use]
    pub fn new(mailbox: impl Into<Arc<str>>, status: MailboxStatus) -> Self {
        Self {
            mailbox: mailbox.into(),
            status,
        }
    }

    /// Name the mailbox was opened with.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    /// Everything SELECT or EXAMINE reported.
    #[must_use]
    pub const fn status(&self) -> &MailboxStatus {
        &self.status
    }

    /// Whether writes are refused; always true after EXAMINE.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.status.read_only
    }

    /// Message count at open time.
    #[must_use]
    pub const fn exists(&self) -> u32 {
        self.status.exists
    }

    /// `\Recent` count at open time.
    #[must_use]
    pub const fn recent(&self) -> u32 {
        self.status.recent
    }

    /// `UIDVALIDITY`, if reported.
    #[must_use]
    pub fn uid_validity(&self) -> Option<u32> {
        self.status.uid_validity.map(UidValidity::get)
    }

    /// `UIDNEXT`, if reported.
    #[must_use]
    pub fn uid_next(&self) -> Option<u32> {
        self.status.uid_next.map(Uid::get)
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

    const fn _assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_states_cross_threads() {
        _assert_send_sync::<NotAuthenticated>();
        _assert_send_sync::<Authenticated>();
        _assert_send_sync::<Selected>();
    }

    #[test]
    fn test_selected_reports_open_time_status() {
        let selected = Selected::new(
            "Archive",
            MailboxStatus {
                exists: 9,
                recent: 2,
                uid_next: Uid::new(31),
                read_only: true,
                ..MailboxStatus::default()
            },
        );

        assert_eq!(selected.mailbox(), "Archive");
        assert!(selected.is_read_only());
        assert_eq!((selected.exists(), selected.recent()), (9, 2));
        assert_eq!(selected.uid_next(), Some(31));
        assert_eq!(selected.uid_validity(), None);
        assert_eq!(selected.status().newest().map(crate::types::SeqNum::get), Some(9));
    }
}
