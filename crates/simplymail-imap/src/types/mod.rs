//! Core IMAP types.
//!
//! The subset of RFC 9051 (`IMAP4rev2`) and RFC 3501 (`IMAP4rev1`) data that
//! the client reads while logging in, selecting a mailbox and fetching.

#![allow(clippy::missing_const_for_fn)]

mod capability;
mod flags;
mod identifiers;
mod mailbox;
mod response_code;

pub use capability::{Capability, Status};
pub use flags::{Flag, Flags};
pub use identifiers::{SeqNum, Tag, Uid, UidValidity};
pub use mailbox::MailboxStatus;
pub use response_code::ResponseCode;
