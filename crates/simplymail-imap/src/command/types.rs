//! Command-related type definitions.

/// FETCH attribute requested for the newest message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchAttribute {
    /// `BODY.PEEK[]`: the whole message without setting `\Seen`.
    BodyPeek,
    /// `BODY[]`: the whole message, setting `\Seen`.
    Body,
    /// `RFC822`: legacy whole-message item.
    Rfc822,
    /// `RFC822.TEXT`: the body without headers.
    Rfc822Text,
    /// `FLAGS`.
    Flags,
    /// `UID`.
    Uid,
}

impl FetchAttribute {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::BodyPeek => "BODY.PEEK[]",
            Self::Body => "BODY[]",
            Self::Rfc822 => "RFC822",
            Self::Rfc822Text => "RFC822.TEXT",
            Self::Flags => "FLAGS",
            Self::Uid => "UID",
        }
    }
}
