//! Command tags and the non-zero numbers servers hand out.

use std::fmt;
use std::num::NonZeroU32;

/// Tag that pairs a command with its completion response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(String);

impl Tag {
    /// Wraps a tag string.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The tag text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! nonzero_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(NonZeroU32);

        impl $name {
            /// `None` for zero, which the protocol never assigns.
            #[must_use]
            pub fn new(n: u32) -> Option<Self> {
                NonZeroU32::new(n).map(Self)
            }

            /// The raw value.
            #[must_use]
            pub const fn get(self) -> u32 {
                self.0.get()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

nonzero_id! {
    /// Position of a message in the selected mailbox, counted from 1.
    /// The highest one belongs to the message added last.
    SeqNum
}

nonzero_id! {
    /// Per-mailbox message identifier that survives across sessions.
    Uid
}

nonzero_id! {
    /// Mailbox generation; UIDs are only comparable while it is unchanged.
    UidValidity
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tag_display() {
        assert_eq!(Tag::new("A0001").to_string(), "A0001");
        assert_eq!(Tag::new("A0001").as_str(), "A0001");
    }

    #[test]
    fn zero_is_rejected() {
        assert!(SeqNum::new(0).is_none());
        assert!(Uid::new(0).is_none());
        assert!(UidValidity::new(0).is_none());
        assert_eq!(Uid::new(7).unwrap().get(), 7);
    }

    #[test]
    fn seq_nums_order_and_print_as_numbers() {
        let newest = SeqNum::new(42).unwrap();
        assert!(newest > SeqNum::new(2).unwrap());
        assert_eq!(newest.to_string(), "42");
    }
}
