//! Response data types.

use crate::types::{Capability, Flags, ResponseCode, SeqNum, Status, Uid};

/// Untagged response data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedResponse {
    /// `* OK`, `* NO`, `* BAD`, `* PREAUTH` or `* BYE`.
    Status {
        /// Which of the five.
        status: Status,
        /// Bracketed response code, if any.
        code: Option<ResponseCode>,
        /// Remaining human-readable text.
        text: String,
    },
    /// `* CAPABILITY ...`.
    Capability(Vec<Capability>),
    /// `* FLAGS (...)`.
    Flags(Flags),
    /// `* n EXISTS`.
    Exists(u32),
    /// `* n RECENT`.
    Recent(u32),
    /// `* n EXPUNGE`.
    Expunge(SeqNum),
    /// `* n FETCH (...)`.
    Fetch {
        /// Sequence number of the message.
        seq: SeqNum,
        /// Data items.
        items: Vec<FetchItem>,
    },
    /// Well-formed untagged data the client has no use for (LIST, SEARCH, ID, ...).
    Other {
        /// Upper-cased keyword.
        keyword: String,
    },
}

/// Which whole-message or body item a FETCH returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePart {
    /// `BODY[]` (the reply to `BODY.PEEK[]`) or `RFC822`.
    Full,
    /// `RFC822.TEXT` or `BODY[TEXT]`.
    Text,
    /// `RFC822.HEADER` or `BODY[HEADER]`.
    Header,
    /// Any other `BODY[section]`.
    Section,
}

/// FETCH response item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// Message flags.
    Flags(Flags),
    /// Internal date.
    InternalDate(String),
    /// RFC822 size.
    Rfc822Size(u32),
    /// UID.
    Uid(Uid),
    /// Message content: `BODY[section]<origin>` or one of the `RFC822` items.
    Body {
        /// What the content covers.
        part: MessagePart,
        /// Section specifier as sent, empty for the whole message.
        section: String,
        /// Origin offset of a partial fetch.
        origin: Option<u32>,
        /// Content bytes; `None` when the server sent NIL.
        data: Option<Vec<u8>>,
    },
}

/// Picks the message content out of the items of one FETCH response.
///
/// A whole message wins over the text part. NIL content yields an empty
/// vector; `None` means the response carried no message content at all.
#[must_use]
pub fn message_content(items: &[FetchItem]) -> Option<Vec<u8>> {
    let pick = |wanted: MessagePart| {
        items.iter().find_map(|item| match item {
            FetchItem::Body { part, data, .. } if *part == wanted => {
                Some(data.clone().unwrap_or_default())
            }
            _ => None,
        })
    };
    pick(MessagePart::Full).or_else(|| pick(MessagePart::Text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(part: MessagePart, data: Option<&[u8]>) -> FetchItem {
        FetchItem::Body {
            part,
            section: String::new(),
            origin: None,
            data: data.map(<[u8]>::to_vec),
        }
    }

    #[test]
    fn full_message_preferred() {
        let items = vec![
            body(MessagePart::Text, Some(b"text only")),
            body(MessagePart::Full, Some(b"headers and text")),
        ];
        assert_eq!(message_content(&items), Some(b"headers and text".to_vec()));
    }

    #[test]
    fn nil_is_empty_and_missing_is_none() {
        assert_eq!(
            message_content(&[body(MessagePart::Full, None)]),
            Some(Vec::new())
        );
        assert_eq!(message_content(&[FetchItem::Rfc822Size(10)]), None);
        assert_eq!(message_content(&[body(MessagePart::Header, Some(b"h"))]), None);
    }
}
