//! Implementation for the authenticated state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::states::{Authenticated, Selected};
use super::{Client, Completion};
use crate::command::Command;
use crate::parser::UntaggedResponse;
use crate::types::{MailboxStatus, ResponseCode, Status};
use crate::Result;

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Examines a mailbox for read-only access.
    ///
    /// Consumes self and returns a selected client on success.
    pub async fn examine(mut self, mailbox: &str) -> Result<Client<S, Selected>> {
        let completion = self
            .execute(&Command::Examine {
                mailbox: mailbox.to_string(),
            })
            .await?;
        self.enter(mailbox, completion)
    }

    fn enter(self, mailbox: &str, completion: Completion) -> Result<Client<S, Selected>> {
        let code = completion.code.clone();
        let untagged = completion.into_ok()?;

        let mut status = parse_mailbox_status(&untagged);
        match code {
            Some(ResponseCode::ReadOnly) => status.read_only = true,
            Some(ResponseCode::ReadWrite) => status.read_only = false,
            _ => {}
        }

        tracing::debug!(
            mailbox,
            exists = status.exists,
            read_only = status.read_only,
            "Mailbox selected"
        );
        Ok(self.transition(Selected::new(mailbox, status)))
    }
}

/// Collects mailbox metadata from the untagged data of a SELECT/EXAMINE.
pub(crate) fn parse_mailbox_status(untagged: &[UntaggedResponse]) -> MailboxStatus {
    let mut status = MailboxStatus::default();

    for response in untagged {
        match response {
            UntaggedResponse::Exists(n) => status.exists = *n,
            UntaggedResponse::Recent(n) => status.recent = *n,
            UntaggedResponse::Flags(flags) => status.flags = flags.clone(),
            UntaggedResponse::Status {
                status: Status::Ok,
                code: Some(code),
                ..
            } => match code {
                ResponseCode::UidValidity(v) => status.uid_validity = Some(*v),
                ResponseCode::UidNext(uid) => status.uid_next = Some(*uid),
                ResponseCode::Unseen(seq) => status.unseen = Some(*seq),
                ResponseCode::PermanentFlags(flags) => status.permanent_flags = flags.clone(),
                _ => {}
            },
            _ => {}
        }
    }

    status
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
    use std::time::Duration;

    use tokio_test::io::Builder;

    use super::*;
    use crate::Error;
    use crate::command::TagGenerator;
    use crate::connection::framed::FramedStream;
    use crate::types::Flag;

    fn client(mock: tokio_test::io::Mock) -> Client<tokio_test::io::Mock, Authenticated> {
        Client {
            stream: FramedStream::new(mock, Duration::from_secs(5)),
            tag_gen: TagGenerator::default(),
            capabilities: Vec::new(),
            state: Authenticated,
        }
    }

    #[tokio::test]
    async fn test_examine_collects_status() {
        let mock = Builder::new()
            .write(b"A0000 EXAMINE INBOX\r\n")
            .read(b"* 172 EXISTS\r\n")
            .read(b"* 1 RECENT\r\n")
            .read(b"* OK [UNSEEN 12] Message 12 is first unseen\r\n")
            .read(b"* OK [UIDVALIDITY 3857529045] UIDs valid\r\n")
            .read(b"* OK [UIDNEXT 4392] Predicted next UID\r\n")
            .read(b"* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n")
            .read(b"* OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Limited\r\n")
            .read(b"A0000 OK [READ-WRITE] EXAMINE completed\r\n")
            .build();

        let selected = client(mock).examine("INBOX").await.unwrap();
        let state = &selected.state;
        assert_eq!(state.mailbox(), "INBOX");
        assert_eq!(state.exists(), 172);
        assert_eq!(state.recent(), 1);
        assert_eq!(state.uid_validity(), Some(3857529045));
        assert_eq!(state.uid_next(), Some(4392));
        assert_eq!(state.status().unseen.unwrap().get(), 12);
        assert_eq!(state.status().flags.len(), 5);
        assert!(state.status().permanent_flags.contains(&Flag::Wildcard));
        assert!(!state.is_read_only());
    }

    #[tokio::test]
    async fn test_examine_is_read_only() {
        let mock = Builder::new()
            .write(b"A0000 EXAMINE Archive\r\n")
            .read(b"* 0 EXISTS\r\n")
            .read(b"A0000 OK [READ-ONLY] EXAMINE completed\r\n")
            .build();

        let selected = client(mock).examine("Archive").await.unwrap();
        assert!(selected.state.is_read_only());
        assert!(selected.state.status().newest().is_none());
    }

    #[tokio::test]
    async fn test_examine_missing_mailbox() {
        let mock = Builder::new()
            .write(b"A0000 EXAMINE Nope\r\n")
            .read(b"A0000 NO [NONEXISTENT] Unknown Mailbox: Nope\r\n")
            .build();

        let err = client(mock).examine("Nope").await.unwrap_err();
        assert!(matches!(err, Error::No(t) if t == "Unknown Mailbox: Nope"));
    }
}
