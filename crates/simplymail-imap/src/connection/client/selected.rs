//! Implementation for the selected state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::Selected;
use crate::command::{Command, FetchAttribute};
use crate::parser::{FetchItem, UntaggedResponse, message_content};
use crate::types::SeqNum;
use crate::{Error, Result};

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the selected mailbox name.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        self.state.mailbox()
    }

    /// Returns the selected mailbox state.
    #[must_use]
    pub const fn selected(&self) -> &Selected {
        &self.state
    }

    /// Fetches data items of one message.
    ///
    /// Returns the items of the FETCH response for `sequence`. EXISTS and
    /// EXPUNGE updates that arrive meanwhile are applied to the mailbox
    /// status.
    pub async fn fetch(
        &mut self,
        sequence: SeqNum,
        attributes: Vec<FetchAttribute>,
    ) -> Result<Vec<FetchItem>> {
        let untagged = self
            .execute(&Command::Fetch {
                sequence,
                attributes,
            })
            .await?
            .into_ok()?;

        let mut found = None;
        for response in untagged {
            match response {
                UntaggedResponse::Fetch { seq, items } if seq == sequence => {
                    // A server may split one message's items over several responses.
                    found.get_or_insert_with(Vec::new).extend(items);
                }
                UntaggedResponse::Exists(n) => self.state.status.exists = n,
                UntaggedResponse::Expunge(_) => {
                    self.state.status.exists = self.state.status.exists.saturating_sub(1);
                }
                _ => {}
            }
        }

        found.ok_or_else(|| Error::Protocol(format!("No FETCH data for message {sequence}")))
    }

    /// Fetches the full content of one message without setting `\Seen`.
    pub async fn fetch_message(&mut self, sequence: SeqNum) -> Result<Vec<u8>> {
        let items = self.fetch(sequence, vec![FetchAttribute::BodyPeek]).await?;
        message_content(&items).ok_or_else(|| {
            Error::Protocol(format!("FETCH for message {sequence} carried no body"))
        })
    }

    /// Fetches the newest message: the one with the highest sequence number.
    ///
    /// Returns `None` without contacting the server when the mailbox is empty.
    pub async fn fetch_newest(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(newest) = self.state.status.newest() else {
            tracing::debug!(mailbox = self.mailbox(), "Mailbox is empty");
            return Ok(None);
        };
        let content = self.fetch_message(newest).await?;
        tracing::debug!(sequence = newest.get(), bytes = content.len(), "Fetched newest message");
        Ok(Some(content))
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
    use std::time::Duration;

    use tokio_test::io::Builder;

    use super::*;
    use crate::command::TagGenerator;
    use crate::connection::framed::FramedStream;
    use crate::types::MailboxStatus;

    fn selected(mock: tokio_test::io::Mock, exists: u32) -> Client<tokio_test::io::Mock, Selected> {
        let status = MailboxStatus {
            exists,
            ..Default::default()
        };
        Client {
            stream: FramedStream::new(mock, Duration::from_secs(5)),
            tag_gen: TagGenerator::default(),
            capabilities: Vec::new(),
            state: Selected::new("INBOX", status),
        }
    }

    #[tokio::test]
    async fn test_fetch_newest_reads_literal() {
        let mock = Builder::new()
            .write(b"A0000 FETCH 3 BODY.PEEK[]\r\n")
            .read(b"* 3 FETCH (BODY[] {17}\r\nSubject: a\r\n\r\nb\r\n)\r\n")
            .read(b"A0000 OK FETCH completed\r\n")
            .build();

        let mut client = selected(mock, 3);
        let body = client.fetch_newest().await.unwrap().unwrap();
        assert_eq!(body, b"Subject: a\r\n\r\nb\r\n");
    }

    #[tokio::test]
    async fn test_fetch_newest_empty_mailbox() {
        let mock = Builder::new().build();
        let mut client = selected(mock, 0);
        assert!(client.fetch_newest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_ignores_other_messages_and_tracks_exists() {
        let mock = Builder::new()
            .write(b"A0000 FETCH 2 BODY.PEEK[]\r\n")
            .read(b"* 1 FETCH (FLAGS (\\Seen))\r\n")
            .read(b"* 3 EXISTS\r\n")
            .read(b"* 2 FETCH (BODY[] \"hi\")\r\n")
            .read(b"A0000 OK done\r\n")
            .build();

        let mut client = selected(mock, 2);
        let body = client.fetch_message(SeqNum::new(2).unwrap()).await.unwrap();
        assert_eq!(body, b"hi");
        assert_eq!(client.selected().exists(), 3);
    }

    #[tokio::test]
    async fn test_fetch_nil_body_is_empty() {
        let mock = Builder::new()
            .write(b"A0000 FETCH 1 BODY.PEEK[]\r\n")
            .read(b"* 1 FETCH (BODY[] NIL)\r\n")
            .read(b"A0000 OK done\r\n")
            .build();

        let mut client = selected(mock, 1);
        assert_eq!(client.fetch_newest().await.unwrap(), Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_fetch_without_data_is_protocol_error() {
        let mock = Builder::new()
            .write(b"A0000 FETCH 1 BODY.PEEK[]\r\n")
            .read(b"A0000 OK nothing to see\r\n")
            .build();

        let mut client = selected(mock, 1);
        assert!(matches!(
            client.fetch_newest().await,
            Err(Error::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_no() {
        let mock = Builder::new()
            .write(b"A0000 FETCH 1 BODY.PEEK[]\r\n")
            .read(b"A0000 NO message expunged\r\n")
            .build();

        let mut client = selected(mock, 1);
        assert!(matches!(client.fetch_newest().await, Err(Error::No(_))));
    }
}
