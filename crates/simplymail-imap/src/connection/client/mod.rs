//! Type-state IMAP client connection.
//!
//! Uses the type-state pattern to enforce valid state transitions at compile time.
//! The IMAP connection states are:
//!
//! - `NotAuthenticated`: Initial state after connection
//! - `Authenticated`: After successful LOGIN or a PREAUTH greeting
//! - `Selected`: After successful SELECT/EXAMINE
//!
//! Each state only exposes methods that are valid for that state.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use tokio::io::{AsyncRead, AsyncWrite};

pub use self::not_authenticated::Greeting;
pub use self::states::{Authenticated, NotAuthenticated, Selected};
use super::framed::{FramedStream, ResponseAccumulator};
use crate::command::{Command, TagGenerator};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, ResponseCode, Status};
use crate::{Error, Result};

/// IMAP client connection with type-state.
///
/// The type parameter `State` tracks the connection state at compile time.
/// `Selected` additionally carries the selected mailbox and its status.
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) tag_gen: TagGenerator,
    pub(crate) capabilities: Vec<Capability>,
    pub(crate) state: State,
}

// Manual Debug implementation since FramedStream doesn't implement Debug
impl<S, State: std::fmt::Debug> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tag_gen", &self.tag_gen)
            .field("capabilities", &self.capabilities)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// The outcome of one command: its untagged data and tagged completion.
#[derive(Debug)]
pub(crate) struct Completion {
    pub untagged: Vec<UntaggedResponse>,
    pub status: Status,
    pub code: Option<ResponseCode>,
    pub text: String,
}

impl Completion {
    /// Returns the untagged data if the command completed with OK.
    ///
    /// NO and BAD become [`Error::No`] and [`Error::Bad`].
    pub fn into_ok(self) -> Result<Vec<UntaggedResponse>> {
        match self.status {
            Status::Ok | Status::PreAuth => Ok(self.untagged),
            Status::No => Err(Error::No(self.text)),
            Status::Bad => Err(Error::Bad(self.text)),
            Status::Bye => Err(Error::Bye(self.text)),
        }
    }
}

/// Shared implementation for all states.
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the server capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Checks if the server has a specific capability.
    #[must_use]
    pub fn has_capability(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// Returns true if LOGIN is disabled (e.g., before STARTTLS).
    #[must_use]
    pub fn login_disabled(&self) -> bool {
        self.has_capability(&Capability::LoginDisabled)
    }

    /// Sends a CAPABILITY command and updates the stored capabilities.
    pub(crate) async fn capability(&mut self) -> Result<Vec<Capability>> {
        let untagged = self.execute(&Command::Capability).await?.into_ok()?;
        self.absorb_capabilities(&untagged);
        Ok(self.capabilities.clone())
    }

    /// Gracefully ends the session with LOGOUT.
    ///
    /// The server answers with BYE before the tagged OK; that BYE is
    /// expected here and not an error.
    pub async fn logout(mut self) -> Result<()> {
        match self.execute(&Command::Logout).await {
            Ok(completion) => {
                completion.into_ok()?;
            }
            // Some servers close right after BYE without the tagged OK.
            Err(Error::Bye(_) | Error::ConnectionClosed) => {}
            Err(e) => return Err(e),
        }
        tracing::debug!("Logged out");
        Ok(())
    }

    /// Sends a command and reads every response up to its tagged completion.
    ///
    /// Fragments after the first are only sent once the server has asked for
    /// them with a `+` continuation. If the server instead completes the
    /// command (typically rejecting it), the remaining fragments are dropped.
    pub(crate) async fn execute(&mut self, command: &Command) -> Result<Completion> {
        let tag = self.tag_gen.next_tag();
        tracing::debug!(command = %command.redacted(&tag), "Sending command");

        let mut accumulator = ResponseAccumulator::new(tag.clone());
        let mut fragments = command.serialize(&tag).into_iter();
        if let Some(first) = fragments.next() {
            self.stream.write_command(&first).await?;
        }

        for fragment in fragments {
            loop {
                let response = self.stream.read_response().await?;
                if response.starts_with(b"+") {
                    break;
                }
                let done = accumulator.is_completion(&response);
                accumulator.push(response);
                if done {
                    return Self::complete(&tag, accumulator.into_responses());
                }
            }
            self.stream.write_command(&fragment).await?;
        }

        match accumulator.read_until_tagged(&mut self.stream).await {
            Ok(responses) => Self::complete(&tag, responses),
            Err(Error::ConnectionClosed) => Err(Self::closed_error(accumulator.responses())),
            Err(e) => Err(e),
        }
    }

    /// Parses a command's responses into a [`Completion`].
    ///
    /// Every response must parse; the last one is the tagged completion.
    fn complete(tag: &str, responses: Vec<Vec<u8>>) -> Result<Completion> {
        let mut untagged = Vec::with_capacity(responses.len());

        for bytes in responses {
            match ResponseParser::parse(&bytes)? {
                Response::Untagged(response) => {
                    if let UntaggedResponse::Status {
                        status: Status::Bye,
                        text,
                        ..
                    } = &response
                    {
                        tracing::warn!(%text, "Server sent BYE");
                    }
                    untagged.push(response);
                }
                Response::Tagged {
                    tag: resp_tag,
                    status,
                    code,
                    text,
                } if resp_tag.as_str() == tag => {
                    tracing::debug!(tag, ?status, %text, "Command completed");
                    return Ok(Completion {
                        untagged,
                        status,
                        code,
                        text,
                    });
                }
                Response::Tagged { tag: other, .. } => {
                    tracing::debug!(tag = %other, "Ignoring completion for another tag");
                }
                Response::Continuation { .. } => {
                    return Err(Error::Protocol("Unexpected continuation request".into()));
                }
            }
        }

        Err(Error::Protocol(format!("Missing tagged response for {tag}")))
    }

    /// Maps EOF to BYE when the server announced its departure first.
    fn closed_error(responses: &[Vec<u8>]) -> Error {
        responses
            .iter()
            .rev()
            .find_map(|bytes| match ResponseParser::parse(bytes) {
                Ok(Response::Untagged(UntaggedResponse::Status {
                    status: Status::Bye,
                    text,
                    ..
                })) => Some(Error::Bye(text)),
                _ => None,
            })
            .unwrap_or(Error::ConnectionClosed)
    }

    /// Stores capabilities reported as untagged data or a response code.
    pub(crate) fn absorb_capabilities(&mut self, untagged: &[UntaggedResponse]) {
        for response in untagged {
            match response {
                UntaggedResponse::Capability(caps)
                | UntaggedResponse::Status {
                    status: Status::Ok,
                    code: Some(ResponseCode::Capability(caps)),
                    ..
                } => self.capabilities.clone_from(caps),
                _ => {}
            }
        }
    }

    /// Moves the connection into another state.
    pub(crate) fn transition<T>(self, state: T) -> Client<S, T> {
        Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            capabilities: self.capabilities,
            state,
        }
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

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn client(mock: tokio_test::io::Mock) -> Client<tokio_test::io::Mock, Authenticated> {
        Client {
            stream: FramedStream::new(mock, TIMEOUT),
            tag_gen: TagGenerator::default(),
            capabilities: Vec::new(),
            state: Authenticated,
        }
    }

    #[tokio::test]
    async fn test_capability_updates_state() {
        let mock = Builder::new()
            .write(b"A0000 CAPABILITY\r\n")
            .read(b"* CAPABILITY IMAP4rev1 LOGINDISABLED\r\n")
            .read(b"A0000 OK done\r\n")
            .build();
        let mut client = client(mock);

        let caps = client.capability().await.unwrap();
        assert_eq!(caps.len(), 2);
        assert!(client.login_disabled());
    }

    #[tokio::test]
    async fn test_tagged_no_and_bad() {
        let mock = Builder::new()
            .write(b"A0000 CAPABILITY\r\n")
            .read(b"A0000 NO not now\r\n")
            .write(b"A0001 CAPABILITY\r\n")
            .read(b"A0001 BAD what\r\n")
            .build();
        let mut client = client(mock);

        assert!(matches!(client.capability().await, Err(Error::No(t)) if t == "not now"));
        assert!(matches!(client.capability().await, Err(Error::Bad(t)) if t == "what"));
    }

    #[tokio::test]
    async fn test_unparseable_response_is_parse_error() {
        let mock = Builder::new()
            .write(b"A0000 CAPABILITY\r\n")
            .read(b"* 0 EXPUNGE\r\n")
            .read(b"A0000 OK\r\n")
            .build();
        let mut client = client(mock);

        assert!(matches!(client.capability().await, Err(Error::Parse { .. })));
    }

    #[tokio::test]
    async fn test_bye_then_eof() {
        let mock = Builder::new()
            .write(b"A0000 CAPABILITY\r\n")
            .read(b"* BYE Autologout; idle for too long\r\n")
            .build();
        let mut client = client(mock);

        let err = client.capability().await.unwrap_err();
        assert!(matches!(&err, Error::Bye(t) if t.starts_with("Autologout")));
        assert!(err.is_connection_lost());
    }

    #[tokio::test]
    async fn test_logout_tolerates_missing_completion() {
        let mock = Builder::new()
            .write(b"A0000 LOGOUT\r\n")
            .read(b"* BYE IMAP4rev1 Server logging out\r\n")
            .build();
        client(mock).logout().await.unwrap();
    }
}
