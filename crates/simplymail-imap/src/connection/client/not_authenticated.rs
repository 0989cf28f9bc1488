//! Implementation for the not-authenticated state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::{Authenticated, NotAuthenticated};
use crate::command::{Command, TagGenerator};
use crate::connection::framed::FramedStream;
use crate::connection::stream::ImapStream;
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, ResponseCode, Status};
use crate::{Error, Result};

/// The state a connection starts in, as announced by the server greeting.
pub enum Greeting<S> {
    /// `* OK`: LOGIN is required.
    NotAuthenticated(Client<S, NotAuthenticated>),
    /// `* PREAUTH`: the connection is already authenticated.
    PreAuthenticated(Client<S, Authenticated>),
}

impl<S> std::fmt::Debug for Greeting<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAuthenticated(client) => {
                f.debug_tuple("NotAuthenticated").field(client).finish()
            }
            Self::PreAuthenticated(client) => {
                f.debug_tuple("PreAuthenticated").field(client).finish()
            }
        }
    }
}

impl<S> Greeting<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Logs in unless the server pre-authenticated the connection.
    pub async fn login(self, username: &str, password: &str) -> Result<Client<S, Authenticated>> {
        match self {
            Self::NotAuthenticated(client) => client.login(username, password).await,
            Self::PreAuthenticated(client) => {
                tracing::debug!("Connection pre-authenticated, skipping LOGIN");
                Ok(client)
            }
        }
    }
}

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new client from a connected stream.
    ///
    /// Reads the server greeting and any capabilities it carries. A BYE
    /// greeting is [`Error::Bye`].
    pub async fn from_stream(
        stream: S,
        io_timeout: std::time::Duration,
    ) -> Result<Greeting<S>> {
        let mut framed = FramedStream::new(stream, io_timeout);

        let greeting = framed.read_response().await?;
        let Response::Untagged(untagged) = ResponseParser::parse(&greeting)? else {
            return Err(Error::Protocol("Greeting is not an untagged response".into()));
        };

        let (pre_authenticated, code, text) = match untagged {
            UntaggedResponse::Status {
                status: Status::Ok,
                code,
                text,
            } => (false, code, text),
            UntaggedResponse::Status {
                status: Status::PreAuth,
                code,
                text,
            } => (true, code, text),
            UntaggedResponse::Status {
                status: Status::Bye,
                text,
                ..
            } => {
                tracing::warn!(%text, "Server refused connection");
                return Err(Error::Bye(text));
            }
            other => {
                return Err(Error::Protocol(format!("Unexpected greeting: {other:?}")));
            }
        };

        tracing::info!(%text, pre_authenticated, "Connected to IMAP server");

        let capabilities = match code {
            Some(ResponseCode::Capability(caps)) => caps,
            _ => Vec::new(),
        };

        let client = Self {
            stream: framed,
            tag_gen: TagGenerator::default(),
            capabilities,
            state: NotAuthenticated,
        };

        Ok(if pre_authenticated {
            Greeting::PreAuthenticated(client.transition(Authenticated))
        } else {
            Greeting::NotAuthenticated(client)
        })
    }

    /// Authenticates with the server using LOGIN.
    ///
    /// Consumes self and returns an authenticated client on success. A NO
    /// or BAD completion is [`Error::Auth`].
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        if self.login_disabled() {
            return Err(Error::Auth("LOGIN is disabled on this connection".into()));
        }

        let completion = self
            .execute(&Command::Login {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;

        match completion.status {
            Status::Ok => {}
            Status::No | Status::Bad => {
                tracing::debug!(code = ?completion.code, "LOGIN rejected");
                return Err(Error::Auth(completion.text));
            }
            Status::PreAuth | Status::Bye => return Err(Error::Bye(completion.text)),
        }

        // Servers commonly report post-login capabilities in the completion.
        if let Some(ResponseCode::Capability(caps)) = &completion.code {
            self.capabilities.clone_from(caps);
        }
        self.absorb_capabilities(&completion.untagged);

        tracing::debug!(username, "Authenticated");
        Ok(self.transition(Authenticated))
    }
}

impl Client<ImapStream, NotAuthenticated> {
    /// Upgrades the connection with STARTTLS.
    ///
    /// Capabilities are discarded and re-requested over the encrypted
    /// connection, since anything learned before the upgrade is untrusted.
    pub async fn starttls(mut self, host: &str) -> Result<Self> {
        if self.capabilities.is_empty() {
            self.capability().await?;
        }
        if !self.has_capability(&Capability::StartTls) {
            return Err(Error::TlsHandshake(
                "Server does not offer STARTTLS".to_string(),
            ));
        }

        self.execute(&Command::StartTls).await?.into_ok()?;

        let io_timeout = self.stream.io_timeout();
        let tls = self
            .stream
            .into_inner()
            .upgrade_to_tls(host, io_timeout)
            .await?;
        tracing::debug!(host, "Connection upgraded to TLS");

        let mut client = Self {
            stream: FramedStream::new(tls, io_timeout),
            tag_gen: self.tag_gen,
            capabilities: Vec::new(),
            state: NotAuthenticated,
        };
        client.capability().await?;
        Ok(client)
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

    #[tokio::test]
    async fn test_greeting_with_capabilities() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 STARTTLS LOGINDISABLED] ready\r\n")
            .build();

        let Greeting::NotAuthenticated(client) =
            Client::from_stream(mock, TIMEOUT).await.unwrap()
        else {
            panic!("Expected not-authenticated greeting");
        };
        assert!(client.has_capability(&Capability::StartTls));
        assert!(client.login_disabled());
    }

    #[tokio::test]
    async fn test_preauth_greeting_skips_login() {
        let mock = Builder::new().read(b"* PREAUTH welcome back\r\n").build();

        let greeting = Client::from_stream(mock, TIMEOUT).await.unwrap();
        assert!(matches!(greeting, Greeting::PreAuthenticated(_)));
        greeting.login("user", "pass").await.unwrap();
    }

    #[tokio::test]
    async fn test_bye_greeting() {
        let mock = Builder::new().read(b"* BYE too many connections\r\n").build();

        let err = Client::from_stream(mock, TIMEOUT).await.unwrap_err();
        assert!(matches!(err, Error::Bye(t) if t == "too many connections"));
    }

    #[tokio::test]
    async fn test_garbage_greeting_is_parse_error() {
        let mock = Builder::new().read(b"220 smtp.example.com ESMTP\r\n").build();

        let err = Client::from_stream(mock, TIMEOUT).await.unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[tokio::test]
    async fn test_login_success_updates_capabilities() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN user secret\r\n")
            .read(b"A0000 OK [CAPABILITY IMAP4rev1 IDLE] Logged in\r\n")
            .build();

        let Greeting::NotAuthenticated(client) =
            Client::from_stream(mock, TIMEOUT).await.unwrap()
        else {
            panic!("Expected not-authenticated greeting");
        };
        let client = client.login("user", "secret").await.unwrap();
        assert!(client.has_capability(&Capability::Imap4Rev1));
    }

    #[tokio::test]
    async fn test_login_rejected_is_auth_error() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN user wrong\r\n")
            .read(b"A0000 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n")
            .build();

        let greeting = Client::from_stream(mock, TIMEOUT).await.unwrap();
        let err = greeting.login("user", "wrong").await.unwrap_err();
        assert!(matches!(err, Error::Auth(t) if t == "Invalid credentials"));
    }

    #[tokio::test]
    async fn test_login_literal_waits_for_continuation() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN user {7}\r\n")
            .read(b"+ go ahead\r\n")
            .write("grüße\r\n".as_bytes())
            .read(b"A0000 OK done\r\n")
            .build();

        let greeting = Client::from_stream(mock, TIMEOUT).await.unwrap();
        greeting.login("user", "grüße").await.unwrap();
    }

    #[tokio::test]
    async fn test_literal_rejected_before_continuation() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN user {7}\r\n")
            .read(b"A0000 BAD literals not allowed\r\n")
            .build();

        let greeting = Client::from_stream(mock, TIMEOUT).await.unwrap();
        let err = greeting.login("user", "grüße").await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }
}
