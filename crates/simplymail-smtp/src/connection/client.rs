//! Type-state SMTP client.
//!
//! Each state only exposes the commands that are valid in it, so e.g.
//! `MAIL FROM` before `EHLO` does not compile:
//!
//! ```text
//! Greeted ─ehlo()→ Ehlo ─starttls()→ Ehlo ─authenticate()→ Authenticated
//!   ─mail_from()→ MailTransaction ─rcpt_to()→ RecipientAdded ─data()→ Data
//!   ─send_message()→ Completed ─quit()
//! ```

use std::collections::HashSet;
use std::marker::PhantomData;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::{ServerInfo, SmtpStream, TlsState};
use crate::command::{Command, encode_data};
use crate::error::{Error, Result};
use crate::parser::ReplyAccumulator;
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};

/// Runtime name of a session state, for logging and inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Server greeting received.
    GreetingReceived,
    /// EHLO accepted (possibly again after STARTTLS).
    Ehlo,
    /// AUTH accepted.
    Authenticated,
    /// MAIL FROM accepted.
    MailFromSent,
    /// At least one RCPT TO accepted.
    RcptToSent,
    /// DATA accepted with 354, message not yet sent.
    DataSending,
    /// Message accepted or rejected by the final reply.
    Completed,
}

/// Implemented by the type-state markers.
pub trait State {
    /// Runtime name of the state.
    const STATE: SessionState;
}

macro_rules! state_marker {
    ($(#[$doc:meta])* $name:ident => $state:ident) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name;

        impl State for $name {
            const STATE: SessionState = SessionState::$state;
        }
    };
}

state_marker!(
    /// Type-state marker for greeting received.
    Greeted => GreetingReceived
);
state_marker!(
    /// Type-state marker for EHLO accepted.
    Ehlo => Ehlo
);
state_marker!(
    /// Type-state marker for authenticated state.
    Authenticated => Authenticated
);
state_marker!(
    /// Type-state marker for mail transaction started.
    MailTransaction => MailFromSent
);
state_marker!(
    /// Type-state marker for recipient added.
    RecipientAdded => RcptToSent
);
state_marker!(
    /// Type-state marker for data mode.
    Data => DataSending
);
state_marker!(
    /// Type-state marker for a finished transaction.
    Completed => Completed
);

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<S: State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    _state: PhantomData<S>,
}

/// Connection trait for all states.
pub trait SmtpConnection {
    /// Returns the server information.
    fn server_info(&self) -> &ServerInfo;

    /// Returns the current session state.
    fn state(&self) -> SessionState;
}

impl<S: State> SmtpConnection for Client<S> {
    fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    fn state(&self) -> SessionState {
        S::STATE
    }
}

impl Client<Greeted> {
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Greeting`] if the greeting is not `220`, or an I/O
    /// or parse error if it cannot be read.
    pub async fn from_stream(mut stream: SmtpStream) -> Result<Self> {
        let greeting = read_reply(&mut stream).await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(Error::Greeting {
                code: greeting.code.as_u16(),
                message: greeting.message_text(),
            });
        }

        // Extract hostname from greeting (first word after code)
        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();

        tracing::info!(
            host = stream.host(),
            port = stream.port(),
            server = %hostname,
            "SMTP session opened"
        );

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                extensions: HashSet::new(),
            },
            _state: PhantomData,
        })
    }

    /// Sends EHLO and discovers server capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO command fails.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Client<Ehlo>> {
        self.send_ehlo(client_hostname).await?;
        Ok(self.transition())
    }
}

impl Client<Ehlo> {
    /// Returns true if the session is encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self.stream.tls_state(), TlsState::Established)
    }

    /// Upgrades the connection to TLS using STARTTLS and repeats EHLO.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StartTlsUnavailable`] if the server does not offer
    /// STARTTLS, or an error if the upgrade fails.
    pub async fn starttls(mut self, client_hostname: &str) -> Result<Self> {
        if self.is_tls() {
            return Err(Error::InvalidState("Session is already encrypted".into()));
        }
        if !self.server_info.supports_starttls() {
            return Err(Error::StartTlsUnavailable);
        }

        let reply = self.send_command(Command::StartTls).await?;
        expect_code(&reply, ReplyCode::SERVICE_READY)?;

        // Upgrade stream to TLS
        self.stream = self.stream.upgrade_to_tls().await?;

        // Capabilities learned before the upgrade must be discarded
        self.server_info.extensions.clear();
        self.send_ehlo(client_hostname).await?;

        Ok(self)
    }

    /// Authenticates with the best mechanism both sides support.
    ///
    /// PLAIN is preferred; LOGIN is used only if it is the sole advertised
    /// mechanism this client knows.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn authenticate(
        self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        let mechanisms = self.server_info.auth_mechanisms();
        if mechanisms.contains(&AuthMechanism::Login) && !mechanisms.contains(&AuthMechanism::Plain)
        {
            self.auth_login(username, password).await
        } else {
            self.auth_plain(username, password).await
        }
    }

    /// Authenticates using PLAIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn auth_plain(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        // Build PLAIN response: \0username\0password
        let credentials = format!("\0{username}\0{password}");
        let encoded = STANDARD.encode(credentials.as_bytes());

        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some(encoded),
        };

        let reply = self.send_command(cmd).await?;
        expect_success(&reply)?;

        Ok(self.transition())
    }

    /// Authenticates using LOGIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn auth_login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        };
        let reply = self.send_command(cmd).await?;
        expect_code(&reply, ReplyCode::AUTH_CONTINUE)?;

        let reply = self
            .send_command(Command::AuthResponse(STANDARD.encode(username)))
            .await?;
        expect_code(&reply, ReplyCode::AUTH_CONTINUE)?;

        let reply = self
            .send_command(Command::AuthResponse(STANDARD.encode(password)))
            .await?;
        expect_success(&reply)?;

        Ok(self.transition())
    }
}

impl Client<Authenticated> {
    /// Starts a mail transaction.
    ///
    /// Sends the SIZE parameter when the server advertises SIZE and
    /// `message_size` is given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] if the server's size limit is
    /// exceeded, or an error if the MAIL FROM command fails.
    pub async fn mail_from(
        mut self,
        from: Address,
        message_size: Option<usize>,
    ) -> Result<Client<MailTransaction>> {
        let size = match (message_size, self.server_info.size_limit()) {
            (Some(size), Some(Some(limit))) if limit > 0 && size > limit => {
                return Err(Error::MessageTooLarge { size, limit });
            }
            (Some(size), Some(_)) => Some(size),
            _ => None,
        };

        let reply = self.send_command(Command::MailFrom { from, size }).await?;
        expect_success(&reply)?;

        Ok(self.transition())
    }
}

impl Client<MailTransaction> {
    /// Adds a recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Client<RecipientAdded>> {
        let reply = self.send_command(Command::RcptTo { to }).await?;
        expect_success(&reply)?;

        Ok(self.transition())
    }
}

impl Client<RecipientAdded> {
    /// Adds another recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Self> {
        let reply = self.send_command(Command::RcptTo { to }).await?;
        expect_success(&reply)?;

        Ok(self)
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error if the DATA command is not answered with 354.
    pub async fn data(mut self) -> Result<Client<Data>> {
        let reply = self.send_command(Command::Data).await?;
        expect_code(&reply, ReplyCode::START_DATA)?;

        Ok(self.transition())
    }
}

impl Client<Data> {
    /// Sends the message content and reads the final reply.
    ///
    /// Message should be RFC 5322 formatted. Line endings will be normalized to CRLF.
    /// The terminating "." line will be added automatically.
    ///
    /// # Errors
    ///
    /// Returns an error if sending the message fails or server rejects it.
    pub async fn send_message(mut self, message: &[u8]) -> Result<(Client<Completed>, Reply)> {
        let data = encode_data(message);
        tracing::debug!(bytes = data.len(), "C: <message data>");
        self.stream.write_all(&data).await?;

        let reply = read_reply(&mut self.stream).await?;
        expect_success(&reply)?;

        tracing::info!(code = reply.code.as_u16(), "Message accepted");
        Ok((self.transition(), reply))
    }
}

// Common implementation for all states
impl<S: State> Client<S> {
    fn transition<T: State>(self) -> Client<T> {
        tracing::debug!(from = ?S::STATE, to = ?T::STATE, "SMTP state change");
        Client {
            stream: self.stream,
            server_info: self.server_info,
            _state: PhantomData,
        }
    }

    async fn send_ehlo(&mut self, client_hostname: &str) -> Result<()> {
        let cmd = Command::Ehlo {
            hostname: client_hostname.to_string(),
        };
        let reply = self.send_command(cmd).await?;
        expect_success(&reply)?;

        // Parse extensions from EHLO response (skip first line which is greeting)
        let mut extensions = HashSet::new();
        for line in reply.message.iter().skip(1) {
            extensions.insert(Extension::parse(line));
        }

        self.server_info.extensions = extensions;
        Ok(())
    }

    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        tracing::debug!(command = %cmd.redacted(), "C:");
        let data = cmd.serialize();
        self.stream.write_all(&data).await?;
        read_reply(&mut self.stream).await
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(Command::Quit).await?;
        expect_success(&reply)?;
        Ok(())
    }
}

async fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
    let mut accumulator = ReplyAccumulator::new();
    loop {
        let line = stream.read_line().await?;
        if let Some(reply) = accumulator.push_line(&line)? {
            tracing::debug!(code = reply.code.as_u16(), text = %reply.message_text(), "S:");
            return Ok(reply);
        }
    }
}

/// Accepts any 2xx reply.
fn expect_success(reply: &Reply) -> Result<()> {
    if reply.is_success() {
        Ok(())
    } else {
        Err(reply_error(reply))
    }
}

/// Accepts exactly `code`.
fn expect_code(reply: &Reply, code: ReplyCode) -> Result<()> {
    if reply.code == code {
        Ok(())
    } else {
        Err(reply_error(reply))
    }
}

fn reply_error(reply: &Reply) -> Error {
    if reply.code.is_error() {
        Error::smtp_error(reply.code.as_u16(), reply.message_text())
    } else {
        Error::UnexpectedReply {
            code: reply.code.as_u16(),
            message: reply.message_text(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn reply_error_classification() {
        let rejected = Reply::new(ReplyCode::AUTH_FAILED, vec!["5.7.8 bad".into()]);
        assert!(reply_error(&rejected).is_permanent());

        let busy = Reply::new(ReplyCode::MAILBOX_BUSY, vec!["later".into()]);
        assert!(reply_error(&busy).is_transient());

        let odd = Reply::new(ReplyCode::OK, vec!["OK".into()]);
        assert!(matches!(
            expect_code(&odd, ReplyCode::START_DATA),
            Err(Error::UnexpectedReply { code: 250, .. })
        ));
    }

    #[test]
    fn state_names() {
        assert_eq!(Greeted::STATE, SessionState::GreetingReceived);
        assert_eq!(Data::STATE, SessionState::DataSending);
        assert_eq!(Completed::STATE, SessionState::Completed);
    }
}
