//! One-shot IMAP sessions.
//!
//! Each function opens its own connection from a [`Config`], drives the
//! type-state [`Client`] through one command sequence and closes the
//! connection again. Nothing is kept between calls.
//!
//! ## Example
//!
//! ```ignore
//! use simplymail_imap::connection::{Config, fetch_newest};
//!
//! let config = Config::new("imap.example.com");
//! if let Some(message) = fetch_newest(&config, "user@example.com", "password", "INBOX").await? {
//!     println!("{}", String::from_utf8_lossy(&message));
//! }
//! ```

use super::client::{Authenticated, Client, Greeting};
use super::{Config, ImapStream, Security, connect};
use crate::{Error, Result};

/// Connects, upgrades with STARTTLS when configured, and logs in.
pub async fn open(
    config: &Config,
    username: &str,
    password: &str,
) -> Result<Client<ImapStream, Authenticated>> {
    let stream = connect(config).await?;
    let greeting = Client::from_stream(stream, config.io_timeout).await?;

    let greeting = match (config.security, greeting) {
        (Security::StartTls, Greeting::NotAuthenticated(client)) => {
            Greeting::NotAuthenticated(client.starttls(&config.host).await?)
        }
        (Security::StartTls, Greeting::PreAuthenticated(_)) => {
            return Err(Error::TlsHandshake(
                "Server pre-authenticated the connection before STARTTLS".to_string(),
            ));
        }
        (_, greeting) => greeting,
    };

    greeting.login(username, password).await
}

/// Fetches the newest message of `mailbox`.
///
/// The mailbox is opened read-only and the message is fetched with
/// `BODY.PEEK[]`, so its `\Seen` flag is left alone. Returns `None` when the
/// mailbox is empty.
pub async fn fetch_newest(
    config: &Config,
    username: &str,
    password: &str,
    mailbox: &str,
) -> Result<Option<Vec<u8>>> {
    let client = open(config, username, password).await?;
    let mut selected = client.examine(mailbox).await?;
    let message = selected.fetch_newest().await?;

    tracing::info!(
        host = %config.host,
        mailbox,
        messages = selected.selected().exists(),
        found = message.is_some(),
        "Fetch completed"
    );
    close(selected).await;
    Ok(message)
}

/// Verifies that the server accepts the credentials.
pub async fn check_login(config: &Config, username: &str, password: &str) -> Result<()> {
    let client = open(config, username, password).await?;
    tracing::info!(host = %config.host, "Login check succeeded");
    close(client).await;
    Ok(())
}

/// Logs out after a successful operation; failures only get logged.
async fn close<State>(client: Client<ImapStream, State>) {
    if let Err(e) = client.logout().await {
        tracing::warn!(error = %e, "LOGOUT failed");
    }
}
