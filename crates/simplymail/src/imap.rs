//! Blocking IMAP operations.

use std::future::Future;

use simplymail_imap::Config;
use simplymail_imap::connection::{check_login, fetch_newest};

use crate::error::ImapError;
use crate::runtime::block_on;

/// Mailbox read by [`fetch_inbox_top`].
const INBOX: &str = "INBOX";

/// Fetches the newest message in `INBOX` over implicit TLS.
///
/// "Newest" is the message with the highest sequence number. The mailbox is
/// opened read-only and the message is not marked as seen. Returns `None`
/// when the inbox is empty.
///
/// # Errors
///
/// Returns an [`ImapError`] describing why the fetch failed.
pub fn fetch_inbox_top(
    domain: &str,
    port: u16,
    username: &str,
    password: &str,
) -> Result<Option<String>, ImapError> {
    let config = Config::builder(domain).port(port).build();
    fetch_inbox_top_with_config(&config, username, password)
}

/// Fetches the newest message in `INBOX` using `config`.
///
/// # Errors
///
/// Returns an [`ImapError`] describing why the fetch failed.
pub fn fetch_inbox_top_with_config(
    config: &Config,
    username: &str,
    password: &str,
) -> Result<Option<String>, ImapError> {
    let message = run(fetch_newest(config, username, password, INBOX))?;
    Ok(message.map(into_text))
}

/// Connects, logs in and logs out again.
///
/// # Errors
///
/// Returns an [`ImapError`] if any step fails; rejected credentials are
/// [`ImapError::ValidateException`].
pub fn check_imap(domain: &str, port: u16, username: &str, password: &str) -> Result<(), ImapError> {
    let config = Config::builder(domain).port(port).build();
    check_imap_with_config(&config, username, password)
}

/// Connects with `config`, logs in and logs out again.
///
/// # Errors
///
/// Same as [`check_imap`].
pub fn check_imap_with_config(
    config: &Config,
    username: &str,
    password: &str,
) -> Result<(), ImapError> {
    run(check_login(config, username, password))
}

fn run<T>(
    future: impl Future<Output = simplymail_imap::Result<T>>,
) -> Result<T, ImapError> {
    block_on(future)
        .map_err(|e| ImapError::IoException {
            message: format!("Could not start runtime: {e}"),
        })?
        .map_err(|e| {
            tracing::debug!(error = %e, "IMAP operation failed");
            ImapError::from(e)
        })
}

/// Converts message bytes to text, replacing invalid UTF-8.
fn into_text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| {
        tracing::warn!(
            valid_up_to = e.utf8_error().valid_up_to(),
            "Message is not valid UTF-8, replacing invalid bytes"
        );
        String::from_utf8_lossy(e.as_bytes()).into_owned()
    })
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
    use super::*;

    #[test]
    fn test_into_text_valid() {
        assert_eq!(into_text("Grüße".as_bytes().to_vec()), "Grüße");
    }

    #[test]
    fn test_into_text_lossy() {
        assert_eq!(into_text(b"caf\xe9 ok".to_vec()), "caf\u{fffd} ok");
    }
}
