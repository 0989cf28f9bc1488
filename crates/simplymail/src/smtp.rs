//! Blocking SMTP operations.
//!
//! Each call parses the server string, builds the message, then runs one
//! SMTP session on its own runtime: greeting, EHLO, STARTTLS when the port
//! calls for it, AUTH, one mail transaction and QUIT.

use std::collections::HashMap;
use std::future::Future;

use simplymail_mime::MessageBuilder;
use simplymail_smtp::connection::{State, open};
use simplymail_smtp::{Address, Authenticated, Client, Config, Mailbox, Security, SmtpResponse};

use crate::error::SmtpError;
use crate::runtime::block_on;

/// Sends a plain-text message.
///
/// `smtp_server` is `host` (implicit TLS on port 465) or `host:port` (465
/// means implicit TLS, any other port requires STARTTLS). `headers` must
/// contain `From`, `To` and `Subject`; `Cc` and `Bcc` add recipients.
///
/// # Errors
///
/// Returns an [`SmtpError`] describing why the message was not accepted.
pub fn send_plain_text_email(
    smtp_server: &str,
    username: &str,
    password: &str,
    headers: &HashMap<String, String>,
    body: &str,
) -> Result<SmtpResponse, SmtpError> {
    let config = server_config(smtp_server)?;
    send_plain_text_email_with_config(&config, username, password, headers, body)
}

/// Sends a plain-text message using `config`.
///
/// # Errors
///
/// Same as [`send_plain_text_email`].
pub fn send_plain_text_email_with_config(
    config: &Config,
    username: &str,
    password: &str,
    headers: &HashMap<String, String>,
    body: &str,
) -> Result<SmtpResponse, SmtpError> {
    send(config, username, password, headers, body, None)
}

/// Sends a `multipart/alternative` message with plain-text and HTML bodies.
///
/// # Errors
///
/// Same as [`send_plain_text_email`].
pub fn send_html_email(
    smtp_server: &str,
    username: &str,
    password: &str,
    headers: &HashMap<String, String>,
    plain_body: &str,
    html_body: &str,
) -> Result<SmtpResponse, SmtpError> {
    let config = server_config(smtp_server)?;
    send_html_email_with_config(&config, username, password, headers, plain_body, html_body)
}

/// Sends a `multipart/alternative` message using `config`.
///
/// # Errors
///
/// Same as [`send_plain_text_email`].
pub fn send_html_email_with_config(
    config: &Config,
    username: &str,
    password: &str,
    headers: &HashMap<String, String>,
    plain_body: &str,
    html_body: &str,
) -> Result<SmtpResponse, SmtpError> {
    send(config, username, password, headers, plain_body, Some(html_body))
}

/// Connects, authenticates and quits without sending anything.
///
/// # Errors
///
/// Returns an [`SmtpError`] if any step up to authentication fails.
pub fn check_smtp(smtp_server: &str, username: &str, password: &str) -> Result<bool, SmtpError> {
    let config = server_config(smtp_server)?;
    check_smtp_with_config(&config, username, password)
}

/// Connects with `config`, authenticates and quits.
///
/// # Errors
///
/// Same as [`check_smtp`].
pub fn check_smtp_with_config(
    config: &Config,
    username: &str,
    password: &str,
) -> Result<bool, SmtpError> {
    run(config, async {
        let client = authenticate(config, username, password).await?;
        tracing::info!(host = %config.host, "SMTP login check succeeded");
        quit(client).await;
        Ok(true)
    })
}

fn server_config(smtp_server: &str) -> Result<Config, SmtpError> {
    Config::from_server(smtp_server).map_err(SmtpError::from)
}

fn send(
    config: &Config,
    username: &str,
    password: &str,
    headers: &HashMap<String, String>,
    text: &str,
    html: Option<&str>,
) -> Result<SmtpResponse, SmtpError> {
    let headers = normalize(headers)?;

    let mut builder = MessageBuilder::new()
        .headers(headers.iter().map(|(_, (name, value))| (*name, *value)))
        .text_body(text);
    if let Some(html) = html {
        builder = builder.html_body(html);
    }
    let message = builder.build()?.to_bytes();
    let envelope = Envelope::from_headers(&headers)?;

    run(config, deliver(config, username, password, &envelope, &message))
}

/// Lower-cased header names mapped to the caller's name and value.
type HeaderMap<'a> = HashMap<String, (&'a str, &'a str)>;

/// Indexes headers by lower-cased name, rejecting names given twice.
fn normalize(headers: &HashMap<String, String>) -> Result<HeaderMap<'_>, SmtpError> {
    let mut normalized = HashMap::with_capacity(headers.len());
    for (name, value) in headers {
        let key = name.trim().to_ascii_lowercase();
        if normalized
            .insert(key, (name.as_str(), value.as_str()))
            .is_some()
        {
            return Err(SmtpError::internal(format!(
                "Header {name:?} given more than once"
            )));
        }
    }
    Ok(normalized)
}

/// SMTP envelope derived from the message headers.
#[derive(Debug)]
struct Envelope {
    from: Address,
    recipients: Vec<Address>,
}

impl Envelope {
    fn from_headers(headers: &HeaderMap<'_>) -> Result<Self, SmtpError> {
        let field = |name: &str| headers.get(name).map(|(_, value)| *value);

        let from = field("from")
            .map(Mailbox::parse_list)
            .transpose()?
            .and_then(|mailboxes| mailboxes.into_iter().next())
            .ok_or_else(|| SmtpError::internal("Missing required header: From"))?;

        let mut recipients: Vec<Address> = Vec::new();
        for name in ["to", "cc", "bcc"] {
            let Some(value) = field(name) else { continue };
            for mailbox in Mailbox::parse_list(value)? {
                if !recipients.contains(&mailbox.address) {
                    recipients.push(mailbox.address);
                }
            }
        }
        if recipients.is_empty() {
            return Err(SmtpError::internal("No recipients"));
        }

        Ok(Self {
            from: from.address,
            recipients,
        })
    }
}

/// Runs one session under the operation timeout.
fn run<T>(
    config: &Config,
    session: impl Future<Output = simplymail_smtp::Result<T>>,
) -> Result<T, SmtpError> {
    let limit = config.operation_timeout;
    let outcome = block_on(async { tokio::time::timeout(limit, session).await })
        .map_err(|e| SmtpError::internal(format!("Could not start runtime: {e}")))?;

    match outcome {
        Ok(result) => result.map_err(|e| {
            tracing::debug!(error = %e, "SMTP operation failed");
            SmtpError::from(e)
        }),
        Err(_) => {
            tracing::debug!(?limit, "SMTP operation timed out");
            Err(SmtpError::Timeout {
                message: format!("Operation did not finish within {limit:?}"),
            })
        }
    }
}

async fn authenticate(
    config: &Config,
    username: &str,
    password: &str,
) -> simplymail_smtp::Result<Client<Authenticated>> {
    let client = Client::from_stream(open(config).await?).await?;
    let mut client = client.ehlo(&config.client_hostname).await?;
    if config.security == Security::StartTls {
        client = client.starttls(&config.client_hostname).await?;
    }
    client.authenticate(username, password).await
}

async fn deliver(
    config: &Config,
    username: &str,
    password: &str,
    envelope: &Envelope,
    message: &[u8],
) -> simplymail_smtp::Result<SmtpResponse> {
    let client = authenticate(config, username, password).await?;
    let client = client
        .mail_from(envelope.from.clone(), Some(message.len()))
        .await?;

    let (first, rest) = envelope
        .recipients
        .split_first()
        .ok_or_else(|| simplymail_smtp::Error::InvalidAddress("No recipients".into()))?;
    let mut client = client.rcpt_to(first.clone()).await?;
    for recipient in rest {
        client = client.rcpt_to(recipient.clone()).await?;
    }

    let (client, reply) = client.data().await?.send_message(message).await?;
    let response = SmtpResponse::from(&reply);
    tracing::info!(
        host = %config.host,
        code = response.code(),
        recipients = envelope.recipients.len(),
        "Message submitted"
    );

    quit(client).await;
    Ok(response)
}

/// Ends the session after success; a failed QUIT is only logged.
async fn quit<S: State>(client: Client<S>) {
    if let Err(e) = client.quit().await {
        tracing::warn!(error = %e, "QUIT failed");
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
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_envelope_collects_all_recipients() {
        let headers = map(&[
            ("FROM", "\"Smith, Alice\" <alice@example.com>"),
            ("to", "bob@example.org, Carol <carol@example.org>"),
            ("Cc", "bob@example.org"),
            ("bcc", "dave@example.org"),
        ]);
        let envelope = Envelope::from_headers(&normalize(&headers).unwrap()).unwrap();

        assert_eq!(envelope.from.as_str(), "alice@example.com");
        let recipients: Vec<&str> = envelope.recipients.iter().map(Address::as_str).collect();
        assert_eq!(
            recipients,
            vec!["bob@example.org", "carol@example.org", "dave@example.org"]
        );
    }

    #[test]
    fn test_envelope_rejects_bad_address() {
        let headers = map(&[("From", "alice@example.com"), ("To", "not an address")]);
        let err = Envelope::from_headers(&normalize(&headers).unwrap()).unwrap_err();
        assert!(matches!(err, SmtpError::InternalClientException { .. }));
    }

    #[test]
    fn test_duplicate_header_names_rejected() {
        let headers = map(&[("To", "a@example.com"), ("to", "b@example.com")]);
        assert!(matches!(
            normalize(&headers),
            Err(SmtpError::InternalClientException { .. })
        ));
    }

    #[test]
    fn test_bad_server_string() {
        let err = server_config("smtp.example.com:smtp").unwrap_err();
        assert!(matches!(err, SmtpError::InternalClientException { .. }));
        assert!(server_config("").is_err());
    }

    #[test]
    fn test_server_string_ports() {
        let config = server_config("smtp.example.com").unwrap();
        assert_eq!((config.port, config.security), (465, Security::Implicit));

        let config = server_config("smtp.example.com:587").unwrap();
        assert_eq!((config.port, config.security), (587, Security::StartTls));
    }
}
