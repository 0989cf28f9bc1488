//! Building outgoing messages from a caller-supplied header map.

use std::collections::BTreeMap;

use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::error::{Error, Result};
use crate::header::Headers;
use crate::message::{Body, Message, Part};

/// Headers that must be supplied by the caller.
const REQUIRED: [&str; 3] = ["From", "To", "Subject"];

/// Headers that are always generated; caller values are dropped.
const GENERATED: [&str; 3] = ["mime-version", "content-type", "content-transfer-encoding"];

/// Length of the random part of a boundary.
const BOUNDARY_LEN: usize = 28;

/// Builder for an outgoing message.
///
/// Header names are matched case-insensitively; a later header replaces an
/// earlier one of the same name. `From`, `To` and `Subject` come first, then
/// the remaining caller headers sorted by name. `Bcc` is accepted but never
/// written into the message.
///
/// ```
/// use simplymail_mime::MessageBuilder;
///
/// let message = MessageBuilder::new()
///     .header("from", "sender@example.com")
///     .header("to", "recipient@example.com")
///     .header("subject", "Test")
///     .text_body("Plain text version")
///     .html_body("<p>HTML version</p>")
///     .build()
///     .unwrap();
///
/// assert!(message.is_multipart());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    headers: BTreeMap<String, (String, String)>,
    text: Option<String>,
    html: Option<String>,
}

impl MessageBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let key = name.trim().to_ascii_lowercase();
        self.headers
            .insert(key, (Headers::canonical_name(name.trim()), value.into()));
        self
    }

    /// Sets every header of a map.
    #[must_use]
    pub fn headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        headers
            .into_iter()
            .fold(self, |builder, (name, value)| builder.header(name, value))
    }

    /// Sets the plain-text body.
    #[must_use]
    pub fn text_body(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the HTML body. The message becomes `multipart/alternative`.
    #[must_use]
    pub fn html_body(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Builds the message with the thread-local random generator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingHeader`] if `From`, `To` or `Subject` is
    /// absent, [`Error::MissingBody`] without a text body, and
    /// [`Error::InvalidHeader`] for header values that could inject lines.
    pub fn build(self) -> Result<Message> {
        self.build_with_rng(&mut rand::thread_rng())
    }

    /// Builds the message, drawing boundary and Message-ID tokens from `rng`.
    ///
    /// # Errors
    ///
    /// Same as [`MessageBuilder::build`].
    pub fn build_with_rng<R: Rng + ?Sized>(mut self, rng: &mut R) -> Result<Message> {
        let text = self.text.take().ok_or(Error::MissingBody)?;
        let plain = Part::plain(&text);
        let body = match self.html.take() {
            None => Body::Single(plain),
            Some(html) => {
                let parts = vec![plain, Part::html(&html)];
                let boundary = generate_boundary(parts.iter().map(Part::encoded_body), rng);
                Body::Alternative { boundary, parts }
            }
        };

        let mut required = Vec::with_capacity(REQUIRED.len());
        for name in REQUIRED {
            let (_, value) = self
                .headers
                .remove(&name.to_ascii_lowercase())
                .ok_or_else(|| Error::MissingHeader(name.to_string()))?;
            required.push((name, value));
        }

        let mut headers = Headers::new();
        let date = self
            .headers
            .remove("date")
            .map_or_else(|| Utc::now().to_rfc2822(), |(_, value)| value);
        headers.add("Date", date)?;

        let message_id = match self.headers.remove("message-id") {
            Some((_, value)) => value,
            None => generate_message_id(&required[0].1, rng),
        };
        headers.add("Message-ID", message_id)?;

        for (name, value) in required {
            let value = match name {
                "Subject" => Headers::encode_value(name, &value),
                _ => Headers::encode_address_list(name, &value),
            };
            headers.add(name, value)?;
        }

        for (key, (name, value)) in &self.headers {
            if key == "bcc" || GENERATED.contains(&key.as_str()) {
                continue;
            }
            let value = match key.as_str() {
                "cc" | "reply-to" => Headers::encode_address_list(name, value),
                _ => Headers::encode_value(name, value),
            };
            headers.add(name.as_str(), value)?;
        }
        headers.add("MIME-Version", "1.0")?;

        let message = Message::new(headers, body);
        tracing::debug!(
            multipart = message.is_multipart(),
            headers = message.headers().len(),
            "Built message"
        );
        Ok(message)
    }
}

/// Generates a boundary token that occurs in none of `bodies`.
///
/// The `=_` prefix alone rules out quoted-printable bodies, since `=` there
/// is always followed by a hex digit or a line break. 7bit bodies can
/// contain anything, so candidates are drawn until one is absent.
pub fn generate_boundary<'a, I, R>(bodies: I, rng: &mut R) -> String
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: Clone,
    R: Rng + ?Sized,
{
    let bodies = bodies.into_iter();
    loop {
        let token: String = (0..BOUNDARY_LEN)
            .map(|_| char::from(rng.sample(Alphanumeric)))
            .collect();
        let candidate = format!("=_{token}");
        if !bodies.clone().any(|body| body.contains(&candidate)) {
            return candidate;
        }
        tracing::debug!(%candidate, "Boundary collides with body, retrying");
    }
}

/// Generates a `Message-ID` in the sender's domain.
fn generate_message_id<R: Rng + ?Sized>(from: &str, rng: &mut R) -> String {
    let domain = from
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim_end_matches(['>', ' ', '"', ',']).trim())
        .filter(|domain| !domain.is_empty())
        .unwrap_or("localhost");
    let token: u64 = rng.r#gen();
    format!(
        "<{}.{token:016x}@{domain}>",
        Utc::now().format("%Y%m%d%H%M%S")
    )
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
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn base() -> MessageBuilder {
        MessageBuilder::new()
            .header("From", "Alice <alice@example.com>")
            .header("to", "bob@example.org")
            .header("SUBJECT", "Hello")
    }

    fn header_names(message: &Message) -> Vec<&str> {
        message.headers().iter().map(|(name, _)| name).collect()
    }

    #[test]
    fn test_plain_message_is_single_part() {
        let message = base().text_body("Hi Bob").build().unwrap();

        assert!(!message.is_multipart());
        assert_eq!(
            header_names(&message),
            vec!["Date", "Message-ID", "From", "To", "Subject", "MIME-Version"]
        );
        let text = message.to_string();
        assert!(text.contains("Subject: Hello\r\n"));
        assert!(text.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(text.ends_with("\r\n\r\nHi Bob\r\n"));
    }

    #[test]
    fn test_html_message_is_alternative() {
        let message = base()
            .text_body("plain")
            .html_body("<p>rich</p>")
            .build()
            .unwrap();

        let boundary = message.boundary().unwrap().to_string();
        let text = message.to_string();
        assert!(text.contains(&format!(
            "Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n"
        )));
        let plain_at = text.find("text/plain").unwrap();
        let html_at = text.find("text/html").unwrap();
        assert!(plain_at < html_at);
        assert!(text.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn test_missing_required_headers() {
        for missing in ["From", "To", "Subject"] {
            let builder = [
                ("From", "a@example.com"),
                ("To", "b@example.com"),
                ("Subject", "s"),
            ]
            .into_iter()
            .filter(|(name, _)| *name != missing)
            .fold(MessageBuilder::new(), |b, (n, v)| b.header(n, v));

            let err = builder.text_body("x").build().unwrap_err();
            assert!(matches!(err, Error::MissingHeader(ref h) if h == missing), "{err}");
        }
    }

    #[test]
    fn test_missing_body() {
        assert!(matches!(base().build(), Err(Error::MissingBody)));
    }

    #[test]
    fn test_caller_headers_sorted_and_filtered() {
        let message = base()
            .header("X-Mailer", "simplymail")
            .header("Bcc", "hidden@example.com")
            .header("Content-Type", "application/evil")
            .header("mime-version", "2.0")
            .header("cc", "carol@example.com")
            .header("reply-to", "alice@example.com")
            .text_body("body")
            .build()
            .unwrap();

        assert_eq!(
            header_names(&message),
            vec![
                "Date",
                "Message-ID",
                "From",
                "To",
                "Subject",
                "Cc",
                "Reply-To",
                "X-Mailer",
                "MIME-Version"
            ]
        );
        let text = message.to_string();
        assert!(!text.contains("hidden@example.com"));
        assert!(!text.contains("application/evil"));
        assert!(text.contains("MIME-Version: 1.0\r\n"));
    }

    #[test]
    fn test_later_header_replaces_earlier() {
        let message = base()
            .header("subject", "Second")
            .text_body("x")
            .build()
            .unwrap();
        assert_eq!(message.headers().get("Subject"), Some("Second"));
    }

    #[test]
    fn test_caller_date_and_message_id_kept() {
        let message = base()
            .header("Date", "Thu, 1 Jan 2026 00:00:00 +0000")
            .header("Message-Id", "<fixed@example.com>")
            .text_body("x")
            .build()
            .unwrap();
        assert_eq!(
            message.headers().get("date"),
            Some("Thu, 1 Jan 2026 00:00:00 +0000")
        );
        assert_eq!(message.headers().get("message-id"), Some("<fixed@example.com>"));
    }

    #[test]
    fn test_generated_message_id_uses_sender_domain() {
        let message = base().text_body("x").build().unwrap();
        let id = message.headers().get("Message-ID").unwrap();
        assert!(id.starts_with('<'));
        assert!(id.ends_with("@example.com>"), "{id}");
        assert!(chrono::DateTime::parse_from_rfc2822(message.headers().get("Date").unwrap()).is_ok());
    }

    #[test]
    fn test_non_ascii_subject_encoded() {
        let message = base()
            .header("Subject", "Grüße")
            .text_body("x")
            .build()
            .unwrap();
        let subject = message.headers().get("Subject").unwrap();
        assert!(subject.is_ascii());
        assert_eq!(subject, "=?utf-8?B?R3LDvMOfZQ==?=");
    }

    #[test]
    fn test_header_lines_stay_within_limits() {
        let message = base()
            .header("Subject", "word ".repeat(300))
            .header("From", "\"Müller, Jörg\" <j@example.com>")
            .header("X-Trace", "t".repeat(1500))
            .text_body("x")
            .build()
            .unwrap();

        let text = message.to_string();
        let (head, _) = text.split_once("\r\n\r\n").unwrap();
        assert!(head.is_ascii());
        for line in head.split("\r\n") {
            assert!(line.len() <= 998, "{} bytes: {line}", line.len());
        }
        let from = message.headers().get("From").unwrap();
        assert!(from.ends_with(" <j@example.com>"), "{from}");
        assert!(!from.contains(','), "{from}");
    }

    #[test]
    fn test_header_injection_rejected() {
        let err = base()
            .header("X-Note", "a\r\nBcc: x@example.com")
            .text_body("x")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));
    }

    #[test]
    fn test_boundary_skips_colliding_candidate() {
        let mut twin = StdRng::seed_from_u64(7);
        let first = generate_boundary(std::iter::empty(), &mut twin);

        let body = format!("before {first} after");
        let mut rng = StdRng::seed_from_u64(7);
        let chosen = generate_boundary([body.as_str()], &mut rng);
        assert_ne!(chosen, first);
        assert!(!body.contains(&chosen));
    }

    proptest! {
        #[test]
        fn boundary_never_in_bodies(
            text in "[ -~\n]{0,200}",
            html in "[ -~\n]{0,200}",
            seed in any::<u64>(),
        ) {
            let mut twin = StdRng::seed_from_u64(seed);
            let predicted = generate_boundary(std::iter::empty(), &mut twin);
            // Plant the first candidate in the text body to force a retry.
            let text = format!("{text}{predicted}");

            let message = base()
                .text_body(text)
                .html_body(html)
                .build_with_rng(&mut StdRng::seed_from_u64(seed))
                .unwrap();

            let Body::Alternative { boundary, parts } = message.body() else {
                panic!("expected multipart/alternative");
            };
            for part in parts {
                prop_assert!(!part.encoded_body().contains(boundary.as_str()));
            }
        }
    }
}
