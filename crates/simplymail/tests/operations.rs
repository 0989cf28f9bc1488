//! End-to-end tests of the blocking entry points against scripted servers
//! on loopback sockets.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use simplymail::{
    ImapConfig, ImapError, ImapSecurity, SmtpConfig, SmtpError, SmtpSecurity, check_imap_with_config,
    check_smtp_with_config, fetch_inbox_top_with_config, send_html_email_with_config,
    send_plain_text_email, send_plain_text_email_with_config,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// One scripted exchange: the expected command prefix and the canned reply.
///
/// The prefix `"."` swallows SMTP message data up to the terminating dot.
type Step = (&'static str, &'static [u8]);

fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simplymail=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// Spawns a server that greets, answers each step of `script`, then holds
/// the connection until the client hangs up. Returns the lines it read.
///
/// A reply without a trailing newline is sent and the socket dropped at once.
fn scripted_server(greeting: &'static str, script: Vec<Step>) -> (u16, JoinHandle<Vec<String>>) {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (socket, _) = listener.accept().unwrap();
        let mut writer = socket.try_clone().unwrap();
        let mut reader = BufReader::new(socket);
        let mut seen = Vec::new();

        let mut next_line = |seen: &mut Vec<String>| {
            let mut raw = Vec::new();
            if reader.read_until(b'\n', &mut raw).unwrap_or(0) == 0 {
                return None;
            }
            let line = String::from_utf8_lossy(&raw)
                .trim_end_matches(['\r', '\n'])
                .to_string();
            seen.push(line.clone());
            Some(line)
        };

        writer.write_all(greeting.as_bytes()).unwrap();
        for (prefix, reply) in script {
            loop {
                let Some(line) = next_line(&mut seen) else {
                    return seen;
                };
                if prefix != "." {
                    assert!(line.starts_with(prefix), "expected {prefix:?}, got {line:?}");
                    break;
                }
                if line == "." {
                    break;
                }
            }
            writer.write_all(reply).unwrap();
            if !reply.ends_with(b"\n") {
                return seen;
            }
        }

        while next_line(&mut seen).is_some() {}
        seen
    });

    (port, handle)
}

fn imap_config(port: u16) -> ImapConfig {
    ImapConfig::builder("127.0.0.1")
        .port(port)
        .security(ImapSecurity::None)
        .io_timeout(Duration::from_secs(5))
        .build()
}

fn smtp_config(port: u16) -> SmtpConfig {
    SmtpConfig::builder("127.0.0.1")
        .port(port)
        .security(SmtpSecurity::None)
        .io_timeout(Duration::from_secs(5))
        .build()
}

fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn standard_headers() -> HashMap<String, String> {
    headers(&[
        ("From", "Alice <alice@example.com>"),
        ("To", "bob@example.org"),
        ("cc", "carol@example.org"),
        ("BCC", "dave@example.org"),
        ("Subject", "Hello"),
        ("X-Mailer", "simplymail-tests"),
    ])
}

/// Port with nothing listening on it.
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

// ----- IMAP -----

#[test]
fn imap_fetches_newest_message_lossily() {
    let (port, server) = scripted_server(
        "* OK [CAPABILITY IMAP4rev1] ready\r\n",
        vec![
            ("A0000 LOGIN user pass", b"A0000 OK LOGIN completed\r\n"),
            (
                "A0001 EXAMINE INBOX",
                b"* 2 EXISTS\r\n* 0 RECENT\r\nA0001 OK [READ-ONLY] done\r\n",
            ),
            (
                "A0002 FETCH 2 BODY.PEEK[]",
                b"* 2 FETCH (BODY[] {21}\r\nSubject: caf\xe9\r\n\r\nhi\r\n)\r\nA0002 OK done\r\n",
            ),
            ("A0003 LOGOUT", b"* BYE logging out\r\nA0003 OK done\r\n"),
        ],
    );

    let message = fetch_inbox_top_with_config(&imap_config(port), "user", "pass").unwrap();
    assert_eq!(message.as_deref(), Some("Subject: caf\u{fffd}\r\n\r\nhi\r\n"));

    let seen = server.join().unwrap();
    assert_eq!(seen.len(), 4);
}

#[test]
fn imap_empty_inbox_is_none() {
    let (port, server) = scripted_server(
        "* OK ready\r\n",
        vec![
            ("A0000 LOGIN", b"A0000 OK done\r\n"),
            ("A0001 EXAMINE INBOX", b"* 0 EXISTS\r\nA0001 OK done\r\n"),
            ("A0002 LOGOUT", b"* BYE bye\r\nA0002 OK done\r\n"),
        ],
    );

    let message = fetch_inbox_top_with_config(&imap_config(port), "user", "pass").unwrap();
    assert!(message.is_none());
    assert!(!server.join().unwrap().iter().any(|l| l.contains("FETCH")));
}

#[test]
fn imap_wrong_password_is_validate_exception() {
    let (port, _server) = scripted_server(
        "* OK ready\r\n",
        vec![(
            "A0000 LOGIN",
            b"A0000 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n",
        )],
    );

    let err = fetch_inbox_top_with_config(&imap_config(port), "user", "wrong").unwrap_err();
    assert!(matches!(err, ImapError::ValidateException { .. }), "{err:?}");
    assert!(err.message().contains("Invalid credentials"));
}

#[test]
fn imap_missing_mailbox_is_bad_response() {
    let (port, _server) = scripted_server(
        "* OK ready\r\n",
        vec![
            ("A0000 LOGIN", b"A0000 OK done\r\n"),
            ("A0001 EXAMINE INBOX", b"A0001 NO Mailbox unavailable\r\n"),
        ],
    );

    let err = fetch_inbox_top_with_config(&imap_config(port), "user", "pass").unwrap_err();
    assert!(matches!(err, ImapError::BadResponse { .. }), "{err:?}");
}

#[test]
fn imap_fetch_without_body_is_parse_exception() {
    let (port, _server) = scripted_server(
        "* OK ready\r\n",
        vec![
            ("A0000 LOGIN", b"A0000 OK done\r\n"),
            ("A0001 EXAMINE INBOX", b"* 1 EXISTS\r\nA0001 OK done\r\n"),
            ("A0002 FETCH 1", b"* 1 FETCH (UID 9)\r\nA0002 OK done\r\n"),
        ],
    );

    let err = fetch_inbox_top_with_config(&imap_config(port), "user", "pass").unwrap_err();
    assert!(matches!(err, ImapError::ParseException { .. }), "{err:?}");
}

#[test]
fn imap_garbage_reply_is_parse_exception() {
    let (port, _server) = scripted_server(
        "* OK ready\r\n",
        vec![("A0000 LOGIN", b"A0000 MAYBE later\r\n")],
    );

    let err = check_imap_with_config(&imap_config(port), "user", "pass").unwrap_err();
    assert!(matches!(err, ImapError::ParseException { .. }), "{err:?}");
}

#[test]
fn imap_bye_greeting_is_connection_lost() {
    let (port, _server) = scripted_server("* BYE too many connections\r\n", vec![]);

    let err = check_imap_with_config(&imap_config(port), "user", "pass").unwrap_err();
    assert!(matches!(err, ImapError::ConnectionLost { .. }), "{err:?}");
}

#[test]
fn imap_silent_server_is_no_response() {
    let (port, _server) = scripted_server("* OK ready\r\n", vec![]);
    let config = ImapConfig::builder("127.0.0.1")
        .port(port)
        .security(ImapSecurity::None)
        .io_timeout(Duration::from_millis(200))
        .build();

    let err = check_imap_with_config(&config, "user", "pass").unwrap_err();
    assert!(matches!(err, ImapError::NoResponse { .. }), "{err:?}");
}

#[test]
fn imap_connection_refused_is_io_exception() {
    let err = check_imap_with_config(&imap_config(closed_port()), "user", "pass").unwrap_err();
    assert!(matches!(err, ImapError::IoException { .. }), "{err:?}");
}

#[test]
fn imap_check_logs_in_and_out() {
    let (port, server) = scripted_server(
        "* OK ready\r\n",
        vec![
            ("A0000 LOGIN", b"A0000 OK done\r\n"),
            ("A0001 LOGOUT", b"* BYE bye\r\nA0001 OK done\r\n"),
        ],
    );

    check_imap_with_config(&imap_config(port), "user", "pass").unwrap();
    assert_eq!(server.join().unwrap().len(), 2);
}

// ----- SMTP -----

const EHLO_REPLY: &[u8] = b"250-mx.test\r\n250-AUTH PLAIN LOGIN\r\n250 8BITMIME\r\n";

#[test]
fn smtp_sends_plain_text_email() {
    let (port, server) = scripted_server(
        "220 mx.test ESMTP ready\r\n",
        vec![
            ("EHLO localhost", EHLO_REPLY),
            ("AUTH PLAIN ", b"235 2.7.0 Accepted\r\n"),
            ("MAIL FROM:<alice@example.com>", b"250 2.1.0 Ok\r\n"),
            ("RCPT TO:<bob@example.org>", b"250 2.1.5 Ok\r\n"),
            ("RCPT TO:<carol@example.org>", b"250 2.1.5 Ok\r\n"),
            ("RCPT TO:<dave@example.org>", b"250 2.1.5 Ok\r\n"),
            ("DATA", b"354 End data with <CR><LF>.<CR><LF>\r\n"),
            (".", b"250 2.0.0 Ok: queued as 7\r\n"),
            ("QUIT", b"221 2.0.0 Bye\r\n"),
        ],
    );

    let response = send_plain_text_email_with_config(
        &smtp_config(port),
        "alice",
        "secret",
        &standard_headers(),
        "Hi Bob,\n.see you\n",
    )
    .unwrap();

    assert_eq!(
        (response.severity, response.category, response.detail),
        (2, 5, 0)
    );
    assert_eq!(response.message, "2.0.0 Ok: queued as 7");
    assert!(response.is_positive());

    let seen = server.join().unwrap();
    assert!(seen.contains(&"From: Alice <alice@example.com>".to_string()));
    assert!(seen.contains(&"Subject: Hello".to_string()));
    assert!(seen.contains(&"Cc: carol@example.org".to_string()));
    assert!(seen.contains(&"X-Mailer: simplymail-tests".to_string()));
    assert!(seen.contains(&"Content-Type: text/plain; charset=utf-8".to_string()));
    assert!(seen.contains(&"..see you".to_string()));
    assert_eq!(seen.iter().filter(|l| l.contains("dave@example.org")).count(), 1);
    assert!(!seen.iter().any(|l| l.to_ascii_lowercase().starts_with("bcc:")));
}

#[test]
fn smtp_sends_html_email_as_alternative() {
    let (port, server) = scripted_server(
        "220 mx.test\r\n",
        vec![
            ("EHLO", EHLO_REPLY),
            ("AUTH PLAIN", b"235 ok\r\n"),
            ("MAIL FROM", b"250 ok\r\n"),
            ("RCPT TO:<bob@example.org>", b"250 ok\r\n"),
            ("DATA", b"354 go\r\n"),
            (".", b"250 queued\r\n"),
            ("QUIT", b"221 bye\r\n"),
        ],
    );
    let headers = headers(&[
        ("from", "alice@example.com"),
        ("to", "bob@example.org"),
        ("subject", "Newsletter"),
    ]);

    let response = send_html_email_with_config(
        &smtp_config(port),
        "alice",
        "secret",
        &headers,
        "plain version",
        "<h1>html version</h1>",
    )
    .unwrap();
    assert_eq!(response.code(), 250);

    let seen = server.join().unwrap();
    let content_type = seen
        .iter()
        .find(|l| l.starts_with("Content-Type: multipart/alternative; boundary="))
        .expect("multipart header");
    let boundary = content_type
        .split("boundary=")
        .nth(1)
        .unwrap()
        .trim_matches('"');
    assert!(seen.contains(&format!("--{boundary}")));
    assert!(seen.contains(&format!("--{boundary}--")));
    assert!(seen.contains(&"Content-Type: text/html; charset=utf-8".to_string()));
    assert!(seen.contains(&"<h1>html version</h1>".to_string()));
}

#[test]
fn smtp_rejected_credentials_are_permanent() {
    let (port, _server) = scripted_server(
        "220 mx.test\r\n",
        vec![
            ("EHLO", EHLO_REPLY),
            ("AUTH PLAIN", b"535 5.7.8 Authentication credentials invalid\r\n"),
        ],
    );

    let err = send_plain_text_email_with_config(
        &smtp_config(port),
        "alice",
        "wrong",
        &standard_headers(),
        "body",
    )
    .unwrap_err();
    assert!(matches!(err, SmtpError::PermanentSmtpException { .. }), "{err:?}");
    assert!(err.message().contains("535"));
}

#[test]
fn smtp_hangup_inside_final_reply_is_network_error() {
    let (port, _server) = scripted_server(
        "220 mx.test\r\n",
        vec![
            ("EHLO", EHLO_REPLY),
            ("AUTH PLAIN", b"235 ok\r\n"),
            ("MAIL FROM", b"250 ok\r\n"),
            ("RCPT TO:<bob@example.org>", b"250 ok\r\n"),
            ("RCPT TO:<carol@example.org>", b"250 ok\r\n"),
            ("RCPT TO:<dave@example.org>", b"250 ok\r\n"),
            ("DATA", b"354 go\r\n"),
            (".", b"250 2.0.0 Ok: qu"),
        ],
    );

    let err = send_plain_text_email_with_config(
        &smtp_config(port),
        "alice",
        "secret",
        &standard_headers(),
        "body",
    )
    .unwrap_err();
    assert!(matches!(err, SmtpError::NetworkException { .. }), "{err:?}");
}

#[test]
fn smtp_greylisting_is_transient() {
    let (port, _server) = scripted_server(
        "220 mx.test\r\n",
        vec![
            ("EHLO", EHLO_REPLY),
            ("AUTH PLAIN", b"235 ok\r\n"),
            ("MAIL FROM", b"451 4.7.1 Greylisted, try again later\r\n"),
        ],
    );

    let err = send_plain_text_email_with_config(
        &smtp_config(port),
        "alice",
        "secret",
        &standard_headers(),
        "body",
    )
    .unwrap_err();
    assert!(err.is_transient(), "{err:?}");
}

#[test]
fn smtp_refusing_greeting_is_connection_exception() {
    let (port, _server) = scripted_server("554 5.3.2 No service\r\n", vec![]);

    let err = check_smtp_with_config(&smtp_config(port), "alice", "secret").unwrap_err();
    assert!(matches!(err, SmtpError::ConnectionException { .. }), "{err:?}");
}

#[test]
fn smtp_connection_refused_is_connection_exception() {
    let err = check_smtp_with_config(&smtp_config(closed_port()), "alice", "secret").unwrap_err();
    assert!(matches!(err, SmtpError::ConnectionException { .. }), "{err:?}");
}

#[test]
fn smtp_malformed_reply_is_parse_exception() {
    let (port, _server) = scripted_server("220 mx.test\r\n", vec![("EHLO", b"hello there\r\n")]);

    let err = check_smtp_with_config(&smtp_config(port), "alice", "secret").unwrap_err();
    assert!(matches!(err, SmtpError::ResponseParseException { .. }), "{err:?}");
}

#[test]
fn smtp_hangup_is_network_exception() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let (mut socket, _) = listener.accept().unwrap();
        socket.write_all(b"220 mx.test\r\n").unwrap();
        // Dropping the socket closes the connection before EHLO is answered.
    });

    let err = check_smtp_with_config(&smtp_config(port), "alice", "secret").unwrap_err();
    server.join().unwrap();
    assert!(matches!(err, SmtpError::NetworkException { .. }), "{err:?}");
}

#[test]
fn smtp_operation_timeout() {
    let (port, _server) = scripted_server("220 mx.test\r\n", vec![]);
    let config = SmtpConfig::builder("127.0.0.1")
        .port(port)
        .security(SmtpSecurity::None)
        .io_timeout(Duration::from_secs(30))
        .operation_timeout(Duration::from_millis(200))
        .build();

    let err = check_smtp_with_config(&config, "alice", "secret").unwrap_err();
    assert!(matches!(err, SmtpError::Timeout { .. }), "{err:?}");
}

#[test]
fn smtp_starttls_required_but_not_offered() {
    let (port, _server) = scripted_server(
        "220 mx.test\r\n",
        vec![("EHLO", b"250-mx.test\r\n250 AUTH PLAIN\r\n")],
    );
    let config = SmtpConfig::builder("127.0.0.1")
        .port(port)
        .security(SmtpSecurity::StartTls)
        .io_timeout(Duration::from_secs(5))
        .build();

    let err = check_smtp_with_config(&config, "alice", "secret").unwrap_err();
    assert!(matches!(err, SmtpError::TlsException { .. }), "{err:?}");
}

#[test]
fn smtp_check_authenticates_and_quits() {
    let (port, server) = scripted_server(
        "220 mx.test\r\n",
        vec![
            ("EHLO", b"250-mx.test\r\n250 AUTH LOGIN\r\n"),
            ("AUTH LOGIN", b"334 VXNlcm5hbWU6\r\n"),
            ("YWxpY2U=", b"334 UGFzc3dvcmQ6\r\n"),
            ("c2VjcmV0", b"235 ok\r\n"),
            ("QUIT", b"221 bye\r\n"),
        ],
    );

    assert!(check_smtp_with_config(&smtp_config(port), "alice", "secret").unwrap());
    assert_eq!(server.join().unwrap().len(), 5);
}

#[test]
fn smtp_missing_subject_fails_before_connecting() {
    let headers = headers(&[("From", "alice@example.com"), ("To", "bob@example.org")]);

    let err = send_plain_text_email_with_config(
        &smtp_config(closed_port()),
        "alice",
        "secret",
        &headers,
        "body",
    )
    .unwrap_err();
    assert_eq!(
        err,
        SmtpError::InternalClientException {
            message: "Missing required header: Subject".into()
        }
    );
}

#[test]
fn smtp_bad_server_string_is_internal() {
    let err = send_plain_text_email(
        "smtp.example.com:99999",
        "alice",
        "secret",
        &standard_headers(),
        "body",
    )
    .unwrap_err();
    assert!(matches!(err, SmtpError::InternalClientException { .. }), "{err:?}");
}
