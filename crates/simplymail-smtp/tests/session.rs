//! End-to-end SMTP sessions against a scripted loopback server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use simplymail_smtp::connection::open;
use simplymail_smtp::{Address, Client, Config, Error, Security, SmtpConnection, SmtpResponse};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// One scripted exchange: the expected command prefix and the canned reply.
type Step = (&'static str, &'static str);

/// Spawns a server that greets, then answers each command in `script`.
///
/// A step with prefix `"."` swallows message data up to the terminator and
/// returns everything it read.
async fn scripted_server(
    greeting: &'static str,
    script: Vec<Step>,
) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut reader = BufReader::new(read);
        let mut seen = Vec::new();

        write.write_all(greeting.as_bytes()).await.unwrap();
        for (prefix, reply) in script {
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).await.unwrap() == 0 {
                    return seen;
                }
                let line = line.trim_end_matches(['\r', '\n']).to_string();
                let done = prefix != "." || line == ".";
                if prefix != "." {
                    assert!(line.starts_with(prefix), "expected {prefix}, got {line}");
                }
                seen.push(line);
                if done {
                    break;
                }
            }
            write.write_all(reply.as_bytes()).await.unwrap();
        }
        seen
    });

    (port, handle)
}

fn plain_config(port: u16) -> Config {
    Config::builder("127.0.0.1")
        .port(port)
        .security(Security::None)
        .io_timeout(Duration::from_secs(5))
        .build()
}

#[tokio::test]
async fn delivers_message_with_auth_plain() {
    let (port, server) = scripted_server(
        "220 mx.test ESMTP ready\r\n",
        vec![
            ("EHLO localhost", "250-mx.test\r\n250-AUTH PLAIN LOGIN\r\n250 SIZE 100000\r\n"),
            ("AUTH PLAIN ", "235 2.7.0 Authentication successful\r\n"),
            ("MAIL FROM:<a@test> SIZE=", "250 OK\r\n"),
            ("RCPT TO:<b@test>", "250 OK\r\n"),
            ("RCPT TO:<c@test>", "250 OK\r\n"),
            ("DATA", "354 go ahead\r\n"),
            (".", "250-2.0.0 Ok:\r\n250 queued as 42\r\n"),
            ("QUIT", "221 bye\r\n"),
        ],
    )
    .await;

    let config = plain_config(port);
    let message = b"Subject: hi\r\n\r\n.leading dot\r\nbye\r\n";

    let client = Client::from_stream(open(&config).await.unwrap()).await.unwrap();
    assert_eq!(client.server_info().hostname, "mx.test");
    let client = client.ehlo(&config.client_hostname).await.unwrap();
    assert_eq!(client.server_info().size_limit(), Some(Some(100_000)));
    let client = client.authenticate("a@test", "secret").await.unwrap();
    let client = client
        .mail_from(Address::new("a@test").unwrap(), Some(message.len()))
        .await
        .unwrap();
    let client = client.rcpt_to(Address::new("b@test").unwrap()).await.unwrap();
    let client = client.rcpt_to(Address::new("c@test").unwrap()).await.unwrap();
    let client = client.data().await.unwrap();
    let (client, reply) = client.send_message(message).await.unwrap();
    client.quit().await.unwrap();

    let response = SmtpResponse::from(&reply);
    assert_eq!((response.severity, response.category, response.detail), (2, 5, 0));
    assert_eq!(response.message, "2.0.0 Ok: queued as 42");

    let seen = server.await.unwrap();
    assert!(seen.contains(&"..leading dot".to_string()));
    assert_eq!(seen.iter().filter(|l| l.as_str() == ".").count(), 1);
}

#[tokio::test]
async fn falls_back_to_auth_login() {
    let (port, server) = scripted_server(
        "220 mx.test\r\n",
        vec![
            ("EHLO", "250-mx.test\r\n250 AUTH LOGIN\r\n"),
            ("AUTH LOGIN", "334 VXNlcm5hbWU6\r\n"),
            ("dXNlcg==", "334 UGFzc3dvcmQ6\r\n"),
            ("cGFzcw==", "235 ok\r\n"),
        ],
    )
    .await;

    let config = plain_config(port);
    let client = Client::from_stream(open(&config).await.unwrap()).await.unwrap();
    let client = client.ehlo("localhost").await.unwrap();
    client.authenticate("user", "pass").await.unwrap();
    assert_eq!(server.await.unwrap().len(), 4);
}

#[tokio::test]
async fn rejected_credentials_are_permanent() {
    let (port, _server) = scripted_server(
        "220 mx.test\r\n",
        vec![
            ("EHLO", "250-mx.test\r\n250 AUTH PLAIN\r\n"),
            ("AUTH PLAIN", "535 5.7.8 Authentication credentials invalid\r\n"),
        ],
    )
    .await;

    let config = plain_config(port);
    let client = Client::from_stream(open(&config).await.unwrap()).await.unwrap();
    let client = client.ehlo("localhost").await.unwrap();
    let err = client.authenticate("user", "wrong").await.unwrap_err();
    assert!(err.is_permanent());
    assert!(matches!(err, Error::SmtpError { code: 535, .. }));
}

#[tokio::test]
async fn starttls_missing_is_reported() {
    let (port, _server) =
        scripted_server("220 mx.test\r\n", vec![("EHLO", "250 mx.test\r\n")]).await;

    let config = plain_config(port);
    let client = Client::from_stream(open(&config).await.unwrap()).await.unwrap();
    let client = client.ehlo("localhost").await.unwrap();
    let err = client.starttls("localhost").await.unwrap_err();
    assert!(matches!(err, Error::StartTlsUnavailable));
}

#[tokio::test]
async fn bad_greeting_is_rejected() {
    let (port, _server) = scripted_server("554 go away\r\n", vec![]).await;

    let config = plain_config(port);
    let err = Client::from_stream(open(&config).await.unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Greeting { code: 554, .. }));
}

#[tokio::test]
async fn oversized_message_is_refused_locally() {
    let (port, _server) = scripted_server(
        "220 mx.test\r\n",
        vec![
            ("EHLO", "250-mx.test\r\n250-AUTH PLAIN\r\n250 SIZE 10\r\n"),
            ("AUTH PLAIN", "235 ok\r\n"),
        ],
    )
    .await;

    let config = plain_config(port);
    let client = Client::from_stream(open(&config).await.unwrap()).await.unwrap();
    let client = client.ehlo("localhost").await.unwrap();
    let client = client.authenticate("u", "p").await.unwrap();
    let err = client
        .mail_from(Address::new("a@test").unwrap(), Some(11))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MessageTooLarge { size: 11, limit: 10 }));
}

#[tokio::test]
async fn server_hangup_mid_session() {
    let (port, _server) = scripted_server("220 mx.test\r\n", vec![]).await;

    let config = plain_config(port);
    let client = Client::from_stream(open(&config).await.unwrap()).await.unwrap();
    let err = client.ehlo("localhost").await.unwrap_err();
    assert!(matches!(err, Error::ConnectionClosed | Error::Io(_)));
}
