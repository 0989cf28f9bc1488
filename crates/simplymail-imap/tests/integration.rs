//! Integration tests for the IMAP client.
//!
//! The mock stream tests replay canned server output without a network;
//! the session tests run a scripted server on a loopback socket.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use simplymail_imap::connection::{check_login, fetch_newest};
use simplymail_imap::{Client, Config, Error, Greeting, Security};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Mock stream that returns predefined responses.
struct MockStream {
    /// Responses to return (in order).
    responses: Cursor<Vec<u8>>,
    /// Captured commands sent by the client.
    sent: Arc<Mutex<Vec<u8>>>,
}

impl MockStream {
    fn new(responses: &[u8]) -> Self {
        Self {
            responses: Cursor::new(responses.to_vec()),
            sent: Arc::default(),
        }
    }

    /// Handle to the captured commands that outlives the stream.
    fn sent(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.sent)
    }
}

fn sent_lines(sent: &Mutex<Vec<u8>>) -> Vec<String> {
    String::from_utf8_lossy(&sent.lock().unwrap())
        .split("\r\n")
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.responses.get_ref();
        let pos = usize::try_from(self.responses.position()).unwrap();

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        let remaining = &data[pos..];
        let to_read = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.responses.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn test_fetch_newest_over_mock_stream() {
    // Everything arrives in one read; the decoder must still split it
    // correctly around the literal, whose body contains CRLF and ")".
    let server = b"* OK [CAPABILITY IMAP4rev1 AUTH=PLAIN] Service Ready\r\n\
                   A0000 OK LOGIN completed\r\n\
                   * 2 EXISTS\r\n\
                   * 0 RECENT\r\n\
                   * OK [UIDVALIDITY 7] UIDs valid\r\n\
                   A0001 OK [READ-ONLY] EXAMINE completed\r\n\
                   * 2 FETCH (BODY[] {22}\r\nSubject: (x)\r\n\r\nbody\r\n)\r\n\
                   A0002 OK FETCH completed\r\n";

    let stream = MockStream::new(server);
    let sent = stream.sent();
    let greeting = Client::from_stream(stream, TIMEOUT).await.unwrap();
    let client = greeting.login("user", "pass").await.unwrap();
    let mut client = client.examine("INBOX").await.unwrap();
    assert!(client.selected().is_read_only());
    assert_eq!(client.selected().uid_validity(), Some(7));

    let message = client.fetch_newest().await.unwrap().unwrap();
    assert_eq!(message, b"Subject: (x)\r\n\r\nbody\r\n");

    drop(client);
    assert_eq!(
        sent_lines(&sent),
        vec![
            "A0000 LOGIN user pass",
            "A0001 EXAMINE INBOX",
            "A0002 FETCH 2 BODY.PEEK[]",
        ]
    );
}

#[tokio::test]
async fn test_preauth_connection() {
    let server = b"* PREAUTH [CAPABILITY IMAP4rev1] Logged in as user\r\n";
    let greeting = Client::from_stream(MockStream::new(server), TIMEOUT)
        .await
        .unwrap();
    assert!(matches!(greeting, Greeting::PreAuthenticated(_)));
}

#[tokio::test]
async fn test_server_hangup_mid_literal() {
    let server = b"* OK ready\r\n\
                   A0000 OK LOGIN completed\r\n\
                   * 1 EXISTS\r\n\
                   A0001 OK EXAMINE completed\r\n\
                   * 1 FETCH (BODY[] {100}\r\ntruncated";

    let greeting = Client::from_stream(MockStream::new(server), TIMEOUT)
        .await
        .unwrap();
    let client = greeting.login("user", "pass").await.unwrap();
    let mut client = client.examine("INBOX").await.unwrap();
    let err = client.fetch_newest().await.unwrap_err();
    assert!(matches!(err, Error::ConnectionClosed));
}

/// One scripted exchange: the expected command and the canned reply.
type Step = (&'static str, &'static str);

/// Spawns a server that greets, then answers each command in `script`
/// and returns the command lines it received.
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
        for (expected, reply) in script {
            let mut line = String::new();
            if reader.read_line(&mut line).await.unwrap() == 0 {
                return seen;
            }
            let line = line.trim_end_matches(['\r', '\n']).to_string();
            assert_eq!(line, expected);
            seen.push(line);
            write.write_all(reply.as_bytes()).await.unwrap();
        }

        // Hold the connection until the client hangs up.
        let mut rest = String::new();
        while reader.read_line(&mut rest).await.unwrap_or(0) > 0 {
            rest.clear();
        }
        seen
    });

    (port, handle)
}

fn plain_config(port: u16, io_timeout: Duration) -> Config {
    Config::builder("127.0.0.1")
        .port(port)
        .security(Security::None)
        .io_timeout(io_timeout)
        .build()
}

#[tokio::test]
async fn test_session_fetch_newest() {
    let (port, server) = scripted_server(
        "* OK IMAP4rev1 ready\r\n",
        vec![
            ("A0000 LOGIN alice \"s3cret pw\"", "A0000 OK LOGIN completed\r\n"),
            (
                "A0001 EXAMINE INBOX",
                "* 3 EXISTS\r\n* FLAGS (\\Seen)\r\nA0001 OK [READ-ONLY] done\r\n",
            ),
            (
                "A0002 FETCH 3 BODY.PEEK[]",
                "* 3 FETCH (UID 9 BODY[] {5}\r\nhello)\r\nA0002 OK done\r\n",
            ),
            ("A0003 LOGOUT", "* BYE logging out\r\nA0003 OK done\r\n"),
        ],
    )
    .await;

    let message = fetch_newest(&plain_config(port, TIMEOUT), "alice", "s3cret pw", "INBOX")
        .await
        .unwrap();
    assert_eq!(message, Some(b"hello".to_vec()));
    assert_eq!(server.await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_session_empty_inbox() {
    let (port, server) = scripted_server(
        "* OK ready\r\n",
        vec![
            ("A0000 LOGIN bob pw", "A0000 OK done\r\n"),
            ("A0001 EXAMINE INBOX", "* 0 EXISTS\r\nA0001 OK done\r\n"),
            ("A0002 LOGOUT", "* BYE\r\nA0002 OK done\r\n"),
        ],
    )
    .await;

    let message = fetch_newest(&plain_config(port, TIMEOUT), "bob", "pw", "INBOX")
        .await
        .unwrap();
    assert!(message.is_none());
    server.await.unwrap();
}

#[tokio::test]
async fn test_session_bad_password() {
    let (port, _server) = scripted_server(
        "* OK ready\r\n",
        vec![(
            "A0000 LOGIN bob wrong",
            "A0000 NO [AUTHENTICATIONFAILED] Authentication failed.\r\n",
        )],
    )
    .await;

    let err = check_login(&plain_config(port, TIMEOUT), "bob", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth(_)), "{err:?}");
}

#[tokio::test]
async fn test_session_no_response() {
    // The server greets, then ignores LOGIN entirely.
    let (port, _server) = scripted_server("* OK ready\r\n", vec![]).await;

    let err = check_login(&plain_config(port, Duration::from_millis(200)), "bob", "pw")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoResponse(_)), "{err:?}");
}

#[tokio::test]
async fn test_connect_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = check_login(&plain_config(port, TIMEOUT), "bob", "pw")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)), "{err:?}");
}
