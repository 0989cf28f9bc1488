//! Low-level SMTP stream handling.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::ServerName;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore},
};

use super::Config;
use crate::error::{Error, Result};

/// Maximum reply line length (RFC 5321 allows 512; be lenient).
const MAX_LINE_LENGTH: usize = 64 * 1024;

/// TLS state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsState {
    /// Plaintext.
    None,
    /// Handshake in progress.
    Handshaking,
    /// Handshake finished, traffic is encrypted.
    Established,
}

/// Socket underneath an [`SmtpStream`].
#[derive(Debug)]
enum Transport {
    /// Plain TCP connection.
    Tcp(BufReader<TcpStream>),
    /// TLS-encrypted connection.
    Tls(Box<BufReader<tokio_rustls::client::TlsStream<TcpStream>>>),
}

/// SMTP stream (TCP or TLS) with per-operation timeouts.
///
/// Dropping the stream closes the socket.
#[derive(Debug)]
pub struct SmtpStream {
    transport: Transport,
    host: String,
    port: u16,
    io_timeout: Duration,
    connect_timeout: Duration,
}

impl SmtpStream {
    /// Returns the server hostname.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the server port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the TLS state.
    #[must_use]
    pub const fn tls_state(&self) -> TlsState {
        match self.transport {
            Transport::Tcp(_) => TlsState::None,
            Transport::Tls(_) => TlsState::Established,
        }
    }

    /// Reads a line from the stream, without the trailing CRLF.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] on EOF between lines and an
    /// `UnexpectedEof` I/O error when the server hangs up mid-line.
    /// Returns [`Error::Timeout`] if nothing arrives within the I/O timeout.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = Vec::new();
        let io_timeout = self.io_timeout;
        let read = match &mut self.transport {
            Transport::Tcp(reader) => {
                with_timeout(io_timeout, read_bounded_line(reader, &mut line)).await
            }
            Transport::Tls(reader) => {
                with_timeout(io_timeout, read_bounded_line(reader.as_mut(), &mut line)).await
            }
        }?;

        if read == 0 {
            return Err(Error::ConnectionClosed);
        }

        let text = String::from_utf8_lossy(&line);
        Ok(text.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Writes data to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or times out.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let io_timeout = self.io_timeout;
        match &mut self.transport {
            Transport::Tcp(reader) => {
                let stream = reader.get_mut();
                with_timeout(io_timeout, async {
                    stream.write_all(data).await?;
                    stream.flush().await
                })
                .await
            }
            Transport::Tls(reader) => {
                let stream = reader.get_mut();
                with_timeout(io_timeout, async {
                    stream.write_all(data).await?;
                    stream.flush().await
                })
                .await
            }
        }
    }

    /// Upgrades a TCP stream to TLS.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS handshake fails.
    pub async fn upgrade_to_tls(self) -> Result<Self> {
        let tcp_stream = match self.transport {
            Transport::Tcp(reader) => reader.into_inner(),
            Transport::Tls(_) => return Err(Error::InvalidState("Already using TLS".into())),
        };

        let tls_stream = handshake(&self.host, tcp_stream, self.connect_timeout).await?;
        Ok(Self {
            transport: Transport::Tls(Box::new(BufReader::new(tls_stream))),
            ..self
        })
    }
}

/// Opens the connection described by `config`.
///
/// Implicit TLS performs the handshake before returning; the other modes
/// return a plaintext stream.
///
/// # Errors
///
/// Returns an error if the connection or TLS handshake fails.
pub async fn open(config: &Config) -> Result<SmtpStream> {
    match config.security {
        super::Security::Implicit => connect_tls(config).await,
        super::Security::StartTls | super::Security::None => connect(config).await,
    }
}

/// Connects to an SMTP server over plain TCP.
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn connect(config: &Config) -> Result<SmtpStream> {
    let tcp = connect_tcp(config).await?;
    Ok(SmtpStream {
        transport: Transport::Tcp(BufReader::new(tcp)),
        host: config.host.clone(),
        port: config.port,
        io_timeout: config.io_timeout,
        connect_timeout: config.connect_timeout,
    })
}

/// Connects to an SMTP server over TLS (implicit TLS on port 465).
///
/// # Errors
///
/// Returns an error if the connection or TLS handshake fails.
pub async fn connect_tls(config: &Config) -> Result<SmtpStream> {
    let tcp = connect_tcp(config).await?;
    let tls_stream = handshake(&config.host, tcp, config.connect_timeout).await?;
    Ok(SmtpStream {
        transport: Transport::Tls(Box::new(BufReader::new(tls_stream))),
        host: config.host.clone(),
        port: config.port,
        io_timeout: config.io_timeout,
        connect_timeout: config.connect_timeout,
    })
}

async fn connect_tcp(config: &Config) -> Result<TcpStream> {
    let address = format!("{}:{}", config.host, config.port);
    let connecting = TcpStream::connect((config.host.as_str(), config.port));
    let tcp = match tokio::time::timeout(config.connect_timeout, connecting).await {
        Ok(Ok(tcp)) => tcp,
        Ok(Err(source)) => return Err(Error::Connect { address, source }),
        Err(_) => return Err(Error::Timeout(config.connect_timeout)),
    };
    tracing::debug!(%address, "TCP connection established");
    Ok(tcp)
}

async fn handshake(
    host: &str,
    tcp: TcpStream,
    timeout: Duration,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>> {
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| Error::InvalidDnsName(host.to_string()))?;

    tracing::debug!(host, state = ?TlsState::Handshaking, "Starting TLS handshake");
    let connector = create_tls_connector();
    let tls_stream = match tokio::time::timeout(timeout, connector.connect(server_name, tcp)).await
    {
        Ok(Ok(stream)) => stream,
        Ok(Err(err)) => return Err(classify_handshake_error(err)),
        Err(_) => return Err(Error::Timeout(timeout)),
    };
    tracing::debug!(host, state = ?TlsState::Established, "TLS established");
    Ok(tls_stream)
}

/// Splits handshake failures into TLS-level errors (certificate rejected,
/// alert received) and transport failures.
fn classify_handshake_error(err: io::Error) -> Error {
    match err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<rustls::Error>())
    {
        Some(tls) => Error::Tls(tls.clone()),
        None => Error::TlsHandshake(err.to_string()),
    }
}

/// Creates a TLS connector with the platform's root certificates, falling
/// back to the bundled Mozilla roots.
fn create_tls_connector() -> TlsConnector {
    let mut root_store = RootCertStore::empty();
    match rustls_native_certs::load_native_certs() {
        Ok(certs) => {
            let (added, ignored) = root_store.add_parsable_certificates(certs);
            tracing::trace!(added, ignored, "Loaded native root certificates");
        }
        Err(e) => tracing::debug!(?e, "Native root certificates unavailable"),
    }
    if root_store.is_empty() {
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

/// Runs an I/O future under `timeout`, mapping expiry to [`Error::Timeout`].
async fn with_timeout<T>(
    timeout: Duration,
    fut: impl Future<Output = io::Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(Error::from),
        Err(_) => Err(Error::Timeout(timeout)),
    }
}

/// Reads up to and including `\n`, refusing lines over [`MAX_LINE_LENGTH`].
///
/// Returns 0 on a clean EOF. EOF after part of a line is an
/// [`io::ErrorKind::UnexpectedEof`] error, never a short line.
async fn read_bounded_line<R>(reader: &mut R, line: &mut Vec<u8>) -> io::Result<usize>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            if line.is_empty() {
                return Ok(0);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed in the middle of a reply line",
            ));
        }

        let (take, complete) = match buf.iter().position(|&b| b == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (buf.len(), false),
        };
        line.extend_from_slice(&buf[..take]);
        reader.consume(take);

        if line.len() > MAX_LINE_LENGTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "reply line too long",
            ));
        }
        if complete {
            return Ok(line.len());
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
    use super::*;

    #[test]
    fn test_classify_certificate_error() {
        let err = io::Error::new(
            io::ErrorKind::InvalidData,
            rustls::Error::InvalidCertificate(rustls::CertificateError::UnknownIssuer),
        );
        assert!(matches!(classify_handshake_error(err), Error::Tls(_)));
    }

    #[test]
    fn test_classify_transport_error() {
        let err = io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer");
        assert!(matches!(
            classify_handshake_error(err),
            Error::TlsHandshake(_)
        ));
    }

    #[tokio::test]
    async fn test_read_bounded_line() {
        let mock = tokio_test::io::Builder::new()
            .read(b"250-fi")
            .read(b"rst\r\n250 last\r\n")
            .build();
        let mut reader = BufReader::new(mock);

        let mut line = Vec::new();
        read_bounded_line(&mut reader, &mut line).await.unwrap();
        assert_eq!(line, b"250-first\r\n");

        line.clear();
        read_bounded_line(&mut reader, &mut line).await.unwrap();
        assert_eq!(line, b"250 last\r\n");

        line.clear();
        assert_eq!(read_bounded_line(&mut reader, &mut line).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_eof_mid_line_is_an_error() {
        let mock = tokio_test::io::Builder::new()
            .read(b"250 2.0.0 Ok: qu")
            .build();
        let mut reader = BufReader::new(mock);

        let mut line = Vec::new();
        let err = read_bounded_line(&mut reader, &mut line).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_overlong_line_rejected_even_when_complete() {
        let mut data = vec![b'x'; MAX_LINE_LENGTH + 10];
        data.extend_from_slice(b"\r\n");
        let mock = tokio_test::io::Builder::new().read(&data).build();
        let mut reader = BufReader::with_capacity(data.len(), mock);

        let mut line = Vec::new();
        let err = read_bounded_line(&mut reader, &mut line).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_hangup_mid_reply_fails_read_line() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"250 2.0.0 Ok: qu").await.unwrap();
        });

        let config = Config::builder("127.0.0.1")
            .port(port)
            .security(crate::connection::Security::None)
            .build();
        let mut stream = connect(&config).await.unwrap();
        server.await.unwrap();
        let err = stream.read_line().await.unwrap_err();
        assert!(matches!(err, Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[tokio::test]
    async fn test_connect_refused_is_connect_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = Config::builder("127.0.0.1")
            .port(port)
            .security(crate::connection::Security::None)
            .build();
        let err = connect(&config).await.unwrap_err();
        assert!(matches!(err, Error::Connect { .. }));
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
            drop(socket);
        });

        let config = Config::builder("127.0.0.1")
            .port(port)
            .security(crate::connection::Security::None)
            .io_timeout(Duration::from_millis(50))
            .build();
        let mut stream = connect(&config).await.unwrap();
        assert_eq!(stream.tls_state(), TlsState::None);
        let err = stream.read_line().await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        server.abort();
    }
}
