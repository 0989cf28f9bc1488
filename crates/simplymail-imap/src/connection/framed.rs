//! Framed I/O for IMAP protocol.
//!
//! IMAP responses are CRLF-terminated lines that may embed literals:
//! `{n}\r\n` followed by exactly `n` raw bytes, after which the line
//! continues. [`ResponseDecoder`] is the sans-I/O half: it switches between
//! line mode and a literal sub-state that counts bytes, so a literal
//! containing CRLF is never mistaken for the end of a line.
//! [`FramedStream`] feeds it from a socket with timeouts.

#![allow(clippy::missing_errors_doc)]

use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Error, Result};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum line length to prevent memory exhaustion.
const MAX_LINE_LENGTH: usize = 1024 * 1024; // 1 MB

/// Maximum literal size to prevent memory exhaustion.
const MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024; // 100 MB

/// Decoder position within the current response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Collecting bytes up to the next CRLF.
    Line,
    /// Copying literal bytes; `remaining` more are expected.
    Literal {
        /// Bytes of the literal still to be received.
        remaining: usize,
    },
}

/// Sans-I/O decoder that splits a byte stream into complete IMAP responses.
///
/// Each returned response holds the wire bytes unchanged, literals included,
/// ending with the final CRLF.
#[derive(Debug)]
pub struct ResponseDecoder {
    state: DecodeState,
    /// Bytes of the response decoded so far.
    response: Vec<u8>,
    /// Length of `response` at the start of the current line.
    line_start: usize,
    /// Prefix of the buffer already searched for CRLF.
    scanned: usize,
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseDecoder {
    /// Creates a decoder in line mode.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: DecodeState::Line,
            response: Vec::new(),
            line_start: 0,
            scanned: 0,
        }
    }

    /// Returns true if no part of a response has been consumed yet.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == DecodeState::Line && self.response.is_empty()
    }

    /// Consumes bytes from `buf` and returns the next complete response.
    ///
    /// Returns `Ok(None)` when `buf` runs out first; call again once more
    /// bytes have been appended. Partial progress is kept between calls.
    pub fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Vec<u8>>> {
        loop {
            match self.state {
                DecodeState::Literal { remaining } => {
                    if buf.is_empty() {
                        return Ok(None);
                    }
                    let take = remaining.min(buf.len());
                    self.response.extend_from_slice(&buf[..take]);
                    buf.advance(take);

                    let remaining = remaining - take;
                    if remaining == 0 {
                        self.state = DecodeState::Line;
                        self.line_start = self.response.len();
                    } else {
                        self.state = DecodeState::Literal { remaining };
                        return Ok(None);
                    }
                }
                DecodeState::Line => {
                    let Some(pos) = find_crlf(&buf[self.scanned.saturating_sub(1)..])
                        .map(|p| p + self.scanned.saturating_sub(1))
                    else {
                        self.scanned = buf.len();
                        let line_len = self.response.len() - self.line_start + buf.len();
                        if line_len > MAX_LINE_LENGTH {
                            return Err(Error::Protocol("line too long".to_string()));
                        }
                        return Ok(None);
                    };

                    self.response.extend_from_slice(&buf[..pos + 2]);
                    buf.advance(pos + 2);
                    self.scanned = 0;

                    if self.response.len() - self.line_start > MAX_LINE_LENGTH {
                        return Err(Error::Protocol("line too long".to_string()));
                    }

                    match parse_literal_length(&self.response[self.line_start..]) {
                        Some(len) if len > MAX_LITERAL_SIZE => {
                            return Err(Error::Protocol(format!(
                                "literal too large: {len} bytes (max {MAX_LITERAL_SIZE})"
                            )));
                        }
                        Some(0) => self.line_start = self.response.len(),
                        Some(len) => self.state = DecodeState::Literal { remaining: len },
                        None => {
                            self.line_start = 0;
                            return Ok(Some(std::mem::take(&mut self.response)));
                        }
                    }
                }
            }
        }
    }
}

/// Framed connection for IMAP protocol.
///
/// Reads whole responses through a [`ResponseDecoder`] and writes commands,
/// each bounded by the I/O timeout.
pub struct FramedStream<S> {
    stream: S,
    read_buffer: BytesMut,
    decoder: ResponseDecoder,
    io_timeout: Duration,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new framed stream.
    pub fn new(stream: S, io_timeout: Duration) -> Self {
        Self {
            stream,
            read_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            decoder: ResponseDecoder::new(),
            io_timeout,
        }
    }

    /// Reads one complete response, including any embedded literals.
    ///
    /// A timeout before any byte of the response arrived is
    /// [`Error::NoResponse`]; a timeout part way through is
    /// [`Error::Timeout`]. EOF is [`Error::ConnectionClosed`].
    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        loop {
            if let Some(response) = self.decoder.decode(&mut self.read_buffer)? {
                return Ok(response);
            }

            let started = !self.decoder.is_idle() || !self.read_buffer.is_empty();
            let read = tokio::time::timeout(
                self.io_timeout,
                self.stream.read_buf(&mut self.read_buffer),
            )
            .await;

            match read {
                Ok(Ok(0)) => return Err(Error::ConnectionClosed),
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(Error::Io(e)),
                Err(_) if started => return Err(Error::Timeout(self.io_timeout)),
                Err(_) => return Err(Error::NoResponse(self.io_timeout)),
            }
        }
    }

    /// Writes raw bytes (a command or a command fragment) and flushes.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        let stream = &mut self.stream;
        let write = async {
            stream.write_all(data).await?;
            stream.flush().await
        };
        match tokio::time::timeout(self.io_timeout, write).await {
            Ok(result) => result.map_err(Error::Io),
            Err(_) => Err(Error::Timeout(self.io_timeout)),
        }
    }

    /// Consumes the framed stream and returns the inner stream.
    ///
    /// Only valid between responses: unread buffered bytes are dropped.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Returns the configured I/O timeout.
    pub const fn io_timeout(&self) -> Duration {
        self.io_timeout
    }
}

/// Finds the position of CRLF in a buffer.
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Parses a literal length from the end of a line.
///
/// Matches patterns like `{123}\r\n` or `{123+}\r\n` (non-synchronizing).
fn parse_literal_length(line: &[u8]) -> Option<usize> {
    let line = line.strip_suffix(b"\r\n")?;
    let line = line.strip_suffix(b"}")?;
    let line = line.strip_suffix(b"+").unwrap_or(line);

    let open = line.iter().rposition(|&b| b == b'{')?;
    let digits = &line[open + 1..];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }

    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Collects the responses to one command, up to its tagged completion.
pub struct ResponseAccumulator {
    tag: String,
    responses: Vec<Vec<u8>>,
}

impl ResponseAccumulator {
    /// Creates a new response accumulator for the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            responses: Vec::new(),
        }
    }

    /// Returns true if `response` is the tagged completion for our tag.
    #[must_use]
    pub fn is_completion(&self, response: &[u8]) -> bool {
        response
            .get(..self.tag.len())
            .is_some_and(|prefix| prefix == self.tag.as_bytes())
            && response.get(self.tag.len()).is_some_and(|&b| b == b' ')
    }

    /// Records a response that is part of the reply.
    pub fn push(&mut self, response: Vec<u8>) {
        self.responses.push(response);
    }

    /// Returns the responses collected so far.
    #[must_use]
    pub fn responses(&self) -> &[Vec<u8>] {
        &self.responses
    }

    /// Consumes the accumulator, returning the collected responses.
    #[must_use]
    pub fn into_responses(self) -> Vec<Vec<u8>> {
        self.responses
    }

    /// Reads responses until a tagged response matching our tag is found.
    ///
    /// A [`Error::NoResponse`] after untagged data has already arrived is
    /// reported as [`Error::Timeout`].
    pub async fn read_until_tagged<S>(
        &mut self,
        framed: &mut FramedStream<S>,
    ) -> Result<Vec<Vec<u8>>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            let response = match framed.read_response().await {
                Ok(response) => response,
                Err(Error::NoResponse(after)) if !self.responses.is_empty() => {
                    return Err(Error::Timeout(after));
                }
                Err(e) => return Err(e),
            };

            let is_tagged = self.is_completion(&response);
            self.responses.push(response);

            if is_tagged {
                break;
            }
        }

        Ok(std::mem::take(&mut self.responses))
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
    use proptest::prelude::*;
    use tokio_test::io::Builder;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_find_crlf() {
        assert_eq!(find_crlf(b"hello\r\n"), Some(5));
        assert_eq!(find_crlf(b"\r\n"), Some(0));
        assert_eq!(find_crlf(b"no newline"), None);
        assert_eq!(find_crlf(b"just\n"), None);
        assert_eq!(find_crlf(b"just\r"), None);
    }

    #[test]
    fn test_parse_literal_length() {
        assert_eq!(parse_literal_length(b"BODY {123}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"BODY {123+}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"{0}\r\n"), Some(0));
        assert_eq!(parse_literal_length(b"{999999}\r\n"), Some(999_999));
        assert_eq!(parse_literal_length(b"no literal\r\n"), None);
        assert_eq!(parse_literal_length(b"incomplete {123"), None);
        assert_eq!(parse_literal_length(b"wrong {abc}\r\n"), None);
        assert_eq!(parse_literal_length(b"empty {}\r\n"), None);
    }

    #[test]
    fn test_decoder_literal_with_embedded_crlf() {
        let mut decoder = ResponseDecoder::new();
        let mut buf = BytesMut::from(&b"* 1 FETCH (BODY[] {6}\r\na\r\n\r\nb)\r\nA1 OK done\r\n"[..]);

        let first = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first, b"* 1 FETCH (BODY[] {6}\r\na\r\n\r\nb)\r\n");
        assert!(decoder.is_idle());

        let second = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second, b"A1 OK done\r\n");
        assert!(decoder.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_decoder_literal_looks_like_literal_prefix() {
        // The literal's own last line ends in "{3}"; it must not start a new literal.
        let mut decoder = ResponseDecoder::new();
        let mut buf = BytesMut::from(&b"* 2 FETCH (BODY[] {5}\r\n{3}\r\n)\r\n"[..]);
        let response = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(response, b"* 2 FETCH (BODY[] {5}\r\n{3}\r\n)\r\n");
    }

    #[test]
    fn test_decoder_keeps_partial_state() {
        let mut decoder = ResponseDecoder::new();
        let mut buf = BytesMut::from(&b"* 1 FETCH (RFC822 {4}\r\nab"[..]);
        assert!(decoder.decode(&mut buf).unwrap().is_none());
        assert!(!decoder.is_idle());

        buf.extend_from_slice(b"cd)\r");
        assert!(decoder.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"\n");
        let response = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(response, b"* 1 FETCH (RFC822 {4}\r\nabcd)\r\n");
    }

    #[tokio::test]
    async fn test_framed_read_simple_line() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut framed = FramedStream::new(mock, TIMEOUT);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* OK ready\r\n");
    }

    #[tokio::test]
    async fn test_framed_read_with_literal() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY {5}\r\n")
            .read(b"hello)\r\n")
            .build();
        let mut framed = FramedStream::new(mock, TIMEOUT);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* 1 FETCH (BODY {5}\r\nhello)\r\n");
    }

    #[tokio::test]
    async fn test_framed_eof_is_connection_closed() {
        let mock = Builder::new().read(b"* OK partial").build();
        let mut framed = FramedStream::new(mock, TIMEOUT);

        let err = framed.read_response().await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_framed_write_command() {
        let mock = Builder::new().write(b"A001 LOGIN user pass\r\n").build();
        let mut framed = FramedStream::new(mock, TIMEOUT);

        framed
            .write_command(b"A001 LOGIN user pass\r\n")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_response_accumulator() {
        let mock = Builder::new()
            .read(b"* CAPABILITY IMAP4rev2\r\n")
            .read(b"* OK IMAP ready\r\n")
            .read(b"A001 OK Success\r\n")
            .build();

        let mut framed = FramedStream::new(mock, TIMEOUT);
        let mut accumulator = ResponseAccumulator::new("A001");

        let responses = accumulator.read_until_tagged(&mut framed).await.unwrap();

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0], b"* CAPABILITY IMAP4rev2\r\n");
        assert_eq!(responses[1], b"* OK IMAP ready\r\n");
        assert_eq!(responses[2], b"A001 OK Success\r\n");
    }

    #[tokio::test]
    async fn test_accumulator_ignores_tag_prefix_collision() {
        let mock = Builder::new()
            .read(b"A0010 OK other\r\n")
            .read(b"A001 OK mine\r\n")
            .build();
        let mut framed = FramedStream::new(mock, TIMEOUT);
        let responses = ResponseAccumulator::new("A001")
            .read_until_tagged(&mut framed)
            .await
            .unwrap();
        assert_eq!(responses.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_is_no_response() {
        let mock = Builder::new().wait(Duration::from_secs(10)).build();
        let mut framed = FramedStream::new(mock, Duration::from_secs(1));

        let err = framed.read_response().await.unwrap_err();
        assert!(matches!(err, Error::NoResponse(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stall_mid_response_is_timeout() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY[] {10}\r\nabc")
            .wait(Duration::from_secs(10))
            .build();
        let mut framed = FramedStream::new(mock, Duration::from_secs(1));

        let err = framed.read_response().await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn test_literal_size_validation() {
        let literal_size = MAX_LITERAL_SIZE + 1;
        let header = format!("* 1 FETCH (BODY {{{literal_size}}}\r\n");

        let mock = Builder::new().read(header.as_bytes()).build();
        let mut framed = FramedStream::new(mock, TIMEOUT);

        let result = framed.read_response().await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("literal too large")
        );
    }

    #[tokio::test]
    async fn test_line_length_limit() {
        let long_line = "A".repeat(MAX_LINE_LENGTH + 100);
        let mock = Builder::new().read(long_line.as_bytes()).build();
        let mut framed = FramedStream::new(mock, TIMEOUT);

        let result = framed.read_response().await;
        assert!(result.unwrap_err().to_string().contains("line too long"));
    }

    proptest! {
        #[test]
        fn prop_literal_consumed_exactly(
            literal in proptest::collection::vec(any::<u8>(), 0..200),
            chunk in 1usize..17,
        ) {
            let mut wire = format!("* 9 FETCH (BODY[] {{{}}}\r\n", literal.len()).into_bytes();
            wire.extend_from_slice(&literal);
            wire.extend_from_slice(b")\r\nT1 OK done\r\n");

            let mut decoder = ResponseDecoder::new();
            let mut buf = BytesMut::new();
            let mut responses = Vec::new();
            for piece in wire.chunks(chunk) {
                buf.extend_from_slice(piece);
                while let Some(response) = decoder.decode(&mut buf).unwrap() {
                    responses.push(response);
                }
            }

            prop_assert_eq!(responses.len(), 2);
            let header_len = wire.len() - literal.len() - b")\r\nT1 OK done\r\n".len();
            prop_assert_eq!(&responses[0][header_len..header_len + literal.len()], &literal[..]);
            prop_assert_eq!(&responses[1][..], &b"T1 OK done\r\n"[..]);
            prop_assert!(decoder.is_idle());
        }
    }
}
