//! Client Connection
//!
//! A [`Connection`] carries RESP over a byte stream: it writes one command,
//! then reads until a complete reply has been parsed.
//!
//! ```text
//!   request(cmd)
//!        │
//!        ▼
//!   serialize ──> BufWriter ──> flush ──> [socket]
//!                                            │
//!   ┌────────────────────────────────────────┘
//!   ▼
//!   read_buf ──> BytesMut ──> RespParser ──> reply
//!        ▲                        │
//!        └──── incomplete ────────┘
//! ```
//!
//! TCP is a stream protocol, so a reply may arrive in several reads, and a
//! single read may carry the start of the next reply. The read buffer keeps
//! whatever the parser has not consumed yet.
//!
//! Replies are matched to commands by order alone. If a [`Connection::request`]
//! future is dropped after its command went out, the reply is still on its way,
//! and the next request would read it. The connection remembers the
//! abandoned request and refuses further requests with
//! [`ConnectionError::Abandoned`]; callers discard it and reconnect.

use crate::protocol::parser::MAX_BULK_SIZE;
use crate::protocol::{ParseError, RespParser, RespValue};
use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{trace, warn};

/// Maximum size for the read buffer: one maximal bulk string plus headroom
const MAX_BUFFER_SIZE: usize = MAX_BULK_SIZE + 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Errors that can occur on an established connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server sent something that is not RESP
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The server closed the connection between replies
    #[error("Connection closed by server")]
    Closed,

    /// The server closed the connection in the middle of a reply
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// Buffer size limit exceeded
    #[error("Buffer size limit exceeded")]
    BufferFull,

    /// An earlier request stopped before its reply was read
    #[error("Earlier request was abandoned before its reply arrived")]
    Abandoned,
}

/// A RESP connection over any async byte stream.
#[derive(Debug)]
pub struct Connection<S> {
    /// The underlying stream, with buffered writes
    stream: BufWriter<S>,

    /// Bytes received but not yet parsed
    buffer: BytesMut,

    /// RESP parser
    parser: RespParser,

    /// Set while a request waits for its reply; cleared once it arrives
    in_flight: bool,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            parser: RespParser::new(),
            in_flight: false,
        }
    }

    /// Writes a command and flushes it to the server.
    pub async fn send(&mut self, command: &RespValue) -> Result<(), ConnectionError> {
        let bytes = command.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        trace!(bytes = bytes.len(), "Sent command");
        Ok(())
    }

    /// Reads the next complete reply.
    ///
    /// Error replies (`-ERR ...`) are returned as [`RespValue::Error`], not
    /// as a [`ConnectionError`]; the connection stays usable after them.
    pub async fn read_reply(&mut self) -> Result<RespValue, ConnectionError> {
        loop {
            if let Some(reply) = self.try_parse_reply()? {
                return Ok(reply);
            }
            self.read_more_data().await?;
        }
    }

    /// Sends a command and waits for its reply.
    ///
    /// Fails with [`ConnectionError::Abandoned`] if an earlier request was
    /// cancelled or failed before its reply was read. The connection cannot
    /// be trusted after that.
    pub async fn request(&mut self, command: &RespValue) -> Result<RespValue, ConnectionError> {
        if self.in_flight {
            return Err(ConnectionError::Abandoned);
        }

        self.in_flight = true;
        self.send(command).await?;
        let reply = self.read_reply().await?;
        self.in_flight = false;
        Ok(reply)
    }

    /// Returns true if a request is waiting for its reply.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Shuts down the write half of the stream.
    pub async fn shutdown(&mut self) -> Result<(), ConnectionError> {
        self.stream.shutdown().await?;
        Ok(())
    }

    /// Attempts to parse a reply from the buffer.
    fn try_parse_reply(&mut self) -> Result<Option<RespValue>, ConnectionError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.parser.parse(&self.buffer) {
            Ok(Some((reply, consumed))) => {
                self.buffer.advance(consumed);
                trace!(
                    consumed = consumed,
                    remaining = self.buffer.len(),
                    "Parsed reply"
                );
                Ok(Some(reply))
            }
            Ok(None) => {
                trace!(buffered = self.buffer.len(), "Incomplete reply, need more data");
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "Malformed reply from server");
                Err(ConnectionError::Parse(e))
            }
        }
    }

    /// Reads more data from the stream into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            warn!(size = self.buffer.len(), "Reply exceeds buffer size limit");
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            return if self.buffer.is_empty() {
                Err(ConnectionError::Closed)
            } else {
                Err(ConnectionError::UnexpectedEof)
            };
        }

        trace!(bytes = n, "Read data");
        Ok(())
    }
}
