//! Network infrastructure for the client.
//!
//! The client holds exactly one TCP connection to the server.  This module
//! opens it (with a bounded number of retries before the session starts) and
//! wraps its two halves:
//!
//! - [`RecordReader`] turns socket reads into decoded [`Record`]s through a
//!   [`FrameSplitter`].
//! - [`RecordWriter`] encodes records and writes them out.
//!
//! Both are generic over tokio's `AsyncRead`/`AsyncWrite`, so tests drive
//! them with in-memory pipes instead of sockets.

use std::time::Duration;

use sechat_core::{decode_record, encode_record, FrameSplitter, ProtocolError, Record};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{tcp, TcpStream};
use tokio::time;
use tracing::{debug, info, warn};

/// Size of a single socket read.
const READ_CHUNK: usize = 4096;

/// One decoded record, or why it could not be decoded.
pub type RecordResult = Result<Record, ProtocolError>;

/// Errors that can occur in the client network layer.
#[derive(Debug, Error)]
pub enum ClientNetworkError {
    /// Every connection attempt to the server failed.
    #[error("failed to connect to server at {endpoint} after {attempts} attempt(s): {source}")]
    ConnectFailed {
        endpoint: String,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },
    /// An I/O error occurred on the established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A record could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// The connection was closed by the server.
    #[error("connection closed by server")]
    Closed,
}

/// How to reach the server before the session starts.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// `host:port` of the server.
    pub endpoint: String,
    /// Total connection attempts; at least one is always made.
    pub attempts: u32,
    /// Pause between attempts.
    pub retry_interval: Duration,
}

/// Connects to the server, retrying up to `options.attempts` times.
///
/// # Errors
///
/// Returns [`ClientNetworkError::ConnectFailed`] with the last I/O error once
/// all attempts are used up.
pub async fn connect_with_retry(
    options: &ConnectOptions,
) -> Result<TcpStream, ClientNetworkError> {
    let attempts = options.attempts.max(1);
    let mut attempt = 1;
    loop {
        match TcpStream::connect(options.endpoint.as_str()).await {
            Ok(stream) => {
                info!(endpoint = %options.endpoint, attempt, "connected to server");
                return Ok(stream);
            }
            Err(source) if attempt >= attempts => {
                return Err(ClientNetworkError::ConnectFailed {
                    endpoint: options.endpoint.clone(),
                    attempts,
                    source,
                });
            }
            Err(e) => {
                warn!(
                    endpoint = %options.endpoint,
                    attempt,
                    "could not connect: {e}; retrying in {:?}",
                    options.retry_interval
                );
                time::sleep(options.retry_interval).await;
                attempt += 1;
            }
        }
    }
}

/// Reads the server's byte stream and yields decoded records.
#[derive(Debug)]
pub struct RecordReader<R> {
    inner: R,
    splitter: FrameSplitter,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            splitter: FrameSplitter::new(),
            buf: vec![0; READ_CHUNK],
        }
    }

    /// Performs one read and returns every record it completed, in arrival
    /// order.  Records that fail to decode are returned as `Err` in their
    /// position so the caller can report them and carry on.  If the read
    /// also ended in unparseable stream data, a trailing `Err` follows the
    /// records completed before it.
    ///
    /// The only await point is the socket read, so dropping the returned
    /// future (e.g. in `select!`) never loses data.
    ///
    /// # Errors
    ///
    /// [`ClientNetworkError::Closed`] when the server closed the connection,
    /// [`ClientNetworkError::Io`] on a read failure.
    pub async fn next_batch(&mut self) -> Result<Vec<RecordResult>, ClientNetworkError> {
        let n = self.inner.read(&mut self.buf).await?;
        if n == 0 {
            return Err(ClientNetworkError::Closed);
        }
        let frames = self.splitter.push(&self.buf[..n]);
        let mut batch: Vec<RecordResult> = frames
            .records
            .iter()
            .map(|frame| {
                let decoded = decode_record(frame);
                if let Err(e) = &decoded {
                    warn!("dropping malformed record: {e}");
                }
                decoded
            })
            .collect();
        batch.extend(frames.error.map(Err));
        Ok(batch)
    }
}

/// Encodes records and writes them to the server.
#[derive(Debug)]
pub struct RecordWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> RecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Encodes and sends one record.
    ///
    /// # Errors
    ///
    /// [`ClientNetworkError::Protocol`] if the record cannot be encoded,
    /// [`ClientNetworkError::Io`] if the write fails.
    pub async fn send(&mut self, record: &Record) -> Result<(), ClientNetworkError> {
        let bytes = encode_record(record)?;
        self.inner.write_all(&bytes).await?;
        self.inner.flush().await?;
        debug!(kind = record.kind().wire_name(), len = bytes.len(), "record sent");
        Ok(())
    }

    /// Closes the write direction of the connection.
    pub async fn shutdown(&mut self) -> Result<(), ClientNetworkError> {
        self.inner.shutdown().await?;
        Ok(())
    }
}

/// Both halves of the server connection.
#[derive(Debug)]
pub struct ServerConnection<R, W> {
    pub reader: RecordReader<R>,
    pub writer: RecordWriter<W>,
}

impl<R: AsyncRead + Unpin, W: AsyncWrite + Unpin> ServerConnection<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: RecordReader::new(reader),
            writer: RecordWriter::new(writer),
        }
    }
}

impl ServerConnection<tcp::OwnedReadHalf, tcp::OwnedWriteHalf> {
    /// Splits a connected TCP stream into reader and writer.
    pub fn from_tcp(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self::new(read_half, write_half)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use sechat_core::RecordKind;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_reader_reassembles_records_across_reads() {
        // Arrange – one record split over two reads, a second whole one after
        let mock = Builder::new()
            .read(br#"{"type":"success","mess"#)
            .read(br#"age":"ok"}{"type":"shutdown"}"#)
            .build();
        let mut reader = RecordReader::new(mock);

        // Act
        let first = reader.next_batch().await.unwrap();
        let second = reader.next_batch().await.unwrap();

        // Assert
        assert!(first.is_empty());
        let kinds: Vec<RecordKind> = second.into_iter().map(|r| r.unwrap().kind()).collect();
        assert_eq!(kinds, vec![RecordKind::Success, RecordKind::Shutdown]);
    }

    #[tokio::test]
    async fn test_reader_reports_malformed_record_in_place() {
        let mock = Builder::new()
            .read(br#"{"type":"message","to":"bob"}{"type":"logout"}"#)
            .build();
        let mut reader = RecordReader::new(mock);
        let batch = reader.next_batch().await.unwrap();
        assert_eq!(batch.len(), 2);
        assert!(matches!(batch[0], Err(ProtocolError::Malformed(_))));
        assert_eq!(batch[1], Ok(Record::Logout));
    }

    #[tokio::test]
    async fn test_reader_keeps_records_read_before_stream_garbage() {
        // Arrange
        let mock = Builder::new()
            .read(br#"{"type":"success","message":"ok"}}garbage"#)
            .read(br#"{"type":"shutdown"}"#)
            .build();
        let mut reader = RecordReader::new(mock);

        // Act
        let first = reader.next_batch().await.unwrap();
        let second = reader.next_batch().await.unwrap();

        // Assert – the record comes first, then the framing error
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].as_ref().map(Record::kind), Ok(RecordKind::Success));
        assert!(matches!(first[1], Err(ProtocolError::Framing(_))));
        assert_eq!(second, vec![Ok(Record::Shutdown)]);
    }

    #[tokio::test]
    async fn test_reader_reports_closed_on_eof() {
        let mock = Builder::new().build();
        let mut reader = RecordReader::new(mock);
        assert!(matches!(
            reader.next_batch().await,
            Err(ClientNetworkError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_writer_sends_encoded_record() {
        // Arrange
        let mock = Builder::new()
            .write(br#"{"type":"request","request":"pubkey","message":["bob"]}"#)
            .build();
        let mut writer = RecordWriter::new(mock);

        // Act / Assert – the mock panics on any unexpected byte
        writer.send(&Record::pubkey_lookup("bob")).await.unwrap();
    }

    #[tokio::test]
    async fn test_writer_refuses_unknown_record() {
        let mock = Builder::new().build();
        let mut writer = RecordWriter::new(mock);
        assert!(matches!(
            writer.send(&Record::Unknown).await,
            Err(ClientNetworkError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_with_retry_succeeds_against_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let options = ConnectOptions {
            endpoint: listener.local_addr().unwrap().to_string(),
            attempts: 1,
            retry_interval: Duration::from_millis(10),
        };
        assert!(connect_with_retry(&options).await.is_ok());
    }

    #[tokio::test]
    async fn test_connect_with_retry_gives_up_after_attempts() {
        // Arrange – grab a free port, then close it so connects are refused
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        drop(listener);
        let options = ConnectOptions {
            endpoint,
            attempts: 2,
            retry_interval: Duration::from_millis(10),
        };

        // Act
        let result = connect_with_retry(&options).await;

        // Assert
        assert!(matches!(
            result,
            Err(ClientNetworkError::ConnectFailed { attempts: 2, .. })
        ));
    }
}
