//! Stream framing: cutting a TCP byte stream back into whole records.
//!
//! # Why is framing needed? (for beginners)
//!
//! TCP delivers a *stream* of bytes, not a sequence of messages.  If the
//! server writes two records back to back, a single `read()` may return both
//! of them glued together, or only the first half of one.  The reader has to
//! reassemble the original record boundaries itself.
//!
//! sechat records are JSON objects written one after another with no length
//! prefix or delimiter, e.g.
//!
//! ```text
//! {"type":"success","message":"ok"}{"type":"pubkey","tag":"bob","mes
//! ```
//!
//! [`FrameSplitter`] keeps an internal buffer.  Each call to
//! [`FrameSplitter::push`] appends a new chunk and returns every *complete*
//! JSON object found so far; a trailing partial object stays buffered until
//! the rest of it arrives.

use serde::de::IgnoredAny;
use tracing::warn;

use crate::protocol::codec::ProtocolError;

/// Upper bound on buffered, still-incomplete record bytes.
///
/// A peer that never closes its JSON object would otherwise grow the buffer
/// without limit.
pub const MAX_PENDING_BYTES: usize = 1 << 20;

/// The outcome of one [`FrameSplitter::push`].
#[derive(Debug, Default, PartialEq)]
pub struct Frames {
    /// Complete records, in arrival order.
    pub records: Vec<Vec<u8>>,
    /// Set when unparseable or oversized data was discarded after `records`.
    pub error: Option<ProtocolError>,
}

/// Reassembles complete serialized records from arbitrarily chunked input.
#[derive(Debug, Default)]
pub struct FrameSplitter {
    buffer: Vec<u8>,
}

impl FrameSplitter {
    /// Creates an empty splitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes currently buffered (an incomplete trailing record).
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Appends `chunk` and returns every complete record now available, in
    /// arrival order.  Each returned slice is one whole JSON value.
    ///
    /// If the buffered bytes stop being valid JSON, or an incomplete record
    /// grows past [`MAX_PENDING_BYTES`], the rest of the buffer is discarded
    /// and [`Frames::error`] is set to [`ProtocolError::Framing`].  Records
    /// completed before the bad data are still returned, and the stream
    /// resynchronises on the next chunk.
    pub fn push(&mut self, chunk: &[u8]) -> Frames {
        self.buffer.extend_from_slice(chunk);

        let mut records = Vec::new();
        let mut consumed = 0;
        let mut failure = None;
        {
            let mut stream =
                serde_json::Deserializer::from_slice(&self.buffer).into_iter::<IgnoredAny>();
            loop {
                match stream.next() {
                    Some(Ok(IgnoredAny)) => {
                        let end = stream.byte_offset();
                        records.push(trim_ascii_whitespace(&self.buffer[consumed..end]).to_vec());
                        consumed = end;
                    }
                    // Partial trailing record: wait for more bytes.
                    Some(Err(e)) if e.is_eof() => break,
                    Some(Err(e)) => {
                        failure = Some(e);
                        break;
                    }
                    None => break,
                }
            }
        }

        if let Some(e) = failure {
            warn!(
                error = %e,
                discarded = self.buffer.len() - consumed,
                "discarding unparseable stream data"
            );
            self.buffer.clear();
            return Frames {
                records,
                error: Some(ProtocolError::Framing(e.to_string())),
            };
        }

        self.buffer.drain(..consumed);
        if self.buffer.iter().all(u8::is_ascii_whitespace) {
            self.buffer.clear();
        }

        let error = (self.buffer.len() > MAX_PENDING_BYTES).then(|| {
            let len = self.buffer.len();
            self.buffer.clear();
            ProtocolError::Framing(format!(
                "incomplete record exceeds {MAX_PENDING_BYTES} bytes ({len} buffered)"
            ))
        });

        Frames { records, error }
    }
}

fn trim_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

// ── Tests ─────────────────────────────────────────────────────────────────────
