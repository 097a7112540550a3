//! JSON codec for encoding and decoding sechat protocol records.
//!
//! Wire format: one JSON object per record, UTF-8, no delimiter between
//! consecutive records.  Stream delimiting is the job of
//! [`crate::protocol::FrameSplitter`]; this module only deals with a single,
//! already-delimited record.

use thiserror::Error;

use crate::protocol::records::{Record, RecordKind};

/// Errors that can occur during record encoding, decoding or framing.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The bytes are not a valid JSON record (bad JSON, missing `"type"`,
    /// missing or mistyped fields for a known type).
    #[error("malformed record: {0}")]
    Malformed(String),

    /// The record cannot be put on the wire (e.g. [`Record::Unknown`]).
    #[error("record of kind {0:?} cannot be encoded")]
    Unencodable(RecordKind),

    /// The byte stream is not a sequence of JSON objects; buffered data was
    /// discarded.
    #[error("framing error: {0}")]
    Framing(String),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`Record`] into its JSON wire bytes.
///
/// # Errors
///
/// Returns [`ProtocolError::Unencodable`] for [`Record::Unknown`], or
/// [`ProtocolError::Malformed`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use sechat_core::protocol::{decode_record, encode_record, Record};
///
/// let bytes = encode_record(&Record::Logout).unwrap();
/// assert_eq!(bytes, br#"{"type":"logout"}"#);
/// assert_eq!(decode_record(&bytes).unwrap(), Record::Logout);
/// ```
pub fn encode_record(record: &Record) -> Result<Vec<u8>, ProtocolError> {
    if let Record::Unknown = record {
        return Err(ProtocolError::Unencodable(RecordKind::Unknown));
    }
    serde_json::to_vec(record).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

/// Decodes one [`Record`] from a complete serialized record.
///
/// Surrounding whitespace is tolerated.  An object whose `"type"` is not
/// recognised decodes to [`Record::Unknown`].
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] if the bytes are not a valid record.
pub fn decode_record(bytes: &[u8]) -> Result<Record, ProtocolError> {
    serde_json::from_slice(bytes).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
