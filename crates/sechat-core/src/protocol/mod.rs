//! Protocol module containing record types, the JSON codec, stream framing,
//! and the request id counter.

pub mod codec;
pub mod framing;
pub mod records;
pub mod request_id;

pub use codec::{decode_record, encode_record, ProtocolError};
pub use framing::{FrameSplitter, Frames};
pub use records::*;
pub use request_id::RequestIdCounter;
