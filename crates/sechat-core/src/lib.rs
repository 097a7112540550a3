//! # sechat-core
//!
//! Shared library for sechat containing the wire record types, the record
//! codec, the stream framing layer, and the cryptographic provider.
//!
//! This crate has zero dependencies on sockets, terminals, or async runtimes.
//! The client state machine in `sechat-client` is built on top of it.
//!
//! # Architecture overview (for beginners)
//!
//! sechat is an end-to-end encrypted chat protocol.  A central server relays
//! records between users, but it never sees message plaintext: every chat
//! message is encrypted with the *recipient's* public key before it leaves
//! the sender.
//!
//! This crate defines:
//!
//! - **`protocol`** – How records travel over the network.  Each record is a
//!   JSON object with a `"type"` field.  The [`FrameSplitter`] cuts a raw TCP
//!   byte stream back into individual records, and the codec turns each one
//!   into a typed [`Record`].
//!
//! - **`crypto`** – The [`CryptoProvider`] trait (key generation, asymmetric
//!   encryption, password digesting) and [`SealedBoxCrypto`], the default
//!   implementation built from X25519, HKDF-SHA256 and ChaCha20-Poly1305.

pub mod crypto;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `sechat_core::Record` instead of `sechat_core::protocol::records::Record`.
pub use crypto::{CryptoError, CryptoProvider, KeyPair, PublicKey, SealedBoxCrypto};
pub use protocol::codec::{decode_record, encode_record, ProtocolError};
pub use protocol::framing::{FrameSplitter, Frames};
pub use protocol::records::{Record, RecordKind};
