//! Cryptographic provider interface and key handle types.
//!
//! The client state machine never implements a cryptographic algorithm
//! itself.  It only calls a [`CryptoProvider`], which is injected at
//! construction time.  [`SealedBoxCrypto`] is the provider used by the
//! `sechat` binary; tests may substitute their own.
//!
//! # Key handles
//!
//! [`PublicKey`] and [`KeyPair`] are *opaque* byte containers: their meaning
//! is defined entirely by the provider that created them.  The client stores
//! them, passes them back to the provider, and serializes public keys for the
//! wire through [`CryptoProvider::export_public_key`].

pub mod sealed_box;

use std::fmt;

use thiserror::Error;
use zeroize::Zeroizing;

pub use sealed_box::SealedBoxCrypto;

/// Errors reported by a [`CryptoProvider`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Key generation failed (e.g. the OS random source is unavailable).
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// A serialized public key could not be parsed.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// A ciphertext is not in the provider's wire format.
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// Encryption failed.
    #[error("encryption failed")]
    EncryptFailed,

    /// Decryption or authentication failed (wrong key or tampered data).
    #[error("decryption failed")]
    DecryptFailed,
}

/// Opaque public key handle.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    /// Wraps provider-specific public key bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Provider-specific public key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short fingerprint is enough to tell keys apart in logs.
        let prefix: String = hex::encode(&self.0).chars().take(16).collect();
        write!(f, "PublicKey({prefix}…)")
    }
}

/// The client's own asymmetric key pair.
///
/// Owned exclusively by the key store; deliberately not `Clone`.  The secret
/// half is wiped from memory when the pair is dropped.
pub struct KeyPair {
    public: PublicKey,
    secret: Zeroizing<Vec<u8>>,
}

impl KeyPair {
    /// Assembles a key pair from provider-specific parts.
    pub fn from_parts(public: PublicKey, secret: Vec<u8>) -> Self {
        Self {
            public,
            secret: Zeroizing::new(secret),
        }
    }

    /// The public half.
    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    /// Provider-specific secret key bytes.
    pub fn secret_bytes(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Asymmetric cryptography used by the chat client.
///
/// Implementations must be usable from the client's event loop, which
/// borrows the provider immutably for every operation.
pub trait CryptoProvider: Send + Sync {
    /// Generates a fresh key pair.  Called once at startup.
    fn generate_key_pair(&self) -> Result<KeyPair, CryptoError>;

    /// Encrypts `plaintext` so that only the holder of `recipient`'s secret
    /// key can read it.  Returns the wire (text) form of the ciphertext.
    fn encrypt(&self, recipient: &PublicKey, plaintext: &[u8]) -> Result<String, CryptoError>;

    /// Decrypts a wire-form ciphertext addressed to `own`.
    fn decrypt(&self, own: &KeyPair, ciphertext: &str) -> Result<Vec<u8>, CryptoError>;

    /// One-way password digest, in text form.  The result is secret material
    /// and is wiped when dropped.
    fn digest_password(&self, password: &str) -> Zeroizing<String>;

    /// Serializes a public key for the wire.
    fn export_public_key(&self, key: &PublicKey) -> String;

    /// Parses a public key received from the wire.
    fn import_public_key(&self, encoded: &str) -> Result<PublicKey, CryptoError>;
}
