//! Sealed-box [`CryptoProvider`]: X25519 + HKDF-SHA256 + ChaCha20-Poly1305.
//!
//! # How a sealed box works (for beginners)
//!
//! Every user has a long-term X25519 key pair.  To send a message to Bob,
//! the sender:
//!
//! 1. Generates a throw-away (ephemeral) X25519 key pair.
//! 2. Runs Diffie-Hellman between the ephemeral secret and Bob's public key,
//!    giving a shared secret only the sender and Bob can compute.
//! 3. Stretches the shared secret with HKDF into a 32-byte AEAD key and a
//!    12-byte nonce.
//! 4. Encrypts the message with ChaCha20-Poly1305 and ships
//!    `ephemeral_public || ciphertext`.
//!
//! Bob repeats step 2 with *his* secret and the shipped ephemeral public key,
//! derives the same key and nonce, and decrypts.  Because every message uses
//! a new ephemeral key, the key/nonce pair is never reused.
//!
//! # Wire encoding
//!
//! | value       | text form                                            |
//! |-------------|------------------------------------------------------|
//! | public key  | lowercase hex of the 32 raw bytes                    |
//! | ciphertext  | lowercase hex of `ephemeral_public(32) ‖ aead_out`   |
//! | password    | lowercase hex of SHA-512(password)                   |

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use hkdf::Hkdf;
use rand_core::OsRng;
use sha2::{Digest, Sha256, Sha512};
use x25519_dalek::{EphemeralSecret, PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

use super::{CryptoError, CryptoProvider, KeyPair, PublicKey};

/// Length of an X25519 key in bytes.
pub const KEY_LEN: usize = 32;

/// Poly1305 authentication tag length in bytes.
const TAG_LEN: usize = 16;

const KDF_KEY_LABEL: &[u8] = b"sechat_sealed_box_v1_key";
const KDF_NONCE_LABEL: &[u8] = b"sechat_sealed_box_v1_nonce";

/// Default provider used by the `sechat` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct SealedBoxCrypto;

impl SealedBoxCrypto {
    /// Creates the provider.  It holds no state.
    pub fn new() -> Self {
        Self
    }
}

/// Derives the AEAD key and nonce from a DH shared secret.
///
/// Both public keys are mixed into the salt so a ciphertext is bound to the
/// exact sender-ephemeral / recipient pair it was made for.
fn kdf_key_nonce(
    shared_secret: &[u8; KEY_LEN],
    ephemeral_pub: &[u8; KEY_LEN],
    recipient_pub: &[u8; KEY_LEN],
) -> Result<(Zeroizing<[u8; 32]>, [u8; 12]), CryptoError> {
    let mut salt = [0u8; 2 * KEY_LEN];
    salt[..KEY_LEN].copy_from_slice(ephemeral_pub);
    salt[KEY_LEN..].copy_from_slice(recipient_pub);

    let hk = Hkdf::<Sha256>::new(Some(&salt), shared_secret);

    let mut key = Zeroizing::new([0u8; 32]);
    hk.expand(KDF_KEY_LABEL, key.as_mut())
        .map_err(|_| CryptoError::EncryptFailed)?;

    let mut nonce = [0u8; 12];
    hk.expand(KDF_NONCE_LABEL, &mut nonce)
        .map_err(|_| CryptoError::EncryptFailed)?;

    Ok((key, nonce))
}

fn key_array(bytes: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
    bytes.try_into().map_err(|_| {
        CryptoError::InvalidPublicKey(format!("expected {KEY_LEN} bytes, got {}", bytes.len()))
    })
}

impl CryptoProvider for SealedBoxCrypto {
    fn generate_key_pair(&self) -> Result<KeyPair, CryptoError> {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = X25519PublicKey::from(&secret);
        Ok(KeyPair::from_parts(
            PublicKey::from_bytes(public.as_bytes().to_vec()),
            secret.to_bytes().to_vec(),
        ))
    }

    fn encrypt(&self, recipient: &PublicKey, plaintext: &[u8]) -> Result<String, CryptoError> {
        let recipient_bytes = key_array(recipient.as_bytes())?;
        let recipient_pub = X25519PublicKey::from(recipient_bytes);

        let ephemeral = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_pub = X25519PublicKey::from(&ephemeral);
        let shared = ephemeral.diffie_hellman(&recipient_pub);

        let (key, nonce) =
            kdf_key_nonce(shared.as_bytes(), ephemeral_pub.as_bytes(), &recipient_bytes)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_ref()));
        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: ephemeral_pub.as_bytes(),
                },
            )
            .map_err(|_| CryptoError::EncryptFailed)?;

        let mut out = Vec::with_capacity(KEY_LEN + ciphertext.len());
        out.extend_from_slice(ephemeral_pub.as_bytes());
        out.extend_from_slice(&ciphertext);
        Ok(hex::encode(out))
    }

    fn decrypt(&self, own: &KeyPair, ciphertext: &str) -> Result<Vec<u8>, CryptoError> {
        let blob = hex::decode(ciphertext.trim())
            .map_err(|e| CryptoError::MalformedCiphertext(e.to_string()))?;
        if blob.len() < KEY_LEN + TAG_LEN {
            return Err(CryptoError::MalformedCiphertext(format!(
                "need at least {} bytes, got {}",
                KEY_LEN + TAG_LEN,
                blob.len()
            )));
        }
        let (ephemeral_bytes, sealed) = blob.split_at(KEY_LEN);
        let ephemeral_bytes = key_array(ephemeral_bytes)?;
        let own_public = key_array(own.public().as_bytes())?;

        let secret_bytes = Zeroizing::new(
            <[u8; KEY_LEN]>::try_from(own.secret_bytes()).map_err(|_| CryptoError::DecryptFailed)?,
        );
        let secret = StaticSecret::from(*secret_bytes);
        let shared = secret.diffie_hellman(&X25519PublicKey::from(ephemeral_bytes));

        let (key, nonce) = kdf_key_nonce(shared.as_bytes(), &ephemeral_bytes, &own_public)
            .map_err(|_| CryptoError::DecryptFailed)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_ref()));
        cipher
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: sealed,
                    aad: &ephemeral_bytes,
                },
            )
            .map_err(|_| CryptoError::DecryptFailed)
    }

    fn digest_password(&self, password: &str) -> Zeroizing<String> {
        let digest = Sha512::digest(password.as_bytes());
        Zeroizing::new(hex::encode(digest))
    }

    fn export_public_key(&self, key: &PublicKey) -> String {
        hex::encode(key.as_bytes())
    }

    fn import_public_key(&self, encoded: &str) -> Result<PublicKey, CryptoError> {
        let bytes =
            hex::decode(encoded.trim()).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        key_array(&bytes)?;
        Ok(PublicKey::from_bytes(bytes))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> SealedBoxCrypto {
        SealedBoxCrypto::new()
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        // Arrange
        let crypto = provider();
        let bob = crypto.generate_key_pair().unwrap();

        // Act
        let ct = crypto.encrypt(bob.public(), b"hello bob").unwrap();
        let pt = crypto.decrypt(&bob, &ct).unwrap();

        // Assert
        assert_eq!(pt, b"hello bob");
    }

    #[test]
    fn test_round_trip_of_empty_and_multibyte_bodies() {
        let crypto = provider();
        let bob = crypto.generate_key_pair().unwrap();
        for body in ["", "héllo wörld", "日本語のメッセージ", "emoji 🔐🗝️"] {
            let ct = crypto.encrypt(bob.public(), body.as_bytes()).unwrap();
            let pt = crypto.decrypt(&bob, &ct).unwrap();
            assert_eq!(String::from_utf8(pt).unwrap(), body);
        }
    }

    #[test]
    fn test_ciphertext_is_not_plaintext_and_is_randomised() {
        let crypto = provider();
        let bob = crypto.generate_key_pair().unwrap();
        let a = crypto.encrypt(bob.public(), b"same").unwrap();
        let b = crypto.encrypt(bob.public(), b"same").unwrap();
        assert_ne!(a, b, "fresh ephemeral key per message");
        assert!(!a.contains(&hex::encode(b"same")));
    }

    #[test]
    fn test_wrong_recipient_cannot_decrypt() {
        let crypto = provider();
        let bob = crypto.generate_key_pair().unwrap();
        let eve = crypto.generate_key_pair().unwrap();
        let ct = crypto.encrypt(bob.public(), b"for bob only").unwrap();
        assert_eq!(crypto.decrypt(&eve, &ct), Err(CryptoError::DecryptFailed));
    }

    #[test]
    fn test_tampered_ciphertext_is_rejected() {
        let crypto = provider();
        let bob = crypto.generate_key_pair().unwrap();
        let ct = crypto.encrypt(bob.public(), b"integrity").unwrap();
        let mut bytes = hex::decode(&ct).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        assert_eq!(
            crypto.decrypt(&bob, &hex::encode(bytes)),
            Err(CryptoError::DecryptFailed)
        );
    }

    #[test]
    fn test_non_hex_ciphertext_is_malformed() {
        let crypto = provider();
        let bob = crypto.generate_key_pair().unwrap();
        assert!(matches!(
            crypto.decrypt(&bob, "not hex!"),
            Err(CryptoError::MalformedCiphertext(_))
        ));
    }

    #[test]
    fn test_short_ciphertext_is_malformed() {
        let crypto = provider();
        let bob = crypto.generate_key_pair().unwrap();
        assert!(matches!(
            crypto.decrypt(&bob, &hex::encode([0u8; 40])),
            Err(CryptoError::MalformedCiphertext(_))
        ));
    }

    #[test]
    fn test_public_key_export_import_round_trip() {
        let crypto = provider();
        let pair = crypto.generate_key_pair().unwrap();
        let exported = crypto.export_public_key(pair.public());
        assert_eq!(exported.len(), 2 * KEY_LEN);
        assert_eq!(&crypto.import_public_key(&exported).unwrap(), pair.public());
    }

    #[test]
    fn test_import_rejects_wrong_length_and_non_hex() {
        let crypto = provider();
        assert!(matches!(
            crypto.import_public_key("abcd"),
            Err(CryptoError::InvalidPublicKey(_))
        ));
        assert!(matches!(
            crypto.import_public_key("-----BEGIN PUBLIC KEY-----"),
            Err(CryptoError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_password_digest_is_sha512_hex() {
        // SHA-512("abc") from FIPS 180-2.
        let digest = provider().digest_password("abc");
        assert_eq!(
            digest.as_str(),
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
             2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
        );
    }
}
