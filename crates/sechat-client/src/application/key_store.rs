//! Key store: the client's own key pair, the server's key and a cache of
//! other users' public keys.

use std::collections::HashMap;

use sechat_core::{CryptoError, CryptoProvider, KeyPair, PublicKey};
use tracing::{debug, warn};

/// All asymmetric keys known to one client session.
///
/// The peer cache only grows; keys are never evicted during a session.
#[derive(Debug)]
pub struct KeyStore {
    own: KeyPair,
    server: Option<PublicKey>,
    peers: HashMap<String, PublicKey>,
}

impl KeyStore {
    /// Wraps an already generated key pair.
    pub fn new(own: KeyPair) -> Self {
        Self {
            own,
            server: None,
            peers: HashMap::new(),
        }
    }

    /// Generates the client's own key pair through `crypto`.
    ///
    /// # Errors
    ///
    /// Propagates the provider's [`CryptoError`]; callers treat it as fatal.
    pub fn generate(crypto: &dyn CryptoProvider) -> Result<Self, CryptoError> {
        Ok(Self::new(crypto.generate_key_pair()?))
    }

    /// The client's own key pair.
    pub fn own_key_pair(&self) -> &KeyPair {
        &self.own
    }

    /// The server's public key, once the handshake has delivered it.
    pub fn server_key(&self) -> Option<&PublicKey> {
        self.server.as_ref()
    }

    /// Stores the server key.  First write wins: returns `false` and leaves
    /// the stored key untouched if one is already present.
    pub fn set_server_key(&mut self, key: PublicKey) -> bool {
        if self.server.is_some() {
            warn!("server public key already set; ignoring replacement");
            return false;
        }
        debug!(?key, "server public key stored");
        self.server = Some(key);
        true
    }

    /// Inserts or replaces the public key of `name`.  Returns the previous
    /// key, if any.
    pub fn record_peer_key(
        &mut self,
        name: impl Into<String>,
        key: PublicKey,
    ) -> Option<PublicKey> {
        let name = name.into();
        debug!(peer = %name, ?key, "peer public key stored");
        self.peers.insert(name, key)
    }

    /// Cached public key of `name`.
    pub fn lookup_peer_key(&self, name: &str) -> Option<&PublicKey> {
        self.peers.get(name)
    }

    /// Number of cached peer keys.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}
