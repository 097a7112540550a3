//! The client's protocol state and the outbound drain algorithm.
//!
//! # One session, one owner (for beginners)
//!
//! [`Session`] bundles every piece of mutable client state: keys, identity,
//! pending lookups, the outbound queue, conversation logs and the group
//! roster cache.  The event loop owns the only `Session` and lends it out as
//! `&mut` to the dispatcher and command handlers, one operation at a time.
//! There is no global state and no locking.
//!
//! Operations never perform I/O themselves.  They return
//! [`SessionAction`]s and the event loop carries them out: write a record to
//! the socket, print a notice, or stop.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use sechat_core::{CryptoError, CryptoProvider, Record};
use tracing::{debug, warn};

use super::key_store::KeyStore;
use super::outbound::{MessageKind, OutboundItem, OutboundQueue, OutgoingMessage};
use super::pending::{KeyWaitList, PendingRequestTracker};

// ── Actions and notices ───────────────────────────────────────────────────────

/// Severity of a user-facing [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// A decrypted chat line.
    Chat,
    /// Informational output (confirmations, history listings).
    Info,
    /// Something went wrong; the session carries on.
    Error,
}

/// A line of text for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn chat(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Chat,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Side effect requested by a session operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Write this record to the server.
    Transmit(Record),
    /// Show this notice to the user.
    Notify(Notice),
    /// Stop the event loop.
    Shutdown,
}

// ── Conversation state ────────────────────────────────────────────────────────

/// Key of a conversation log.  Users and groups live in separate spaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConversationKey {
    User(String),
    Group(String),
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationKey::User(name) => write!(f, "{name}"),
            ConversationKey::Group(name) => write!(f, "#{name}"),
        }
    }
}

/// Append-only, in-memory chat history per conversation.
#[derive(Debug, Default)]
pub struct ConversationLog {
    lines: HashMap<ConversationKey, Vec<String>>,
}

impl ConversationLog {
    pub fn append(&mut self, key: ConversationKey, line: impl Into<String>) {
        self.lines.entry(key).or_default().push(line.into());
    }

    /// Lines of `key`, oldest first.  Empty if nothing was logged.
    pub fn lines(&self, key: &ConversationKey) -> &[String] {
        self.lines.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Client-side snapshot of a group's members from the latest `group-list`
/// reply.  Never authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub members: BTreeSet<String>,
}

/// Handshake progress.  Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Uninitialized,
    ServerKeyKnown,
    Complete,
}

/// The local user's name.
///
/// `pending` holds the name sent in the latest `/register` or `/login` until
/// the server confirms it with `success`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Identity {
    name: Option<String>,
    pending: Option<String>,
}

impl Identity {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub(crate) fn set_pending(&mut self, name: impl Into<String>) {
        self.pending = Some(name.into());
    }

    /// Makes the pending name active.  Returns the new active name.
    pub(crate) fn confirm(&mut self) -> Option<&str> {
        if let Some(name) = self.pending.take() {
            self.name = Some(name);
        }
        self.name.as_deref()
    }

    pub(crate) fn clear(&mut self) {
        self.name = None;
        self.pending = None;
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// All mutable state of one client connection.
pub struct Session {
    pub(crate) crypto: Arc<dyn CryptoProvider>,
    pub(crate) keys: KeyStore,
    pub(crate) identity: Identity,
    pub(crate) handshake: HandshakeState,
    pub(crate) tracker: PendingRequestTracker,
    pub(crate) waiting: KeyWaitList,
    pub(crate) outbound: OutboundQueue,
    pub(crate) logs: ConversationLog,
    pub(crate) groups: HashMap<String, Group>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("keys", &self.keys)
            .field("identity", &self.identity)
            .field("handshake", &self.handshake)
            .field("pending_group_lookups", &self.tracker.len())
            .field("waiting_for_keys", &self.waiting.len())
            .field("outbound", &self.outbound.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session and generates the client's own key pair.
    ///
    /// # Errors
    ///
    /// Returns the provider's [`CryptoError`] if key generation fails.
    pub fn new(crypto: Arc<dyn CryptoProvider>) -> Result<Self, CryptoError> {
        let keys = KeyStore::generate(crypto.as_ref())?;
        Ok(Self {
            crypto,
            keys,
            identity: Identity::default(),
            handshake: HandshakeState::Uninitialized,
            tracker: PendingRequestTracker::new(),
            waiting: KeyWaitList::new(),
            outbound: OutboundQueue::new(),
            logs: ConversationLog::default(),
            groups: HashMap::new(),
        })
    }

    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn handshake(&self) -> HandshakeState {
        self.handshake
    }

    pub fn tracker(&self) -> &PendingRequestTracker {
        &self.tracker
    }

    pub fn wait_list(&self) -> &KeyWaitList {
        &self.waiting
    }

    pub fn outbound(&self) -> &OutboundQueue {
        &self.outbound
    }

    pub fn logs(&self) -> &ConversationLog {
        &self.logs
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    /// Name used as `from` on outgoing messages.  Empty before login.
    pub(crate) fn sender_name(&self) -> String {
        self.identity.name().unwrap_or_default().to_string()
    }

    /// Queues a chat message for resolution and transmission.
    pub fn enqueue(&mut self, message: OutgoingMessage) {
        self.outbound.push_message(message);
    }

    /// Drains the outbound queue to empty.
    ///
    /// For each item, in order:
    ///
    /// 1. A raw record is transmitted as is.
    /// 2. A group broadcast is filed in the tracker under a fresh request id
    ///    and replaced by a `group-list` request.
    /// 3. A message whose recipient key is unknown is parked in the key wait
    ///    list; a `pubkey` lookup is emitted only for the first message
    ///    parked behind each name.
    /// 4. Otherwise the body is encrypted with the recipient's key and the
    ///    resulting record transmitted.  An encryption failure drops that
    ///    message with an error notice; draining continues.
    pub fn drain_outbound(&mut self) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        while let Some(item) = self.outbound.pop() {
            match item {
                OutboundItem::Raw(record) => actions.push(SessionAction::Transmit(record)),
                OutboundItem::Message(message) => self.resolve_message(message, &mut actions),
            }
        }
        actions
    }

    fn resolve_message(&mut self, message: OutgoingMessage, actions: &mut Vec<SessionAction>) {
        if message.kind == MessageKind::GroupBroadcast {
            let group = message.group.clone().unwrap_or_default();
            let from = message.from.clone();
            let Some(id) = self.tracker.issue(group.clone(), message) else {
                warn!(%group, "request ids exhausted; group message dropped");
                actions.push(SessionAction::Notify(Notice::error(format!(
                    "could not send to #{group}: request ids exhausted"
                ))));
                return;
            };
            debug!(%group, id, "requesting group members");
            actions.push(SessionAction::Transmit(Record::group_list_request(
                group, id, from,
            )));
            return;
        }

        let Some(to) = message.recipient().map(str::to_string) else {
            warn!(?message, "dropping outgoing message without a recipient");
            return;
        };

        let Some(key) = self.keys.lookup_peer_key(&to) else {
            if self.waiting.park(message) {
                debug!(peer = %to, "requesting public key");
                actions.push(SessionAction::Transmit(Record::pubkey_lookup(to)));
            }
            return;
        };

        let sealed = self
            .crypto
            .encrypt(key, message.body.as_bytes())
            .map(|ciphertext| message.seal(ciphertext));
        match sealed {
            Ok(Some(record)) => actions.push(SessionAction::Transmit(record)),
            Ok(None) => warn!(?message, "message cannot be sealed"),
            Err(e) => {
                warn!(peer = %to, error = %e, "encryption failed; message dropped");
                actions.push(SessionAction::Notify(Notice::error(format!(
                    "could not encrypt message to {to}: {e}"
                ))));
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
