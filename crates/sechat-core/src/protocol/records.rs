//! All sechat wire record types.
//!
//! Every record is a JSON object whose `"type"` field selects the variant.
//! The remaining fields depend on the type:
//!
//! ```json
//! {"type":"pubkey","key":"9f86d0..."}
//! {"type":"pubkey","tag":"bob","message":"3a7bd3..."}
//! {"type":"request","request":"pubkey","message":["bob"]}
//! {"type":"request","request":"group-list","group":"team","id":0,"from":"alice"}
//! {"type":"message","to":"bob","from":"alice","message":"<ciphertext>"}
//! {"type":"group-message","group":"team","from":"alice","to":"bob","message":"<ciphertext>"}
//! {"type":"group-list","id":0,"message":["alice","bob"]}
//! {"type":"error","message":"..."}
//! {"type":"shutdown"}
//! ```
//!
//! Serde's `#[serde(tag = "type")]` attribute handles the discriminant.  A
//! `"type"` value this client does not know deserializes to
//! [`Record::Unknown`] instead of failing, so a newer server can add record
//! types without breaking older clients.

use serde::{Deserialize, Serialize};

// ── Record discriminant ───────────────────────────────────────────────────────

/// Fieldless discriminant of a [`Record`], used for logging and matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    PubKey,
    Request,
    Message,
    GroupMessage,
    GroupList,
    Error,
    AuthError,
    InvalidUser,
    Success,
    Shutdown,
    Logout,
    Unknown,
}

impl RecordKind {
    /// Returns the `"type"` string used on the wire for this kind.
    pub fn wire_name(self) -> &'static str {
        match self {
            RecordKind::PubKey => "pubkey",
            RecordKind::Request => "request",
            RecordKind::Message => "message",
            RecordKind::GroupMessage => "group-message",
            RecordKind::GroupList => "group-list",
            RecordKind::Error => "error",
            RecordKind::AuthError => "auth-error",
            RecordKind::InvalidUser => "InvalidUserError",
            RecordKind::Success => "success",
            RecordKind::Shutdown => "shutdown",
            RecordKind::Logout => "logout",
            RecordKind::Unknown => "unknown",
        }
    }
}

// ── Top-level record ──────────────────────────────────────────────────────────

/// One self-delimited protocol record exchanged with the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Record {
    /// Public key distribution: the server handshake (untagged), the client's
    /// handshake reply, or a lookup reply tagged with the key owner's name.
    #[serde(rename = "pubkey")]
    PubKey(PubKeyRecord),

    /// Client → server request (key lookup, group roster, authentication).
    #[serde(rename = "request")]
    Request(RequestRecord),

    /// Direct user-to-user message with an encrypted body.
    #[serde(rename = "message")]
    Message(DirectMessageRecord),

    /// Group message with an encrypted body.
    #[serde(rename = "group-message")]
    GroupMessage(GroupMessageRecord),

    /// Reply to a `group-list` request.
    #[serde(rename = "group-list")]
    GroupList(GroupListRecord),

    /// Generic server-reported error.
    #[serde(rename = "error")]
    Error(NoticeRecord),

    /// Authentication failure; the client must log in again.
    #[serde(rename = "auth-error")]
    AuthError(NoticeRecord),

    /// The server has no such user.  `message` carries the user name.
    #[serde(rename = "InvalidUserError")]
    InvalidUser(NoticeRecord),

    /// Register/login confirmation.
    #[serde(rename = "success")]
    Success(NoticeRecord),

    /// The server is going away.
    #[serde(rename = "shutdown")]
    Shutdown,

    /// The client is leaving.
    #[serde(rename = "logout")]
    Logout,

    /// Any `"type"` this client does not recognise.
    #[serde(other)]
    Unknown,
}

impl Record {
    /// Returns the fieldless discriminant of this record.
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::PubKey(_) => RecordKind::PubKey,
            Record::Request(_) => RecordKind::Request,
            Record::Message(_) => RecordKind::Message,
            Record::GroupMessage(_) => RecordKind::GroupMessage,
            Record::GroupList(_) => RecordKind::GroupList,
            Record::Error(_) => RecordKind::Error,
            Record::AuthError(_) => RecordKind::AuthError,
            Record::InvalidUser(_) => RecordKind::InvalidUser,
            Record::Success(_) => RecordKind::Success,
            Record::Shutdown => RecordKind::Shutdown,
            Record::Logout => RecordKind::Logout,
            Record::Unknown => RecordKind::Unknown,
        }
    }

    /// Builds the client's handshake reply carrying its own public key.
    pub fn own_key(encoded_key: impl Into<String>) -> Self {
        Record::PubKey(PubKeyRecord {
            key: Some(encoded_key.into()),
            tag: None,
            message: None,
        })
    }

    /// Builds a public-key lookup request for `name`.
    pub fn pubkey_lookup(name: impl Into<String>) -> Self {
        Record::Request(RequestRecord::PubKey {
            message: vec![name.into()],
        })
    }

    /// Builds a group roster request correlated by `id`.
    pub fn group_list_request(group: impl Into<String>, id: u64, from: impl Into<String>) -> Self {
        Record::Request(RequestRecord::GroupList {
            group: group.into(),
            id,
            from: from.into(),
        })
    }
}

// ── Per-record payload structs ────────────────────────────────────────────────

/// Payload of a `pubkey` record.
///
/// The same `"type"` is used in three directions, told apart by which
/// optional fields are present:
///
/// | direction                 | `key` | `tag`  | `message` |
/// |---------------------------|-------|--------|-----------|
/// | server handshake          | yes   | –      | –         |
/// | client handshake reply    | yes   | –      | –         |
/// | server lookup reply       | –     | name   | key       |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKeyRecord {
    /// Serialized public key (handshake direction).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Name of the key owner (lookup reply direction).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Serialized public key (lookup reply direction).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PubKeyRecord {
    /// `true` for the server's handshake record (no subject tag).
    pub fn is_handshake(&self) -> bool {
        self.tag.is_none()
    }
}

/// Client → server requests, discriminated by the `"request"` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request")]
pub enum RequestRecord {
    /// Ask the server for the public key of `message[0]`.
    #[serde(rename = "pubkey")]
    PubKey { message: Vec<String> },

    /// Ask the server for the members of `group`.
    #[serde(rename = "group-list")]
    GroupList { group: String, id: u64, from: String },

    /// Create an account: `message = [username, encrypted password digest]`.
    #[serde(rename = "register")]
    Register { message: Vec<String> },

    /// Log in: `message = [username, encrypted password digest]`.
    #[serde(rename = "login")]
    Login { message: Vec<String> },
}

/// Direct message.  `message` is always ciphertext on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessageRecord {
    #[serde(default)]
    pub to: String,
    pub from: String,
    pub message: String,
}

/// Group message.  `to` names the member this copy is encrypted for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMessageRecord {
    pub group: String,
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub message: String,
}

/// Group roster reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupListRecord {
    /// Echo of the request id this reply answers.
    pub id: u64,
    /// Member names.
    #[serde(default)]
    pub message: Vec<String>,
}

/// Text-only server notice (`error`, `auth-error`, `InvalidUserError`, `success`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeRecord {
    #[serde(default)]
    pub message: String,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
