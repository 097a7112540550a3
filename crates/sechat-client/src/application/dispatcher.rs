//! Protocol dispatcher: applies one inbound server record to the session.
//!
//! | record                  | effect                                                    |
//! |-------------------------|-----------------------------------------------------------|
//! | `pubkey` without tag    | store server key, reply with own key (once)               |
//! | `pubkey` with tag `U`   | cache `U`'s key, requeue every message waiting on `U`     |
//! | `message`               | decrypt, log as `<from>: text`, show                      |
//! | `group-message`         | decrypt, log as `<from>(group): text`, show               |
//! | `error`                 | show                                                      |
//! | `auth-error`            | show, forget the local user name                          |
//! | `InvalidUserError`      | drop every message waiting on the named user, show        |
//! | `success`               | confirm the pending user name, show                       |
//! | `group-list`            | fan the pending broadcast out to every member except self |
//! | `shutdown`              | stop                                                      |
//!
//! Unknown record types are ignored.  Every [`DispatchError`] is scoped to
//! the one record that caused it; the session stays usable.

use std::collections::BTreeSet;

use sechat_core::protocol::records::{
    DirectMessageRecord, GroupListRecord, GroupMessageRecord, NoticeRecord, PubKeyRecord,
};
use sechat_core::{CryptoError, Record, RecordKind};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::session::{ConversationKey, Group, HandshakeState, Notice, Session, SessionAction};

/// Failure to apply a single inbound record.  Never fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// A record of a known type lacks a field its handling needs.
    #[error("{kind:?} record is missing `{field}`")]
    MissingField {
        kind: RecordKind,
        field: &'static str,
    },

    /// A public key on the wire could not be imported.
    #[error("invalid public key for {owner}: {source}")]
    InvalidKey {
        owner: String,
        #[source]
        source: CryptoError,
    },

    /// An inbound message could not be decrypted with the own key.
    #[error("could not decrypt message from {from}: {source}")]
    Decrypt {
        from: String,
        #[source]
        source: CryptoError,
    },

    /// The decrypted body is not UTF-8 text.
    #[error("message from {from} is not valid UTF-8")]
    NotUtf8 { from: String },

    /// A `group-list` reply names a request id that is not outstanding.
    #[error("group-list reply for unknown request id {0}")]
    UnknownRequestId(u64),
}

/// Applies `record` to `session`.
///
/// # Errors
///
/// Returns a [`DispatchError`] if the record cannot be applied.  The
/// session is left as it was before the call.
pub fn dispatch(
    session: &mut Session,
    record: Record,
) -> Result<Vec<SessionAction>, DispatchError> {
    let kind = record.kind().wire_name();
    debug!(kind, "dispatching record");
    match record {
        Record::PubKey(p) if p.is_handshake() => handle_server_key(session, p),
        Record::PubKey(p) => handle_peer_key(session, p),
        Record::Message(m) => handle_direct_message(session, m),
        Record::GroupMessage(m) => handle_group_message(session, m),
        Record::Error(n) => Ok(vec![notify(Notice::error(format!("error: {}", n.message)))]),
        Record::AuthError(n) => Ok(handle_auth_error(session, n)),
        Record::InvalidUser(n) => Ok(handle_invalid_user(session, n)),
        Record::Success(n) => Ok(handle_success(session, n)),
        Record::GroupList(g) => handle_group_list(session, g),
        Record::Shutdown => {
            info!("server announced shutdown");
            Ok(vec![
                notify(Notice::info("server is shutting down")),
                SessionAction::Shutdown,
            ])
        }
        Record::Request(_) | Record::Logout => {
            warn!(kind, "ignoring client-only record from server");
            Ok(Vec::new())
        }
        Record::Unknown => {
            debug!("ignoring record of unknown type");
            Ok(Vec::new())
        }
    }
}

fn notify(notice: Notice) -> SessionAction {
    SessionAction::Notify(notice)
}

fn handle_server_key(
    session: &mut Session,
    record: PubKeyRecord,
) -> Result<Vec<SessionAction>, DispatchError> {
    if session.handshake != HandshakeState::Uninitialized {
        warn!("server repeated its handshake key; ignoring");
        return Ok(Vec::new());
    }
    let encoded = record.key.ok_or(DispatchError::MissingField {
        kind: RecordKind::PubKey,
        field: "key",
    })?;
    let key = session
        .crypto
        .import_public_key(&encoded)
        .map_err(|source| DispatchError::InvalidKey {
            owner: "server".to_string(),
            source,
        })?;

    session.keys.set_server_key(key);
    session.handshake = HandshakeState::ServerKeyKnown;

    let own = session
        .crypto
        .export_public_key(session.keys.own_key_pair().public());
    session.handshake = HandshakeState::Complete;
    info!("handshake complete");
    Ok(vec![SessionAction::Transmit(Record::own_key(own))])
}

fn handle_peer_key(
    session: &mut Session,
    record: PubKeyRecord,
) -> Result<Vec<SessionAction>, DispatchError> {
    let PubKeyRecord { key, tag, message } = record;
    let subject = tag.unwrap_or_default();
    let encoded = message.or(key).ok_or(DispatchError::MissingField {
        kind: RecordKind::PubKey,
        field: "message",
    })?;
    let peer_key = session
        .crypto
        .import_public_key(&encoded)
        .map_err(|source| DispatchError::InvalidKey {
            owner: subject.clone(),
            source,
        })?;

    session.keys.record_peer_key(subject.clone(), peer_key);
    let released = session.waiting.take_for(&subject);
    debug!(peer = %subject, released = released.len(), "public key received");
    for message in released {
        session.outbound.push_message(message);
    }
    Ok(Vec::new())
}

fn open(session: &Session, from: &str, ciphertext: &str) -> Result<String, DispatchError> {
    let plaintext = session
        .crypto
        .decrypt(session.keys.own_key_pair(), ciphertext)
        .map_err(|source| DispatchError::Decrypt {
            from: from.to_string(),
            source,
        })?;
    String::from_utf8(plaintext).map_err(|_| DispatchError::NotUtf8 {
        from: from.to_string(),
    })
}

fn handle_direct_message(
    session: &mut Session,
    record: DirectMessageRecord,
) -> Result<Vec<SessionAction>, DispatchError> {
    let text = open(session, &record.from, &record.message)?;
    let line = format!("<{}>: {}", record.from, text);
    session
        .logs
        .append(ConversationKey::User(record.from), line.clone());
    Ok(vec![notify(Notice::chat(line))])
}

fn handle_group_message(
    session: &mut Session,
    record: GroupMessageRecord,
) -> Result<Vec<SessionAction>, DispatchError> {
    let text = open(session, &record.from, &record.message)?;
    let line = format!("<{}>({}): {}", record.from, record.group, text);
    session
        .logs
        .append(ConversationKey::Group(record.group), line.clone());
    Ok(vec![notify(Notice::chat(line))])
}

fn handle_auth_error(session: &mut Session, record: NoticeRecord) -> Vec<SessionAction> {
    session.identity.clear();
    warn!("authentication rejected by server");
    vec![notify(Notice::error(format!(
        "authentication failed: {}",
        record.message
    )))]
}

fn handle_invalid_user(session: &mut Session, record: NoticeRecord) -> Vec<SessionAction> {
    let name = record.message;
    let dropped = session.waiting.drop_for(&name);
    debug!(user = %name, dropped, "discarding messages to unknown user");
    let text = match dropped {
        0 => format!("no such user: {name}"),
        1 => format!("no such user: {name} (1 message dropped)"),
        n => format!("no such user: {name} ({n} messages dropped)"),
    };
    vec![notify(Notice::error(text))]
}

fn handle_success(session: &mut Session, record: NoticeRecord) -> Vec<SessionAction> {
    if let Some(name) = session.identity.confirm() {
        info!(user = %name, "signed in");
    }
    vec![notify(Notice::info(record.message))]
}

fn handle_group_list(
    session: &mut Session,
    record: GroupListRecord,
) -> Result<Vec<SessionAction>, DispatchError> {
    let Some(pending) = session.tracker.resolve(record.id) else {
        warn!(id = record.id, "group-list reply does not match any request");
        return Err(DispatchError::UnknownRequestId(record.id));
    };

    let own_name = session.identity.name().map(str::to_string);
    let is_self = |member: &str| {
        member == pending.template.from || own_name.as_deref() == Some(member)
    };

    let mut seen = BTreeSet::new();
    let mut fanned_out = 0;
    for member in &record.message {
        if !seen.insert(member.clone()) || is_self(member) {
            continue;
        }
        session
            .outbound
            .push_message(pending.template.targeted_to(member.as_str()));
        fanned_out += 1;
    }
    debug!(group = %pending.group, members = seen.len(), fanned_out, "group members received");

    let group = Group {
        name: pending.group.clone(),
        members: seen,
    };
    session.groups.insert(pending.group, group);
    Ok(Vec::new())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
