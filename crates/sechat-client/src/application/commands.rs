//! Local `/` commands: parsing a line of user input and applying it.
//!
//! | command                        | effect                                         |
//! |--------------------------------|------------------------------------------------|
//! | `/msg <user> <text>`           | queue a direct message                         |
//! | `/gmsg <group> <text>`         | queue a message to every member of a group     |
//! | `/register <user> <password>`  | create an account                              |
//! | `/login <user> <password>`     | sign in                                        |
//! | `/history <user>`              | print the conversation with a user             |
//! | `/history #<group>`            | print the conversation in a group              |
//! | `/exit`                        | log out and quit                               |
//!
//! Command words are case-insensitive.  Input not starting with `/` is
//! ignored.

use std::fmt;

use sechat_core::protocol::records::RequestRecord;
use sechat_core::Record;
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

use super::outbound::OutgoingMessage;
use super::session::{ConversationKey, HandshakeState, Notice, Session, SessionAction};

/// Rejected local input.  The session is never modified.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// Wrong number or shape of arguments.  Carries the expected usage.
    #[error("usage: {0}")]
    Usage(&'static str),

    /// The command word is not recognised.
    #[error("unknown command: {0}")]
    Unknown(String),

    /// Authentication needs the server key, which arrives with the handshake.
    #[error("not connected yet: the server has not sent its key")]
    HandshakeIncomplete,

    /// The password digest could not be encrypted for the server.
    #[error("could not encrypt credentials: {0}")]
    Credentials(String),
}

const MSG_USAGE: &str = "/msg <user> <text>";
const GMSG_USAGE: &str = "/gmsg <group> <text>";
const REGISTER_USAGE: &str = "/register <user> <password>";
const LOGIN_USAGE: &str = "/login <user> <password>";
const HISTORY_USAGE: &str = "/history <user> | /history #<group>";

/// Whether `/register` or `/login` was typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    Register,
    Login,
}

/// A parsed local command.
#[derive(PartialEq, Eq)]
pub enum Command {
    Msg { to: String, body: String },
    Gmsg { group: String, body: String },
    Auth {
        kind: AuthKind,
        username: String,
        password: Zeroizing<String>,
    },
    History(ConversationKey),
    Exit,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Msg { to, body } => f
                .debug_struct("Msg")
                .field("to", to)
                .field("body", body)
                .finish(),
            Command::Gmsg { group, body } => f
                .debug_struct("Gmsg")
                .field("group", group)
                .field("body", body)
                .finish(),
            Command::Auth { kind, username, .. } => f
                .debug_struct("Auth")
                .field("kind", kind)
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Command::History(key) => f.debug_tuple("History").field(key).finish(),
            Command::Exit => f.write_str("Exit"),
        }
    }
}

/// Splits `"target rest of text"` into the target and the untouched text.
fn target_and_body<'a>(
    args: &'a str,
    usage: &'static str,
) -> Result<(&'a str, &'a str), CommandError> {
    let (target, body) = args.split_once(' ').ok_or(CommandError::Usage(usage))?;
    if target.is_empty() || body.trim().is_empty() {
        return Err(CommandError::Usage(usage));
    }
    Ok((target, body))
}

fn credentials(
    args: &str,
    usage: &'static str,
) -> Result<(String, Zeroizing<String>), CommandError> {
    let mut words = args.split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (Some(user), Some(password), None) => {
            Ok((user.to_string(), Zeroizing::new(password.to_string())))
        }
        _ => Err(CommandError::Usage(usage)),
    }
}

/// Parses one line of user input.
///
/// Returns `Ok(None)` for input that is not a command (blank, or not
/// starting with `/`).
///
/// # Errors
///
/// Returns [`CommandError::Usage`] or [`CommandError::Unknown`] for
/// malformed commands.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if !line.starts_with('/') {
        return Ok(None);
    }
    let (word, args) = line.split_once(' ').unwrap_or((line, ""));
    let command = match word.to_ascii_lowercase().as_str() {
        "/msg" => {
            let (to, body) = target_and_body(args, MSG_USAGE)?;
            Command::Msg {
                to: to.to_string(),
                body: body.to_string(),
            }
        }
        "/gmsg" => {
            let (group, body) = target_and_body(args, GMSG_USAGE)?;
            Command::Gmsg {
                group: group.to_string(),
                body: body.to_string(),
            }
        }
        "/register" => {
            let (username, password) = credentials(args, REGISTER_USAGE)?;
            Command::Auth {
                kind: AuthKind::Register,
                username,
                password,
            }
        }
        "/login" => {
            let (username, password) = credentials(args, LOGIN_USAGE)?;
            Command::Auth {
                kind: AuthKind::Login,
                username,
                password,
            }
        }
        "/history" => match args.trim() {
            "" | "#" => return Err(CommandError::Usage(HISTORY_USAGE)),
            target => match target.strip_prefix('#') {
                Some(group) => Command::History(ConversationKey::Group(group.to_string())),
                None => Command::History(ConversationKey::User(target.to_string())),
            },
        },
        "/exit" => Command::Exit,
        _ => return Err(CommandError::Unknown(word.to_string())),
    };
    Ok(Some(command))
}

/// Applies a parsed command to the session.
///
/// Chat messages are queued; they leave on the next
/// [`Session::drain_outbound`].  Credentials are digested, encrypted with
/// the server key and queued as a raw record; the plaintext password is
/// wiped when `command` is dropped at the end of this call.
///
/// # Errors
///
/// Returns [`CommandError::HandshakeIncomplete`] for `/register` and
/// `/login` before the server key is known.
pub fn apply(session: &mut Session, command: Command) -> Result<Vec<SessionAction>, CommandError> {
    debug!(?command, "applying command");
    match command {
        Command::Msg { to, body } => {
            let from = session.sender_name();
            session.logs.append(
                ConversationKey::User(to.clone()),
                format!("<{from}>: {body}"),
            );
            session.enqueue(OutgoingMessage::direct(to, body, from));
            Ok(Vec::new())
        }
        Command::Gmsg { group, body } => {
            let from = session.sender_name();
            session.logs.append(
                ConversationKey::Group(group.clone()),
                format!("<{from}>({group}): {body}"),
            );
            session.enqueue(OutgoingMessage::group_broadcast(group, body, from));
            Ok(Vec::new())
        }
        Command::Auth {
            kind,
            username,
            password,
        } => {
            if session.handshake != HandshakeState::Complete {
                return Err(CommandError::HandshakeIncomplete);
            }
            let server_key = session
                .keys
                .server_key()
                .ok_or(CommandError::HandshakeIncomplete)?;
            let digest = session.crypto.digest_password(&password);
            drop(password);
            let sealed = session
                .crypto
                .encrypt(server_key, digest.as_bytes())
                .map_err(|e| CommandError::Credentials(e.to_string()))?;

            let message = vec![username.clone(), sealed];
            let request = match kind {
                AuthKind::Register => RequestRecord::Register { message },
                AuthKind::Login => RequestRecord::Login { message },
            };
            session.identity.set_pending(username);
            session.outbound.push_raw(Record::Request(request));
            Ok(Vec::new())
        }
        Command::History(key) => {
            let lines = session.logs.lines(&key);
            if lines.is_empty() {
                return Ok(vec![SessionAction::Notify(Notice::info(format!(
                    "no history with {key}"
                )))]);
            }
            Ok(lines
                .iter()
                .map(|line| SessionAction::Notify(Notice::info(line.clone())))
                .collect())
        }
        Command::Exit => Ok(vec![SessionAction::Shutdown]),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sechat_core::{CryptoProvider, SealedBoxCrypto};

    use super::*;
    use crate::application::dispatcher::dispatch;
    use crate::application::outbound::OutboundItem;

    fn session() -> Session {
        Session::new(Arc::new(SealedBoxCrypto::new())).unwrap()
    }

    // ── Parsing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_msg_keeps_body_spacing() {
        let cmd = parse("/msg bob hello  there\n").unwrap().unwrap();
        assert_eq!(
            cmd,
            Command::Msg {
                to: "bob".into(),
                body: "hello  there".into(),
            }
        );
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert!(matches!(
            parse("/MSG bob hi").unwrap(),
            Some(Command::Msg { .. })
        ));
        assert_eq!(parse("/Exit").unwrap(), Some(Command::Exit));
    }

    #[test]
    fn test_parse_gmsg() {
        assert_eq!(
            parse("/gmsg team lunch?").unwrap(),
            Some(Command::Gmsg {
                group: "team".into(),
                body: "lunch?".into(),
            })
        );
    }

    #[test]
    fn test_parse_msg_without_text_is_usage_error() {
        assert_eq!(parse("/msg bob"), Err(CommandError::Usage(MSG_USAGE)));
        assert_eq!(parse("/msg bob   "), Err(CommandError::Usage(MSG_USAGE)));
        assert_eq!(parse("/gmsg"), Err(CommandError::Usage(GMSG_USAGE)));
    }

    #[test]
    fn test_parse_login_requires_exactly_two_arguments() {
        assert_eq!(parse("/login alice"), Err(CommandError::Usage(LOGIN_USAGE)));
        assert_eq!(
            parse("/login alice pw extra"),
            Err(CommandError::Usage(LOGIN_USAGE))
        );
        assert!(matches!(
            parse("/register alice s3cret").unwrap(),
            Some(Command::Auth {
                kind: AuthKind::Register,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_history_targets() {
        assert_eq!(
            parse("/history bob").unwrap(),
            Some(Command::History(ConversationKey::User("bob".into())))
        );
        assert_eq!(
            parse("/history #team").unwrap(),
            Some(Command::History(ConversationKey::Group("team".into())))
        );
        assert_eq!(parse("/history"), Err(CommandError::Usage(HISTORY_USAGE)));
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(
            parse("/dance now"),
            Err(CommandError::Unknown("/dance".into()))
        );
    }

    #[test]
    fn test_parse_plain_text_is_not_a_command() {
        assert_eq!(parse("hello there"), Ok(None));
        assert_eq!(parse(""), Ok(None));
    }

    #[test]
    fn test_command_debug_redacts_password() {
        let cmd = parse("/login alice hunter2").unwrap().unwrap();
        let rendered = format!("{cmd:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("alice"));
    }

    // ── Applying ──────────────────────────────────────────────────────────────

    #[test]
    fn test_apply_msg_queues_direct_message() {
        // Arrange
        let mut s = session();

        // Act
        let actions = apply(
            &mut s,
            Command::Msg {
                to: "bob".into(),
                body: "hi".into(),
            },
        )
        .unwrap();

        // Assert
        assert!(actions.is_empty());
        assert_eq!(s.outbound().len(), 1);
    }

    #[test]
    fn test_apply_login_before_handshake_is_rejected() {
        let mut s = session();
        let cmd = parse("/login alice pw").unwrap().unwrap();
        assert_eq!(apply(&mut s, cmd), Err(CommandError::HandshakeIncomplete));
        assert!(s.outbound().is_empty());
        assert_eq!(s.identity().pending(), None);
    }

    #[test]
    fn test_apply_login_queues_encrypted_digest() {
        // Arrange – complete the handshake with a server key we control
        let crypto = SealedBoxCrypto::new();
        let server = crypto.generate_key_pair().unwrap();
        let mut s = session();
        dispatch(
            &mut s,
            Record::own_key(crypto.export_public_key(server.public())),
        )
        .unwrap();

        // Act
        let cmd = parse("/login alice hunter2").unwrap().unwrap();
        apply(&mut s, cmd).unwrap();

        // Assert
        let Some(OutboundItem::Raw(Record::Request(RequestRecord::Login { message }))) =
            s.outbound.pop()
        else {
            panic!("expected a queued login request");
        };
        assert_eq!(message[0], "alice");
        let digest = crypto.decrypt(&server, &message[1]).unwrap();
        assert_eq!(
            String::from_utf8(digest).unwrap(),
            *crypto.digest_password("hunter2")
        );
        assert_eq!(s.identity().pending(), Some("alice"));
    }

    #[test]
    fn test_apply_history_lists_logged_lines() {
        let mut s = session();
        s.logs
            .append(ConversationKey::User("bob".into()), "<bob>: hi");
        let actions = apply(
            &mut s,
            Command::History(ConversationKey::User("bob".into())),
        )
        .unwrap();
        assert_eq!(
            actions,
            vec![SessionAction::Notify(Notice::info("<bob>: hi"))]
        );
    }

    #[test]
    fn test_apply_history_of_empty_conversation() {
        let mut s = session();
        let actions = apply(
            &mut s,
            Command::History(ConversationKey::Group("team".into())),
        )
        .unwrap();
        assert_eq!(
            actions,
            vec![SessionAction::Notify(Notice::info("no history with #team"))]
        );
    }

    #[test]
    fn test_apply_exit_requests_shutdown() {
        let mut s = session();
        assert_eq!(
            apply(&mut s, Command::Exit).unwrap(),
            vec![SessionAction::Shutdown]
        );
    }
}
