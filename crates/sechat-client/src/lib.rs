//! sechat-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does sechat-client do? (for beginners)
//!
//! The client is the program a person runs to chat.  It holds one TCP
//! connection to the sechat server and reads commands typed on stdin.
//!
//! 1. On connect, the server sends its public key.  The client stores it and
//!    answers with its own freshly generated public key (the *handshake*).
//! 2. `/register` and `/login` send the user name plus a password digest,
//!    encrypted with the server's key.
//! 3. `/msg bob hi` needs bob's public key.  If the client does not know it
//!    yet, it parks the message and asks the server for the key; once the
//!    key arrives the parked message is encrypted and sent.
//! 4. `/gmsg team hi` first asks the server who is in `team`, then sends one
//!    separately encrypted copy to each member.
//! 5. Incoming messages are decrypted with the client's own secret key,
//!    appended to a per-conversation log and printed.
//!
//! All protocol state lives in [`application::session::Session`]; the
//! [`infrastructure::event_loop`] drives it from stdin and the socket.

/// Application layer: protocol state machine, queues and command handling.
pub mod application;

/// Infrastructure layer: configuration, network, console and the event loop.
pub mod infrastructure;
