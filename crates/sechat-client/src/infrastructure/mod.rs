//! Infrastructure layer for the client.
//!
//! Contains everything that touches the outside world: the config file, the
//! server socket, the terminal, and the event loop that ties them to the
//! session.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `sechat_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`config`** – `sechat.toml` schema and loader.
//! - **`network`** – connect with retry, record reader and writer.
//! - **`console`** – writes chat lines and notices to stdout.
//! - **`event_loop`** – `select!` over stdin and the socket, driving the session.

pub mod config;
pub mod console;
pub mod event_loop;
pub mod network;
