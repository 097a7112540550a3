//! Application layer for the client.
//!
//! Everything here is synchronous and free of I/O.  Operations take the
//! [`session::Session`] by `&mut` and return [`session::SessionAction`]s
//! (records to transmit, notices to show, shutdown) for the infrastructure
//! layer to carry out.
//!
//! - **`key_store`** – own key pair, server key, cache of peer keys.
//! - **`pending`** – group-list request tracker and the key wait list.
//! - **`outbound`** – outgoing messages and the queue they wait in.
//! - **`session`** – the state set plus the outbound drain algorithm.
//! - **`dispatcher`** – interprets inbound server records.
//! - **`commands`** – parses and applies local `/` commands.

pub mod commands;
pub mod dispatcher;
pub mod key_store;
pub mod outbound;
pub mod pending;
pub mod session;
