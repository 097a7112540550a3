//! The client's single-threaded event loop.
//!
//! # How the loop works (for beginners)
//!
//! The client waits on two things at once: a line typed by the user and
//! bytes arriving from the server.  `tokio::select!` waits for whichever is
//! ready first.  Each cycle then runs to completion:
//!
//! ```text
//! loop {
//!     wait for: stdin line  |  socket bytes
//!        ├─ line   -> parse command -> apply to session
//!        └─ bytes  -> split into records -> dispatch each, in order
//!     drain the outbound queue -> write records to the socket
//! }
//! ```
//!
//! Both waits are cancel-safe: when one side wins, the other side's pending
//! read is dropped without losing any data, and it is simply started again
//! on the next cycle.
//!
//! The loop ends on `/exit`, end of stdin, a `shutdown` record from the
//! server, or a transport failure.  On the way out it tries to send a final
//! `logout` record and to close the connection; failures there are ignored.

use std::io::{self, Write};

use sechat_core::Record;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, Lines};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::application::commands;
use crate::application::dispatcher::dispatch;
use crate::application::session::{Notice, Session, SessionAction};
use crate::infrastructure::console::Console;
use crate::infrastructure::network::{ClientNetworkError, RecordResult, ServerConnection};

/// Why the loop stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The user typed `/exit`.
    UserExit,
    /// The server sent `shutdown`.
    ServerShutdown,
    /// Local input reached end of file.
    InputClosed,
}

/// Unrecoverable failure of the event loop.
#[derive(Debug, Error)]
pub enum EventLoopError {
    #[error(transparent)]
    Network(#[from] ClientNetworkError),

    #[error("reading local input failed: {0}")]
    Input(#[source] io::Error),

    #[error("writing to the console failed: {0}")]
    Console(#[source] io::Error),
}

enum Event {
    Line(io::Result<Option<Zeroizing<String>>>),
    Batch(Result<Vec<RecordResult>, ClientNetworkError>),
}

/// Drives one [`Session`] from local input and one server connection.
pub struct EventLoop<I, R, W, O> {
    session: Session,
    input: Lines<I>,
    connection: ServerConnection<R, W>,
    console: Console<O>,
    exit: Option<ExitReason>,
}

impl<I, R, W, O> EventLoop<I, R, W, O>
where
    I: AsyncBufRead + Unpin,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    O: Write,
{
    pub fn new(
        session: Session,
        input: I,
        connection: ServerConnection<R, W>,
        console: Console<O>,
    ) -> Self {
        Self {
            session,
            input: input.lines(),
            connection,
            console,
            exit: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn console(&self) -> &Console<O> {
        &self.console
    }

    /// Runs until the session ends.
    ///
    /// # Errors
    ///
    /// Returns [`EventLoopError`] on a transport failure (including the
    /// server closing the connection), a local input failure or a console
    /// write failure.  Teardown is attempted in every case.
    pub async fn run(&mut self) -> Result<ExitReason, EventLoopError> {
        let result = self.cycle_until_exit().await;
        self.teardown().await;
        result
    }

    async fn cycle_until_exit(&mut self) -> Result<ExitReason, EventLoopError> {
        loop {
            if let Some(reason) = self.exit {
                info!(?reason, "event loop finished");
                return Ok(reason);
            }

            let event = tokio::select! {
                // Lines may carry a password; wipe them once handled.
                line = self.input.next_line() => Event::Line(line.map(|l| l.map(Zeroizing::new))),
                batch = self.connection.reader.next_batch() => Event::Batch(batch),
            };

            match event {
                Event::Line(Ok(Some(line))) => self.handle_line(&line).await?,
                Event::Line(Ok(None)) => {
                    info!("local input closed");
                    self.stop(ExitReason::InputClosed);
                }
                Event::Line(Err(e)) if e.kind() == io::ErrorKind::InvalidData => {
                    self.show(&Notice::error("input is not valid UTF-8; line ignored"))?;
                }
                Event::Line(Err(e)) => return Err(EventLoopError::Input(e)),
                Event::Batch(Ok(records)) => self.handle_batch(records).await?,
                Event::Batch(Err(e)) => {
                    warn!("server connection lost: {e}");
                    self.show(&Notice::error(format!("disconnected: {e}")))?;
                    return Err(e.into());
                }
            }

            if self.exit.is_none() {
                let actions = self.session.drain_outbound();
                self.perform(actions, ExitReason::UserExit).await?;
            }
        }
    }

    async fn handle_line(&mut self, line: &str) -> Result<(), EventLoopError> {
        let command = match commands::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(()),
            Err(e) => return self.show(&Notice::error(e.to_string())),
        };
        match commands::apply(&mut self.session, command) {
            Ok(actions) => self.perform(actions, ExitReason::UserExit).await,
            Err(e) => self.show(&Notice::error(e.to_string())),
        }
    }

    async fn handle_batch(
        &mut self,
        records: Vec<RecordResult>,
    ) -> Result<(), EventLoopError> {
        for record in records {
            if self.exit.is_some() {
                debug!("ignoring records after shutdown");
                break;
            }
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    self.show(&Notice::error(format!("dropped malformed record: {e}")))?;
                    continue;
                }
            };
            match dispatch(&mut self.session, record) {
                Ok(actions) => self.perform(actions, ExitReason::ServerShutdown).await?,
                Err(e) => {
                    warn!("record not applied: {e}");
                    self.show(&Notice::error(e.to_string()))?;
                }
            }
        }
        Ok(())
    }

    /// Carries out `actions` in order.  A shutdown request stops the loop
    /// with `cause`.
    async fn perform(
        &mut self,
        actions: Vec<SessionAction>,
        cause: ExitReason,
    ) -> Result<(), EventLoopError> {
        for action in actions {
            match action {
                SessionAction::Transmit(record) => self.connection.writer.send(&record).await?,
                SessionAction::Notify(notice) => self.show(&notice)?,
                SessionAction::Shutdown => self.stop(cause),
            }
        }
        Ok(())
    }

    fn stop(&mut self, reason: ExitReason) {
        self.exit.get_or_insert(reason);
    }

    fn show(&mut self, notice: &Notice) -> Result<(), EventLoopError> {
        self.console.show(notice).map_err(EventLoopError::Console)
    }

    async fn teardown(&mut self) {
        if let Err(e) = self.connection.writer.send(&Record::Logout).await {
            debug!("logout not delivered: {e}");
        }
        if let Err(e) = self.connection.writer.shutdown().await {
            debug!("connection shutdown failed: {e}");
        }
    }
}
