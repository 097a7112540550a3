//! User-facing output.
//!
//! Chat lines and notices are written to stdout.  Diagnostics go through
//! `tracing` to stderr, so the two never interleave on the same stream.

use std::io::{self, Write};

use crate::application::session::{Notice, NoticeLevel};

/// Writes [`Notice`]s to an output stream, one per line.
#[derive(Debug)]
pub struct Console<O> {
    out: O,
}

impl Console<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<O: Write> Console<O> {
    pub fn new(out: O) -> Self {
        Self { out }
    }

    /// Writes one notice.  Errors are prefixed with `! `.
    pub fn show(&mut self, notice: &Notice) -> io::Result<()> {
        match notice.level {
            NoticeLevel::Chat | NoticeLevel::Info => writeln!(self.out, "{}", notice.text)?,
            NoticeLevel::Error => writeln!(self.out, "! {}", notice.text)?,
        }
        self.out.flush()
    }

    pub fn get_ref(&self) -> &O {
        &self.out
    }
}
