// ABOUTME: Byte channel to the controlling terminal and cursor positioning helpers
// ABOUTME: Abstracted behind TermIo so protocol handshakes can be scripted in tests

use crossterm::cursor::{MoveTo, RestorePosition, SavePosition};
use crossterm::QueueableCommand;
use std::io::{self, Read, Write};

use crate::error::Result;

/// Output and raw input of the terminal a backend draws into.
pub trait TermIo: Send {
    fn writer(&mut self) -> &mut dyn Write;

    /// Block until one byte of terminal input is available.
    fn read_byte(&mut self) -> io::Result<u8>;
}

/// The process's own stdout/stdin.
pub struct StdTerm {
    stdout: io::Stdout,
    stdin: io::Stdin,
}

impl StdTerm {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            stdin: io::stdin(),
        }
    }
}

impl Default for StdTerm {
    fn default() -> Self {
        Self::new()
    }
}

impl TermIo for StdTerm {
    fn writer(&mut self) -> &mut dyn Write {
        &mut self.stdout
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        self.stdin.lock().read_exact(&mut byte)?;
        Ok(byte[0])
    }
}

/// Save the cursor, move it to `(row, col)`, run `f`, restore and flush.
/// The cursor is restored even when `f` fails.
pub fn with_cursor_at<F>(out: &mut dyn Write, row: u16, col: u16, f: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    out.queue(SavePosition)?.queue(MoveTo(col, row))?;
    let result = f(out);
    out.queue(RestorePosition)?;
    out.flush()?;
    result
}

/// Move the cursor without saving it.
pub fn move_cursor(out: &mut dyn Write, row: u16, col: u16) -> Result<()> {
    out.queue(MoveTo(col, row))?;
    Ok(())
}

/// tmux and screen swallow unknown escape sequences unless they are
/// wrapped in a DCS passthrough.
pub fn inside_multiplexer(term: &str) -> bool {
    term.starts_with("screen") || term.starts_with("tmux")
}

/// Opening and closing bytes of an OSC sequence, wrapped for tmux when needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OscFraming {
    pub open: String,
    pub close: String,
}

impl OscFraming {
    pub fn for_term(term: &str) -> Self {
        let mut open = String::from("\x1b");
        let mut close = String::from("\x07");
        if inside_multiplexer(term) {
            open.push_str("Ptmux;\x1b\x1b");
            close.push_str("\x1b\\");
        }
        Self { open, close }
    }
}
