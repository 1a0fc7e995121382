// ABOUTME: Test helper utilities for driving backends without a real terminal
// ABOUTME: Provides a scripted terminal with canned replies and a host that counts redraws

use crate::context::Host;
use crate::term::TermIo;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory terminal. Clones share the same buffers so a test can keep a
/// handle while the backend owns another.
#[derive(Clone, Default)]
pub struct ScriptedTerm {
    output: Arc<Mutex<Vec<u8>>>,
    input: Arc<Mutex<VecDeque<u8>>>,
}

impl ScriptedTerm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes the "terminal" will send back.
    pub fn push_input(&self, bytes: &[u8]) {
        self.input
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(bytes.iter().copied());
    }

    /// Everything written so far.
    pub fn output(&self) -> Vec<u8> {
        self.output.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output()).into_owned()
    }

    pub fn take_output(&self) -> Vec<u8> {
        std::mem::take(&mut *self.output.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn remaining_input(&self) -> usize {
        self.input.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Write for ScriptedTerm {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl TermIo for ScriptedTerm {
    fn writer(&mut self) -> &mut dyn Write {
        self
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        self.input
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
    }
}

/// Host that records how often a repaint was requested.
#[derive(Debug, Default)]
pub struct RecordingHost {
    redraws: AtomicUsize,
    pager_visible: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pager_visible() -> Self {
        Self {
            redraws: AtomicUsize::new(0),
            pager_visible: true,
        }
    }

    pub fn redraws(&self) -> usize {
        self.redraws.load(Ordering::SeqCst)
    }
}

impl Host for RecordingHost {
    fn request_redraw(&self) {
        self.redraws.fetch_add(1, Ordering::SeqCst);
    }

    fn pager_visible(&self) -> bool {
        self.pager_visible
    }
}
