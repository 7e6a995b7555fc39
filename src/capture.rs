//! Output capture for a single render.
//!
//! Each render owns a [`CaptureStack`]. The template writes into the top
//! scope; templates may open and close inner scopes with `begin_capture()`
//! and `end_capture()`. After the render the stack must be back at the depth
//! it had when the template started.

use std::io;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
pub struct CaptureStack {
    scopes: Vec<String>,
    /// Text written while no scope was open. Never returned to the caller.
    overflow: String,
    max_depth: usize,
}

impl CaptureStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            scopes: Vec::new(),
            overflow: String::new(),
            max_depth,
        }
    }

    /// Opens a new scope. Fails once `max_depth` scopes are open.
    pub fn push(&mut self) -> io::Result<usize> {
        if self.scopes.len() >= self.max_depth {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("capture depth limit of {} reached", self.max_depth),
            ));
        }
        self.scopes.push(String::new());
        Ok(self.scopes.len())
    }

    /// Closes the innermost scope and returns its text.
    pub fn pop(&mut self) -> Option<String> {
        self.scopes.pop()
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn write_str(&mut self, s: &str) {
        match self.scopes.last_mut() {
            Some(top) => top.push_str(s),
            None => self.overflow.push_str(s),
        }
    }

    pub fn overflow(&self) -> &str {
        &self.overflow
    }
}

/// Capture stack handle shared between the writer and the template functions
/// of one render.
pub type SharedCapture = Arc<Mutex<CaptureStack>>;

pub fn shared(max_depth: usize) -> SharedCapture {
    Arc::new(Mutex::new(CaptureStack::new(max_depth)))
}

pub(crate) fn lock(
    capture: &SharedCapture,
) -> io::Result<std::sync::MutexGuard<'_, CaptureStack>> {
    capture
        .lock()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "capture stack poisoned"))
}

/// `io::Write` adapter that streams rendered output into the top scope.
pub struct CaptureWriter {
    capture: SharedCapture,
}

impl CaptureWriter {
    pub fn new(capture: SharedCapture) -> Self {
        Self { capture }
    }
}

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = std::str::from_utf8(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        lock(&self.capture)?.write_str(text);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
