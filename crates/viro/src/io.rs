//! Output sinks for `print` and error reporting.
//!
//! The evaluator never writes to stdout or stderr directly; the caller
//! injects an [`OutputSink`] per run. `StdSink` buffers and flushes on
//! newline and on drop, `CollectSink` captures output for tests, `NoSink`
//! discards everything.

use std::io::{self, Write as _};

/// Destination for interpreter output.
pub trait OutputSink {
    /// Writes a chunk of already formatted text. Must not add separators or
    /// terminators of its own.
    fn write(&mut self, text: &str);

    /// Writes a single separator or terminator character.
    fn push_char(&mut self, ch: char);
}

/// Sink that buffers into memory and writes to stdout on newline and drop.
#[derive(Debug, Default)]
pub struct StdSink {
    buffer: String,
}

impl StdSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let _ = io::stdout().write_all(self.buffer.as_bytes());
        let _ = io::stdout().flush();
        self.buffer.clear();
    }
}

impl OutputSink for StdSink {
    fn write(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn push_char(&mut self, ch: char) {
        self.buffer.push(ch);
        if ch == '\n' {
            self.flush();
        }
    }
}

impl Drop for StdSink {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Sink that writes straight to stderr, used by drivers for error lines.
#[derive(Debug, Default)]
pub struct StderrSink;

impl OutputSink for StderrSink {
    fn write(&mut self, text: &str) {
        let _ = io::stderr().write_all(text.as_bytes());
    }

    fn push_char(&mut self, ch: char) {
        let mut buf = [0u8; 4];
        let _ = io::stderr().write_all(ch.encode_utf8(&mut buf).as_bytes());
    }
}

/// Sink that collects all output into a string, for tests and embedding.
#[derive(Debug, Default)]
pub struct CollectSink(String);

impl CollectSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected output as a string slice.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.0
    }

    /// Consumes the sink and returns the collected output.
    #[must_use]
    pub fn into_output(self) -> String {
        self.0
    }
}

impl OutputSink for CollectSink {
    fn write(&mut self, text: &str) {
        self.0.push_str(text);
    }

    fn push_char(&mut self, ch: char) {
        self.0.push(ch);
    }
}

/// Sink that ignores all output.
#[derive(Debug, Default)]
pub struct NoSink;

impl OutputSink for NoSink {
    fn write(&mut self, _text: &str) {}

    fn push_char(&mut self, _ch: char) {}
}
