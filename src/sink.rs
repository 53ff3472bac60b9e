//! Destinations for finished log bytes.
//!
//! The logger never touches files directly. All I/O goes through the
//! [`Sink`] capability, which is handed to [`Logger::open`](crate::Logger::open)
//! and owned exclusively by the writer thread from then on. Alternate
//! destinations (in-memory, rotating, network) plug in by implementing the
//! same trait; nothing in the logger changes.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// A destination that persists finished byte spans.
///
/// Implementations run on the writer thread only, so they may block; the
/// producer-facing API never calls into a sink. Errors returned from
/// `write` are retried per the logger's [`RetryPolicy`] and surfaced
/// through its error counter; they never reach producer threads.
pub trait Sink: Send {
    /// Persists one finished span of ASCII log text.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Flushes anything the sink itself buffers. Called when the logger
    /// closes.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The reference sink: an open file.
///
/// # Examples
///
/// ```no_run
/// use deferlog::{FileSink, Logger, Config};
///
/// let sink = FileSink::create("app.log").unwrap();
/// let logger = Logger::open(sink, Config::default());
/// ```
pub struct FileSink {
    file: File,
}

impl FileSink {
    /// Creates (or truncates) the file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self { file: File::create(path)? })
    }

    /// Wraps an already-open file.
    pub fn from_file(file: File) -> Self {
        Self { file }
    }
}

impl Sink for FileSink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// An in-memory sink, mainly for tests and examples.
///
/// The sink itself moves into the writer thread; [`MemorySink::contents`]
/// returns a handle that stays behind and can read the accumulated bytes
/// at any point, including after the logger has closed.
///
/// # Examples
///
/// ```
/// use deferlog::{MemorySink, Logger, Config, log_text};
///
/// let sink = MemorySink::new();
/// let contents = sink.contents();
/// let logger = Logger::open(sink, Config::default());
/// log_text!(logger, "answer: {}", 42u32);
/// logger.close();
/// assert_eq!(contents.bytes(), b"answer: 42");
/// ```
pub struct MemorySink {
    data: Arc<Mutex<Vec<u8>>>,
}

/// Read handle to a [`MemorySink`]'s accumulated output.
#[derive(Clone)]
pub struct MemorySinkContents {
    data: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self { data: Arc::new(Mutex::new(Vec::new())) }
    }

    /// A cloneable handle to the bytes written so far.
    pub fn contents(&self) -> MemorySinkContents {
        MemorySinkContents { data: self.data.clone() }
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySinkContents {
    /// A snapshot of everything written so far.
    pub fn bytes(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    /// The output interpreted as UTF-8 (log text is plain ASCII).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data.lock()).into_owned()
    }
}

impl Sink for MemorySink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.data.lock().extend_from_slice(bytes);
        Ok(())
    }
}

/// How the writer thread responds to a failing [`Sink::write`].
///
/// Each failed span is retried up to `max_retries` times with `backoff`
/// between attempts. A span that still fails is counted in
/// [`Logger::sink_errors`](crate::Logger::sink_errors) and discarded so
/// the pipeline keeps draining.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_micros(100),
        }
    }
}
