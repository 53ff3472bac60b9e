//! The deferred-formatting pipeline.
//!
//! Producers capture a format reference and a fixed-arity set of typed
//! argument values and enqueue them; nothing is converted to text at the
//! call site. A single background writer thread dequeues records in
//! order, renders them through the decimal encoders into a reused
//! [`AppendBuffer`], and hands the finished bytes to the [`Sink`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::append_buffer::AppendBuffer;
use crate::decimal::{encode_f64, encode_i64, encode_u64};
use crate::sink::{RetryPolicy, Sink};

/// Maximum number of arguments a single record can carry.
pub const MAX_ARGS: usize = 8;

/// A typed argument value captured at the call site.
///
/// The kind set is deliberately fixed: string, character, signed and
/// unsigned integers, floating point. Richer formatting belongs to an
/// external layer.
#[derive(Clone, Copy, Debug)]
pub enum Arg {
    Str(&'static str),
    Char(char),
    Int(i64),
    Uint(u64),
    Float(f64),
}

macro_rules! impl_arg_int {
    ($($t:ty),*) => {$(
        impl From<$t> for Arg {
            #[inline(always)]
            fn from(v: $t) -> Arg {
                Arg::Int(v as i64)
            }
        }
    )*};
}

macro_rules! impl_arg_uint {
    ($($t:ty),*) => {$(
        impl From<$t> for Arg {
            #[inline(always)]
            fn from(v: $t) -> Arg {
                Arg::Uint(v as u64)
            }
        }
    )*};
}

impl_arg_int!(i8, i16, i32, i64, isize);
impl_arg_uint!(u8, u16, u32, u64, usize);

impl From<f32> for Arg {
    #[inline(always)]
    fn from(v: f32) -> Arg {
        Arg::Float(v as f64)
    }
}

impl From<f64> for Arg {
    #[inline(always)]
    fn from(v: f64) -> Arg {
        Arg::Float(v)
    }
}

impl From<char> for Arg {
    #[inline(always)]
    fn from(v: char) -> Arg {
        Arg::Char(v)
    }
}

impl From<&'static str> for Arg {
    #[inline(always)]
    fn from(v: &'static str) -> Arg {
        Arg::Str(v)
    }
}

/// Producer behavior when the record queue is full.
///
/// This is the sole admission-control mechanism at the producer→writer
/// boundary; exactly one policy is in force, chosen at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// The producer blocks until the writer frees space.
    Block,
    /// The record is discarded and [`Logger::dropped`] increments.
    Drop,
}

/// Logger configuration, supplied at construction.
///
/// There is no global singleton and no compile-time selection: everything
/// the pipeline needs is an explicit value here.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Bounded capacity of the producer→writer queue, in records.
    pub queue_capacity: usize,
    /// What a producer does when the queue is full.
    pub overflow: OverflowPolicy,
    /// Writer-side retry behavior for failing sink writes.
    pub retry: RetryPolicy,
    /// Fractional digits rendered for floating-point arguments.
    pub float_precision: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queue_capacity: 8192,
            overflow: OverflowPolicy::Block,
            retry: RetryPolicy::default(),
            float_precision: 6,
        }
    }
}

/// One enqueued log record: a format reference plus captured arguments.
/// Ownership transfers from producer to writer at the enqueue boundary.
struct Record {
    format: &'static str,
    args: [Arg; MAX_ARGS],
    arg_count: u8,
}

struct QueueState {
    records: VecDeque<Record>,
    /// Records accepted into the queue since open.
    enqueued: u64,
    /// Records the writer has finished with (passed to the sink, or
    /// given up on after exhausting retries).
    processed: u64,
    closing: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    /// Writer waits here for records.
    ready: Condvar,
    /// Blocked producers wait here for queue space.
    space: Condvar,
    /// `commit` callers wait here for the writer to catch up.
    drained: Condvar,
    dropped: AtomicU64,
    sink_errors: AtomicU64,
}

/// An asynchronous text logger with deferred formatting.
///
/// `write` captures a format reference and typed arguments by value and
/// enqueues them without any text conversion; all encoding happens on the
/// single background writer thread, which owns the [`Sink`] for the
/// logger's whole lifetime. The lifecycle is
/// `open → write* → commit* → close`.
///
/// # Thread safety
///
/// Any number of producer threads may call `write` and `commit` on a
/// shared `&Logger` concurrently. The queue is a bounded `VecDeque` under
/// a mutex: admission order is lock-acquisition order, so the sink
/// observes one global total order over all records, consistent with each
/// producer's program order. Per-producer FIFO is therefore preserved end
/// to end; the interleaving between distinct producers is whatever order
/// they acquired the lock in.
///
/// # Failure behavior
///
/// Sink write failures are retried on the writer thread per
/// [`RetryPolicy`], then counted in [`Logger::sink_errors`] and reported
/// once through the `log` facade. They never propagate into producer
/// threads, and `close` terminates cleanly even if the sink is dead.
///
/// # Examples
///
/// ```
/// use deferlog::{Logger, Config, MemorySink, log_text};
///
/// let sink = MemorySink::new();
/// let contents = sink.contents();
/// let logger = Logger::open(sink, Config::default());
///
/// log_text!(logger, "string: {} char: {} int: {} double: {}\n",
///     "Hello, world!", 'A', -7i32, 3.14159f64);
/// logger.commit();
///
/// logger.close();
/// assert!(contents.text().starts_with("string: Hello, world! char: A int: -7"));
/// ```
pub struct Logger {
    shared: Arc<Shared>,
    queue_capacity: usize,
    overflow: OverflowPolicy,
    writer: Option<JoinHandle<()>>,
}

impl Logger {
    /// Binds a sink and starts the writer thread.
    pub fn open(sink: impl Sink + 'static, config: Config) -> Logger {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                records: VecDeque::with_capacity(config.queue_capacity),
                enqueued: 0,
                processed: 0,
                closing: false,
            }),
            ready: Condvar::new(),
            space: Condvar::new(),
            drained: Condvar::new(),
            dropped: AtomicU64::new(0),
            sink_errors: AtomicU64::new(0),
        });

        let writer_shared = shared.clone();
        let retry = config.retry;
        let precision = config.float_precision;
        let mut boxed: Box<dyn Sink> = Box::new(sink);
        let writer = thread::Builder::new()
            .name("deferlog-writer".into())
            .spawn(move || writer_loop(writer_shared, &mut *boxed, retry, precision))
            .expect("failed to spawn log writer thread");

        Logger {
            shared,
            queue_capacity: config.queue_capacity,
            overflow: config.overflow,
            writer: Some(writer),
        }
    }

    /// Enqueues one record: a format reference plus up to [`MAX_ARGS`]
    /// argument values, captured by value. No formatting happens here.
    ///
    /// `{}` placeholders in `format` are replaced in order by the writer
    /// thread; surplus placeholders are emitted literally and surplus
    /// arguments are ignored. No newline is appended.
    ///
    /// When the queue is full the configured [`OverflowPolicy`] applies.
    /// A record offered while the logger is closing is dropped and
    /// counted rather than enqueued behind the shutdown drain.
    ///
    /// Passing more than [`MAX_ARGS`] arguments is a contract violation:
    /// it panics in debug builds and truncates in release builds.
    pub fn write(&self, format: &'static str, args: &[Arg]) {
        debug_assert!(args.len() <= MAX_ARGS, "record carries more than {} arguments", MAX_ARGS);

        let mut record = Record {
            format,
            args: [Arg::Uint(0); MAX_ARGS],
            arg_count: args.len().min(MAX_ARGS) as u8,
        };
        for (slot, arg) in record.args.iter_mut().zip(args) {
            *slot = *arg;
        }

        let mut state = self.shared.state.lock();
        if state.records.len() >= self.queue_capacity {
            match self.overflow {
                OverflowPolicy::Drop => {
                    self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                OverflowPolicy::Block => {
                    while state.records.len() >= self.queue_capacity && !state.closing {
                        self.shared.space.wait(&mut state);
                    }
                }
            }
        }
        if state.closing {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        state.records.push_back(record);
        state.enqueued += 1;
        drop(state);
        self.shared.ready.notify_one();
    }

    /// Blocks until every record enqueued before this call has been
    /// passed to the sink.
    ///
    /// The barrier is global: it covers all producers' records admitted
    /// so far, which in particular includes every record this producer
    /// wrote. Used for deterministic tests and at orderly shutdown
    /// points.
    pub fn commit(&self) {
        let mut state = self.shared.state.lock();
        let target = state.enqueued;
        while state.processed < target {
            self.shared.drained.wait(&mut state);
        }
    }

    /// Drains all pending records, stops the writer thread, and releases
    /// the sink.
    ///
    /// Consuming `self` makes double-close unrepresentable; dropping the
    /// logger performs the same shutdown.
    pub fn close(mut self) {
        self.shutdown();
    }

    /// Records discarded at the producer boundary (overflow under the
    /// `Drop` policy, or writes racing shutdown).
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Records abandoned because the sink kept failing after retries.
    pub fn sink_errors(&self) -> u64 {
        self.shared.sink_errors.load(Ordering::Relaxed)
    }

    fn shutdown(&mut self) {
        let Some(writer) = self.writer.take() else { return };
        {
            let mut state = self.shared.state.lock();
            state.closing = true;
        }
        self.shared.ready.notify_all();
        self.shared.space.notify_all();
        let _ = writer.join();
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn writer_loop(shared: Arc<Shared>, sink: &mut dyn Sink, retry: RetryPolicy, precision: usize) {
    let mut buf = AppendBuffer::with_capacity(4096);
    loop {
        let record = {
            let mut state = shared.state.lock();
            loop {
                if let Some(record) = state.records.pop_front() {
                    break Some(record);
                }
                if state.closing {
                    break None;
                }
                shared.ready.wait(&mut state);
            }
        };
        let Some(record) = record else { break };
        shared.space.notify_one();

        buf.clear();
        format_record(&mut buf, &record, precision);
        write_with_retry(sink, buf.as_bytes(), retry, &shared);

        shared.state.lock().processed += 1;
        shared.drained.notify_all();
    }
    if let Err(err) = sink.flush() {
        shared.sink_errors.fetch_add(1, Ordering::Relaxed);
        log::warn!("log sink flush failed on close: {}", err);
    }
}

/// Renders one record: literal format segments interleaved with encoded
/// arguments at each `{}` placeholder.
fn format_record(buf: &mut AppendBuffer, record: &Record, precision: usize) {
    let mut args = record.args[..record.arg_count as usize].iter();
    let mut rest = record.format;
    while let Some(idx) = rest.find("{}") {
        buf.extend(rest[..idx].as_bytes());
        match args.next() {
            Some(arg) => encode_arg(buf, arg, precision),
            None => buf.extend(b"{}"),
        }
        rest = &rest[idx + 2..];
    }
    buf.extend(rest.as_bytes());
}

fn encode_arg(buf: &mut AppendBuffer, arg: &Arg, precision: usize) {
    match *arg {
        Arg::Str(s) => buf.extend(s.as_bytes()),
        Arg::Char(c) => {
            let mut utf8 = [0u8; 4];
            buf.extend(c.encode_utf8(&mut utf8).as_bytes());
        }
        Arg::Int(v) => encode_i64(buf, v),
        Arg::Uint(v) => encode_u64(buf, v),
        Arg::Float(v) => encode_f64(buf, v, precision),
    }
}

fn write_with_retry(sink: &mut dyn Sink, bytes: &[u8], retry: RetryPolicy, shared: &Shared) {
    let mut attempt = 0;
    loop {
        match sink.write(bytes) {
            Ok(()) => return,
            Err(err) => {
                if attempt == retry.max_retries {
                    // first failure goes to the log facade, the rest only count
                    if shared.sink_errors.fetch_add(1, Ordering::Relaxed) == 0 {
                        log::warn!(
                            "log sink write failed after {} retries, dropping record: {}",
                            retry.max_retries,
                            err
                        );
                    }
                    return;
                }
                attempt += 1;
                if !retry.backoff.is_zero() {
                    thread::sleep(retry.backoff);
                }
            }
        }
    }
}

/// Logs one record through a [`Logger`] handle.
///
/// The format string is captured by reference and each argument is
/// converted to an [`Arg`] by value; all rendering is deferred to the
/// writer thread.
///
/// # Examples
///
/// ```
/// # use deferlog::{Logger, Config, MemorySink, log_text};
/// # let sink = MemorySink::new();
/// # let logger = Logger::open(sink, Config::default());
/// log_text!(logger, "plain record\n");
/// log_text!(logger, "sample {} of {}\n", 3u32, 10u32);
/// # logger.close();
/// ```
#[macro_export]
macro_rules! log_text {
    ($logger:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $logger.write($fmt, &[$($crate::Arg::from($arg)),*])
    };
}
