//! # deferlog
//!
//! A low-overhead asynchronous text logger for latency-sensitive
//! applications, built around deferred formatting:
//!
//! * **Cheap call sites**: `write` captures a format reference and typed
//!   argument values, nothing more: no formatting, no I/O, no syscalls
//! * **Single writer thread**: all text rendering and sink I/O happen off
//!   the producers' critical path
//! * **Allocation-free encoding**: base-10 integer and float encoders
//!   write digits directly into a reserve/commit append buffer
//! * **Built-in latency measurement**: a cycle-accurate sampling ring for
//!   benchmarking the logger (or anything else) with sub-microsecond
//!   resolution
//!
//! ## Main Components
//!
//! * `Logger`: producer-facing API plus the background writer thread
//! * `AppendBuffer`: two-phase reserve/commit byte storage
//! * `decimal`: exact-width base-10 encoders for integers and floats
//! * `Sink`: pluggable destination capability (`FileSink`, `MemorySink`)
//! * `CycleClock` / `SampleRing`: serializing cycle counter and a
//!   fixed-capacity ring of latency deltas
//!
//! ## Quick Start
//!
//! ```
//! use deferlog::{Logger, Config, MemorySink, log_text};
//!
//! let sink = MemorySink::new();
//! let contents = sink.contents();
//! let logger = Logger::open(sink, Config::default());
//!
//! // Hot path: capture-only, formatting is deferred to the writer thread
//! log_text!(logger, "iteration {} took {} us\n", 17u32, 4.25f64);
//!
//! // Barrier: wait until everything written so far reached the sink
//! logger.commit();
//! logger.close();
//!
//! assert_eq!(contents.text(), "iteration 17 took 4.250000 us\n");
//! ```
//!
//! ## Measuring call latency
//!
//! ```
//! use deferlog::{CycleClock, SampleRing};
//!
//! let mut ring: SampleRing<CycleClock, u32, 8192> = SampleRing::new(CycleClock::new());
//! let token = ring.start();
//! // ... the operation being measured ...
//! ring.stop(token);
//! for cycles in ring.iter() {
//!     let _ = cycles;
//! }
//! ```
//!
//! Cycle deltas are only meaningful while the measuring thread stays on
//! one core; see [`bind_core`].

pub mod append_buffer;
pub mod cycle_clock;
pub mod decimal;
pub mod logger;
pub mod sample_ring;
pub mod sink;

pub use append_buffer::AppendBuffer;
pub use cycle_clock::{bind_core, bound_core, Clock, CoreBinding, CycleClock, WallClock};
pub use logger::{Arg, Config, Logger, OverflowPolicy, MAX_ARGS};
pub use sample_ring::{Sample, SampleRing, StartToken};
pub use sink::{FileSink, MemorySink, MemorySinkContents, RetryPolicy, Sink};
