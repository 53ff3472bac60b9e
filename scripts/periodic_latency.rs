//! Periodic call-latency measurement.
//!
//! Wakes once per millisecond, logs one line of a fixed shape, and samples
//! the cost of the logging call alone with a cycle clock. Three variants
//! are measured: a synchronous formatted write to a file, a no-op
//! baseline, and the deferred pipeline. Per-call cycle deltas land in
//! `timings_*.txt`, one per line, for offline analysis.

use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::thread;
use std::time::Duration;

use deferlog::{bind_core, log_text, Config, CycleClock, FileSink, Logger, SampleRing};

const RING_CAPACITY: usize = 8192;

fn measure<F>(mut call: F, timings_path: &str, iterations: usize) -> io::Result<()>
where
    F: FnMut(&'static str, char, i32, f64),
{
    let mut ring: SampleRing<CycleClock, u32, RING_CAPACITY> = SampleRing::new(CycleClock::new());

    for i in 0..iterations {
        thread::sleep(Duration::from_millis(1));
        let token = ring.start();
        call("Hello, world!", 'A', i as i32, std::f64::consts::PI);
        ring.stop(token);
    }

    let mut timings = BufWriter::new(File::create(timings_path)?);
    for sample in ring.iter() {
        writeln!(timings, "{}", sample)?;
    }
    timings.flush()?;

    summarize(timings_path, &ring);
    Ok(())
}

fn summarize(label: &str, ring: &SampleRing<CycleClock, u32, RING_CAPACITY>) {
    let mut samples: Vec<u32> = ring.iter().collect();
    if samples.is_empty() {
        return;
    }
    samples.sort_unstable();
    let total: u64 = samples.iter().map(|&s| s as u64).sum();
    let mean = total / samples.len() as u64;
    let p50 = samples[samples.len() / 2];
    let p99 = samples[samples.len() * 99 / 100];
    let max = samples[samples.len() - 1];
    println!(
        "{}: {} samples, mean {} cycles, p50 {}, p99 {}, max {}",
        label,
        samples.len(),
        mean,
        p50,
        p99,
        max
    );
}

fn main() -> io::Result<()> {
    let iterations = env::args()
        .nth(1)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(2000);

    let binding = match bind_core(0) {
        Ok(binding) => Some(binding),
        Err(err) => {
            eprintln!("warning: running unbound, cycle deltas are unreliable: {}", err);
            None
        }
    };

    // Synchronous baseline: format and write at the call site.
    {
        let mut file = BufWriter::new(File::create("sync.txt")?);
        measure(
            |s, c, i, d| {
                let _ = write!(file, "string: {} char: {} int: {} double: {}\n", s, c, i, d);
            },
            "timings_periodic_calls_sync.txt",
            iterations,
        )?;
        file.flush()?;
    }

    // Empty call: the floor of the measurement harness itself.
    measure(|_, _, _, _| {}, "timings_periodic_calls_nop.txt", iterations)?;

    // Deferred pipeline: capture-only call site, commit each tick.
    {
        let sink = FileSink::create("deferred.txt")?;
        let logger = Logger::open(sink, Config::default());
        measure(
            |s, c, i, d| {
                log_text!(logger, "string: {} char: {} int: {} double: {}\n", s, c, i, d);
                logger.commit();
            },
            "timings_periodic_calls_deferred.txt",
            iterations,
        )?;
        logger.close();
    }

    drop(binding);
    Ok(())
}
