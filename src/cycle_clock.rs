//! Cycle-accurate time sources for latency measurement.
//!
//! This module provides mechanisms for reading a monotonic cycle counter
//! with minimal overhead, and for pinning the measuring thread to one
//! logical core so consecutive reads come from the same counter.

use std::io;

use lazy_static::lazy_static;
use parking_lot::Mutex;

/// A monotonic 64-bit counter capability.
///
/// Which implementation a measurement uses is an explicit construction
/// parameter; there is no build-time clock selection.
pub trait Clock {
    /// Reads the counter. Implementations serialize the read against
    /// surrounding work where the hardware allows it.
    fn read(&self) -> u64;
}

/// A serializing CPU-cycle counter.
///
/// On x86_64 this issues `rdtscp` followed by `lfence`: `rdtscp` waits for
/// all preceding instructions to retire, and the fence keeps later work
/// from starting before the counter value is captured. On aarch64 it reads
/// `cntvct_el0` behind an `isb`. Other targets fall back to system time in
/// nanoseconds, which is monotonic but not cycle-accurate.
///
/// Cycle deltas are only meaningful while the reading thread stays on one
/// core, see [`bind_core`]. Deltas taken while unbound, or across a
/// migration, must not be treated as valid measurements.
#[derive(Clone, Copy, Debug, Default)]
pub struct CycleClock;

impl CycleClock {
    pub const fn new() -> Self {
        CycleClock
    }
}

impl Clock for CycleClock {
    #[inline(always)]
    fn read(&self) -> u64 {
        #[cfg(target_arch = "x86_64")]
        unsafe {
            let mut aux = 0u32;
            let cycles = core::arch::x86_64::__rdtscp(&mut aux);
            core::arch::x86_64::_mm_lfence();
            cycles
        }

        #[cfg(target_arch = "aarch64")]
        unsafe {
            let value: u64;
            std::arch::asm!("isb", "mrs {}, cntvct_el0", out(reg) value);
            value
        }

        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0)
        }
    }
}

/// A nanosecond wall clock satisfying the same capability.
///
/// Useful on targets without a usable cycle counter and in tests that need
/// deterministic plumbing rather than cycle accuracy.
#[derive(Clone, Copy, Debug)]
pub struct WallClock {
    epoch: std::time::Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self { epoch: std::time::Instant::now() }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    #[inline]
    fn read(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }
}

lazy_static! {
    /// Process-wide record of which core, if any, is currently bound.
    /// Binds must be paired and non-nested; the registry enforces it.
    static ref BOUND_CORE: Mutex<Option<usize>> = Mutex::new(None);
}

/// A scoped core binding: the calling thread is pinned to one logical core
/// for the lifetime of this value and unpinned on every exit path when it
/// drops.
pub struct CoreBinding {
    #[cfg(target_os = "linux")]
    previous: libc::cpu_set_t,
}

/// Pins the calling thread to `core`, restoring the previous affinity mask
/// when the returned guard drops.
///
/// Only one binding may exist in the process at a time; a nested `bind_core`
/// fails with `AlreadyExists`. Non-Linux targets return `Unsupported`.
///
/// # Examples
///
/// ```no_run
/// use deferlog::bind_core;
///
/// let binding = bind_core(0).unwrap();
/// // ... take measurements on core 0 ...
/// drop(binding);
/// ```
pub fn bind_core(core: usize) -> io::Result<CoreBinding> {
    let mut bound = BOUND_CORE.lock();
    if let Some(existing) = *bound {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("measuring thread is already bound to core {}", existing),
        ));
    }

    #[cfg(target_os = "linux")]
    unsafe {
        let set_size = std::mem::size_of::<libc::cpu_set_t>();
        let mut previous: libc::cpu_set_t = std::mem::zeroed();
        if libc::sched_getaffinity(0, set_size, &mut previous) != 0 {
            return Err(io::Error::last_os_error());
        }
        let mut target: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut target);
        libc::CPU_SET(core, &mut target);
        if libc::sched_setaffinity(0, set_size, &target) != 0 {
            return Err(io::Error::last_os_error());
        }
        *bound = Some(core);
        Ok(CoreBinding { previous })
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = core;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "core binding is only supported on Linux",
        ))
    }
}

/// The core the process is currently bound to, if any.
pub fn bound_core() -> Option<usize> {
    *BOUND_CORE.lock()
}

impl Drop for CoreBinding {
    fn drop(&mut self) {
        *BOUND_CORE.lock() = None;
        #[cfg(target_os = "linux")]
        unsafe {
            libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &self.previous);
        }
    }
}
