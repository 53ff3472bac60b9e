use std::cell::RefCell;
use std::thread;
use std::time::Duration;

use deferlog::{bind_core, bound_core, Clock, CycleClock, SampleRing, WallClock};

/// A clock that replays a fixed sequence of counter values, so ring
/// semantics can be tested with exact deltas.
struct ScriptedClock {
    reads: RefCell<std::vec::IntoIter<u64>>,
}

impl ScriptedClock {
    fn new(reads: Vec<u64>) -> Self {
        Self { reads: RefCell::new(reads.into_iter()) }
    }
}

impl Clock for ScriptedClock {
    fn read(&self) -> u64 {
        self.reads.borrow_mut().next().expect("clock script exhausted")
    }
}

/// Feeds `deltas` into the ring as start/stop pairs.
fn feed<const N: usize>(deltas: &[u64]) -> SampleRing<ScriptedClock, u32, N> {
    let mut reads = Vec::new();
    let mut now = 0;
    for &delta in deltas {
        reads.push(now);
        now += delta;
        reads.push(now);
        now += 1_000; // idle gap between measurements
    }
    let mut ring = SampleRing::new(ScriptedClock::new(reads));
    for _ in deltas {
        let token = ring.start();
        ring.stop(token);
    }
    ring
}

#[test]
fn test_cycle_clock_monotonicity() {
    let clock = CycleClock::new();
    let mut prev = clock.read();
    for _ in 0..1000 {
        let current = clock.read();
        assert!(current >= prev, "cycle reads should be monotonically increasing");
        prev = current;
    }
}

#[test]
fn test_wall_clock_advances() {
    let clock = WallClock::new();
    let first = clock.read();
    thread::sleep(Duration::from_micros(100));
    let second = clock.read();
    assert!(second > first, "wall clock should advance over 100us");
}

#[test]
fn test_ring_overwrites_oldest_when_full() {
    // capacity 4, five samples: the first one is overwritten
    let ring = feed::<4>(&[5, 9, 2, 7, 11]);
    assert_eq!(ring.len(), 4);
    let samples: Vec<u32> = ring.iter().collect();
    assert_eq!(samples, vec![9, 2, 7, 11]);
}

#[test]
fn test_ring_keeps_last_n_of_many() {
    let deltas: Vec<u64> = (0..23).collect();
    let ring = feed::<8>(&deltas);
    assert_eq!(ring.len(), 8);
    let samples: Vec<u32> = ring.iter().collect();
    let expected: Vec<u32> = (15..23).collect();
    assert_eq!(samples, expected);
}

#[test]
fn test_ring_partial_fill_in_call_order() {
    let ring = feed::<16>(&[3, 1, 4]);
    assert_eq!(ring.len(), 3);
    assert!(!ring.is_empty());
    assert_eq!(ring.capacity(), 16);
    let samples: Vec<u32> = ring.iter().collect();
    assert_eq!(samples, vec![3, 1, 4]);
}

#[test]
fn test_ring_exactly_full() {
    let ring = feed::<4>(&[6, 6, 6, 8]);
    assert_eq!(ring.len(), 4);
    let samples: Vec<u32> = ring.iter().collect();
    assert_eq!(samples, vec![6, 6, 6, 8]);
}

#[test]
fn test_ring_iteration_is_restartable() {
    let ring = feed::<4>(&[5, 9, 2, 7, 11]);
    let first: Vec<u32> = ring.iter().collect();
    let second: Vec<u32> = ring.iter().collect();
    assert_eq!(first, second);
    assert_eq!(ring.iter().len(), 4);
}

#[test]
fn test_ring_empty_iteration() {
    let ring: SampleRing<WallClock, u32, 8> = SampleRing::new(WallClock::new());
    assert!(ring.is_empty());
    assert_eq!(ring.iter().count(), 0);
}

#[test]
fn test_ring_with_real_clock() {
    let mut ring: SampleRing<CycleClock, u64, 32> = SampleRing::new(CycleClock::new());
    for _ in 0..10 {
        let token = ring.start();
        std::hint::black_box(1 + 1);
        ring.stop(token);
    }
    assert_eq!(ring.len(), 10);
}

#[test]
fn test_core_binding_is_paired_and_non_nested() {
    match bind_core(0) {
        Ok(binding) => {
            assert_eq!(bound_core(), Some(0));
            // nested binds are rejected while the guard is live
            assert!(bind_core(0).is_err());
            drop(binding);
            assert_eq!(bound_core(), None);

            // and a fresh bind succeeds once the previous one released
            let again = bind_core(0).expect("rebinding after release should work");
            drop(again);
            assert_eq!(bound_core(), None);
        }
        Err(err) => {
            // platforms without affinity support refuse rather than lie
            assert_eq!(bound_core(), None, "failed bind must not register: {}", err);
        }
    }
}
