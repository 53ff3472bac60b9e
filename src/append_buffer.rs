//! Growable byte storage with a two-phase reserve/commit write protocol.
//!
//! The encoders in this crate never push bytes one at a time. They compute
//! the exact width of their output first, `reserve` that many bytes, write
//! digits directly into the returned span, and `commit` what they used.
//! Separating "obtain writable space" from "declare how much was written"
//! keeps the hot path free of bounds rechecks and backtracking.

/// A contiguous byte buffer written through reserve/commit.
///
/// At most one reservation may be outstanding at a time. `commit(m)` with
/// `m` no larger than the reserved size makes the first `m` bytes of the
/// span part of the buffer and discards the rest. Growth reallocates the
/// backing storage; committed bytes are preserved across growth, while an
/// uncommitted span is invalidated (the borrow checker enforces this: the
/// span borrows the buffer mutably).
///
/// Contract violations (a second `reserve` before `commit`, or committing
/// more than was reserved) panic in debug builds and are unchecked in
/// release builds.
///
/// An `AppendBuffer` is exclusively owned by one thread at a time; it is
/// deliberately a plain data type with no interior synchronization.
///
/// # Examples
///
/// ```
/// use deferlog::AppendBuffer;
///
/// let mut buf = AppendBuffer::new();
/// let span = buf.reserve(4);
/// span[0] = b'a';
/// span[1] = b'b';
/// buf.commit(2);
/// assert_eq!(buf.as_bytes(), b"ab");
/// ```
pub struct AppendBuffer {
    data: Vec<u8>,
    committed: usize,
    /// Size of the outstanding reservation, 0 when none.
    reserved: usize,
}

impl AppendBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            committed: 0,
            reserved: 0,
        }
    }

    /// Creates an empty buffer with at least `capacity` bytes pre-allocated.
    ///
    /// The writer thread reuses one sized buffer across records so that
    /// steady-state encoding never allocates.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            committed: 0,
            reserved: 0,
        }
    }

    /// Reserves a writable span of exactly `n` bytes immediately after the
    /// committed region, growing the backing storage if needed.
    ///
    /// Growth never disturbs committed bytes. Allocation failure aborts the
    /// process (the standard library's allocation error path); partially
    /// written state is never observable.
    pub fn reserve(&mut self, n: usize) -> &mut [u8] {
        debug_assert_eq!(self.reserved, 0, "reserve while a reservation is outstanding");
        self.data.resize(self.committed + n, 0);
        self.reserved = n;
        &mut self.data[self.committed..self.committed + n]
    }

    /// Commits the first `m` bytes of the outstanding reservation.
    ///
    /// Requires `m` to be at most the size passed to the matching
    /// `reserve`; the remaining bytes of the span are discarded.
    pub fn commit(&mut self, m: usize) {
        debug_assert!(m <= self.reserved, "commit of {} exceeds reservation of {}", m, self.reserved);
        self.committed += m;
        self.data.truncate(self.committed);
        self.reserved = 0;
    }

    /// Appends `bytes` verbatim (a reserve/copy/commit in one step).
    ///
    /// Used for literal format-string segments and pre-rendered text.
    pub fn extend(&mut self, bytes: &[u8]) {
        let span = self.reserve(bytes.len());
        span.copy_from_slice(bytes);
        self.commit(bytes.len());
    }

    /// The committed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.committed]
    }

    /// Number of committed bytes.
    pub fn len(&self) -> usize {
        self.committed
    }

    /// True if nothing has been committed.
    pub fn is_empty(&self) -> bool {
        self.committed == 0
    }

    /// Discards all committed bytes, keeping the allocation for reuse.
    pub fn clear(&mut self) {
        debug_assert_eq!(self.reserved, 0, "clear while a reservation is outstanding");
        self.data.clear();
        self.committed = 0;
    }
}

impl Default for AppendBuffer {
    fn default() -> Self {
        Self::new()
    }
}
