//! An instrumented reader-writer lock
//!
//! This RwLock provides the same interface as a standard reader-writer lock
//! but emits a lifecycle event around every acquisition. Plain `read()` and
//! `write()` are the untracked path: they emit START and ACQUIRED only.
//! `read_tracked()` and `write_tracked()` return guards that also emit
//! RELEASED, which is what lets the analyzer spot leaked locks.
//!
//! # Example
//!
//! ```rust
//! use locklog::{LockOptions, MemorySink, RwLock};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let sink = Arc::new(MemorySink::new());
//! let lock = Arc::new(RwLock::with_options(
//!     10,
//!     LockOptions::new().with_name("counter").with_shared_sink(sink.clone()),
//! ));
//! let lock_clone = Arc::clone(&lock);
//!
//! thread::spawn(move || {
//!     let data = lock_clone.read();
//!     println!("Read: {}", *data);
//! })
//! .join()
//! .unwrap();
//!
//! let mut data = lock.write_tracked();
//! *data += 1;
//! data.release();
//!
//! assert_eq!(sink.len(), 5);
//! ```

use crate::core::trace;
use crate::core::types::{CorrelationId, Event, LockKind, Phase, next_correlation_id};
use crate::core::{CallOptions, EventSink, LockOptions};
use parking_lot::{
    RwLock as ParkingLotRwLock, RwLockReadGuard as ParkingLotReadGuard,
    RwLockWriteGuard as ParkingLotWriteGuard,
};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Emission state shared by a lock and its tracked guards
struct Instrumentation {
    name: String,
    sink: Option<Arc<dyn EventSink>>,
    trace_depth: usize,
}

impl Instrumentation {
    fn emit(&self, kind: LockKind, state: Phase, name: &str, id: CorrelationId) {
        let Some(sink) = &self.sink else {
            return;
        };
        let trace = trace::caller_chain(self.trace_depth);
        sink.emit(&Event::new(kind, state, name, id, trace));
    }

    /// Run one acquisition: START, block in `lock`, then ACQUIRED
    ///
    /// The correlation id is drawn before blocking so a waiter that never
    /// gets the lock is still identifiable.
    fn acquire<G>(
        &self,
        kind: LockKind,
        name: &str,
        lock: impl FnOnce() -> G,
    ) -> (G, CorrelationId) {
        let id = next_correlation_id();
        self.emit(kind, Phase::Start, name, id);
        let guard = lock();
        self.emit(kind, Phase::Acquired, name, id);
        (guard, id)
    }

    /// Merge call-site options over the lock's own label
    fn resolve_name(&self, options: CallOptions<'_>) -> String {
        options.name.unwrap_or(&self.name).to_owned()
    }
}

/// A RELEASED event owed by a tracked guard
struct PendingRelease<'a> {
    instrumentation: &'a Instrumentation,
    kind: LockKind,
    name: String,
    id: CorrelationId,
}

impl Drop for PendingRelease<'_> {
    fn drop(&mut self) {
        self.instrumentation
            .emit(self.kind, Phase::Released, &self.name, self.id);
    }
}

/// A reader-writer lock that reports its acquisitions to an [`EventSink`]
///
/// Blocking behavior is exactly that of the wrapped `parking_lot` lock;
/// events are emitted synchronously on the calling thread.
pub struct RwLock<T> {
    instrumentation: Instrumentation,
    inner: ParkingLotRwLock<T>,
}

/// Guard for an untracked shared lock, unlocks when dropped
pub struct RwLockReadGuard<'a, T> {
    guard: ParkingLotReadGuard<'a, T>,
}

/// Guard for an untracked exclusive lock, unlocks when dropped
pub struct RwLockWriteGuard<'a, T> {
    guard: ParkingLotWriteGuard<'a, T>,
}

/// Release capability for a tracked shared lock
///
/// Releasing (explicitly or by drop) emits RELEASED and then unlocks.
pub struct TrackedReadGuard<'a, T> {
    // Must stay declared before `guard`: fields drop in order, so the
    // RELEASED event goes out before the lock is given up.
    release: PendingRelease<'a>,
    guard: ParkingLotReadGuard<'a, T>,
}

/// Release capability for a tracked exclusive lock
///
/// Releasing (explicitly or by drop) emits RELEASED and then unlocks.
pub struct TrackedWriteGuard<'a, T> {
    // Same ordering constraint as TrackedReadGuard.
    release: PendingRelease<'a>,
    guard: ParkingLotWriteGuard<'a, T>,
}

impl<T> RwLock<T> {
    /// Create a lock with the default options (unnamed, stdout sink, no traces)
    ///
    /// # Example
    ///
    /// ```rust
    /// use locklog::RwLock;
    /// let lock = RwLock::new(42);
    /// ```
    pub fn new(value: T) -> Self {
        Self::with_options(value, LockOptions::default())
    }

    /// Create a lock with explicit options
    ///
    /// # Example
    ///
    /// ```rust
    /// use locklog::{LockOptions, RwLock};
    /// let lock = RwLock::with_options(0u32, LockOptions::new().with_name("jobs").without_sink());
    /// assert_eq!(lock.name(), "jobs");
    /// ```
    pub fn with_options(value: T, options: LockOptions) -> Self {
        RwLock {
            instrumentation: Instrumentation {
                name: options.name,
                sink: options.sink,
                trace_depth: options.trace_depth,
            },
            inner: ParkingLotRwLock::new(value),
        }
    }

    /// The lock's configured label
    pub fn name(&self) -> &str {
        &self.instrumentation.name
    }

    /// Configured trace depth; 0 means traces are disabled
    pub fn trace_depth(&self) -> usize {
        self.instrumentation.trace_depth
    }

    /// Whether this lock emits events at all
    pub fn is_instrumented(&self) -> bool {
        self.instrumentation.sink.is_some()
    }

    /// Acquire an exclusive lock on the untracked path
    ///
    /// Emits START and ACQUIRED. Dropping the guard only unlocks.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        let (guard, _) = self.instrumentation.acquire(
            LockKind::Write,
            &self.instrumentation.name,
            || self.inner.write(),
        );
        RwLockWriteGuard { guard }
    }

    /// Acquire a shared lock on the untracked path
    ///
    /// Emits START and ACQUIRED. Dropping the guard only unlocks.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        let (guard, _) = self.instrumentation.acquire(
            LockKind::Read,
            &self.instrumentation.name,
            || self.inner.read(),
        );
        RwLockReadGuard { guard }
    }

    /// Acquire an exclusive lock whose release is recorded
    pub fn write_tracked(&self) -> TrackedWriteGuard<'_, T> {
        self.write_tracked_with(CallOptions::default())
    }

    /// Acquire an exclusive lock whose release is recorded, with call-site options
    ///
    /// # Example
    ///
    /// ```rust
    /// use locklog::{CallOptions, LockOptions, RwLock};
    ///
    /// let lock = RwLock::with_options(Vec::new(), LockOptions::new().with_name("queue").without_sink());
    /// let mut queue = lock.write_tracked_with(CallOptions::new().with_name("enqueue"));
    /// queue.push(1);
    /// assert_eq!(queue.name(), "enqueue");
    /// queue.release();
    /// assert_eq!(lock.name(), "queue");
    /// ```
    pub fn write_tracked_with(&self, options: CallOptions<'_>) -> TrackedWriteGuard<'_, T> {
        let name = self.instrumentation.resolve_name(options);
        let (guard, id) = self
            .instrumentation
            .acquire(LockKind::TrackedWrite, &name, || self.inner.write());
        TrackedWriteGuard {
            release: PendingRelease {
                instrumentation: &self.instrumentation,
                kind: LockKind::TrackedWrite,
                name,
                id,
            },
            guard,
        }
    }

    /// Acquire a shared lock whose release is recorded
    pub fn read_tracked(&self) -> TrackedReadGuard<'_, T> {
        self.read_tracked_with(CallOptions::default())
    }

    /// Acquire a shared lock whose release is recorded, with call-site options
    pub fn read_tracked_with(&self, options: CallOptions<'_>) -> TrackedReadGuard<'_, T> {
        let name = self.instrumentation.resolve_name(options);
        let (guard, id) = self
            .instrumentation
            .acquire(LockKind::TrackedRead, &name, || self.inner.read());
        TrackedReadGuard {
            release: PendingRelease {
                instrumentation: &self.instrumentation,
                kind: LockKind::TrackedRead,
                name,
                id,
            },
            guard,
        }
    }

    /// Returns a mutable reference to the underlying data
    ///
    /// Since this call borrows the RwLock mutably, no locking takes place and
    /// no event is emitted.
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    /// Consumes this RwLock, returning the underlying data
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T> std::fmt::Debug for RwLock<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RwLock")
            .field("name", &self.instrumentation.name)
            .field("instrumented", &self.is_instrumented())
            .field("trace_depth", &self.instrumentation.trace_depth)
            .finish_non_exhaustive()
    }
}

// --- Guard Implementations ---

impl<T> RwLockReadGuard<'_, T> {
    /// Unlock; same as dropping the guard
    pub fn release(self) {}
}

impl<T> Deref for RwLockReadGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        self.guard.deref()
    }
}

impl<T> RwLockWriteGuard<'_, T> {
    /// Unlock; same as dropping the guard
    pub fn release(self) {}
}

impl<T> Deref for RwLockWriteGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        self.guard.deref()
    }
}
impl<T> DerefMut for RwLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.guard.deref_mut()
    }
}

impl<T> TrackedReadGuard<'_, T> {
    /// Correlation id shared by this acquisition's events
    pub fn id(&self) -> CorrelationId {
        self.release.id
    }

    /// Label this acquisition was recorded under
    pub fn name(&self) -> &str {
        &self.release.name
    }

    /// Emit RELEASED, then unlock
    ///
    /// Consumes the guard, so a second release cannot be expressed.
    pub fn release(self) {}
}

impl<T> Deref for TrackedReadGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        self.guard.deref()
    }
}

impl<T> TrackedWriteGuard<'_, T> {
    /// Correlation id shared by this acquisition's events
    pub fn id(&self) -> CorrelationId {
        self.release.id
    }

    /// Label this acquisition was recorded under
    pub fn name(&self) -> &str {
        &self.release.name
    }

    /// Emit RELEASED, then unlock
    ///
    /// Consumes the guard, so a second release cannot be expressed.
    pub fn release(self) {}
}

impl<T> Deref for TrackedWriteGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        self.guard.deref()
    }
}
impl<T> DerefMut for TrackedWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.guard.deref_mut()
    }
}

// Trait implementations for better compatibility with std

impl<T: Default> Default for RwLock<T> {
    /// Creates a new `RwLock<T>` with default options and the Default value for T
    fn default() -> RwLock<T> {
        RwLock::new(Default::default())
    }
}

impl<T> From<T> for RwLock<T> {
    /// Equivalent to RwLock::new
    fn from(t: T) -> Self {
        RwLock::new(t)
    }
}
