//! # Locklog
//!
//! Lock lifecycle logging with offline leak and stuck-waiter analysis.
//!
//! Locklog wraps a reader-writer lock so that every acquisition attempt,
//! successful acquisition and (for tracked operations) release is emitted as
//! a JSON event. The analyzer later replays such a log and reports attempts
//! that never got the lock and tracked locks that were never given back.
//!
//! ## Features
//!
//! - Drop-in `RwLock` with untracked (`read`/`write`) and tracked
//!   (`read_tracked`/`write_tracked`) acquisition paths
//! - Pluggable event sinks: stdout, any writer, in-memory, or a closure
//! - Optional caller-chain capture per event
//! - Log analysis tolerant of interleaved output, reordering and truncation
//! - `locklog analyze` command-line tool
//!
//! ## Example
//!
//! ```rust
//! use locklog::{LockOptions, MemorySink, RwLock, analyze_events};
//! use std::sync::Arc;
//!
//! let sink = Arc::new(MemorySink::new());
//! let lock = RwLock::with_options(0, LockOptions::new().with_name("jobs").with_shared_sink(sink.clone()));
//!
//! let guard = lock.write_tracked();
//! // Analyzing while the guard is alive reports it as held
//! assert_eq!(analyze_events(sink.snapshot()).held.len(), 1);
//! guard.release();
//! assert!(analyze_events(sink.snapshot()).is_clean());
//! ```

mod core;
pub use self::core::{
    CallOptions, EventSink, LockOptions, MemorySink, RwLock, RwLockReadGuard, RwLockWriteGuard,
    StdoutSink, TrackedReadGuard, TrackedWriteGuard, WriterSink,
    trace::caller_chain,
    types::{CorrelationId, CorrelationKey, Event, LockKind, Phase, next_correlation_id},
};

pub mod analyze;
pub use analyze::{Analysis, Analyzer, LockInfo, analyze, analyze_events, analyze_file, print_report};
