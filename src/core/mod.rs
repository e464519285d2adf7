// Core types
pub mod types;

// Event sinks
pub mod logger;
pub use logger::{EventSink, MemorySink, StdoutSink, WriterSink};

// Caller chain capture
pub mod trace;

// Instrumented locks
pub mod locks;
pub use locks::rwlock::{
    RwLock, RwLockReadGuard, RwLockWriteGuard, TrackedReadGuard, TrackedWriteGuard,
};

use std::sync::Arc;

/// Construction-time configuration of an instrumented lock
///
/// By default:
/// - The lock is unnamed
/// - Events go to standard output as JSON lines
/// - Trace capture is disabled
#[derive(Clone)]
pub struct LockOptions {
    pub(crate) name: String,
    pub(crate) sink: Option<Arc<dyn EventSink>>,
    pub(crate) trace_depth: usize,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl LockOptions {
    /// Create options with the default settings
    pub fn new() -> Self {
        LockOptions {
            name: String::new(),
            sink: Some(Arc::new(StdoutSink)),
            trace_depth: 0,
        }
    }

    /// Set the label carried by every event of this lock
    ///
    /// # Returns
    /// The builder for method chaining
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Send events to the given sink
    ///
    /// # Returns
    /// The builder for method chaining
    pub fn with_sink<S>(mut self, sink: S) -> Self
    where
        S: EventSink + 'static,
    {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Send events to a sink shared with other locks
    ///
    /// # Returns
    /// The builder for method chaining
    pub fn with_shared_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Disable event emission entirely
    ///
    /// The lock then behaves exactly like the wrapped primitive.
    pub fn without_sink(mut self) -> Self {
        self.sink = None;
        self
    }

    /// Capture up to `depth` caller frames on every event; 0 disables
    ///
    /// # Returns
    /// The builder for method chaining
    pub fn with_trace(mut self, depth: usize) -> Self {
        self.trace_depth = depth;
        self
    }
}

impl std::fmt::Debug for LockOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockOptions")
            .field("name", &self.name)
            .field("sink", &self.sink.is_some())
            .field("trace_depth", &self.trace_depth)
            .finish()
    }
}

/// Per-call options for a tracked acquisition
///
/// Merged with the lock's own configuration for the duration of one call;
/// never stored back onto the lock.
#[derive(Debug, Default, Clone, Copy)]
pub struct CallOptions<'a> {
    pub(crate) name: Option<&'a str>,
}

impl<'a> CallOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label this acquisition instead of using the lock's name
    pub fn with_name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }
}
