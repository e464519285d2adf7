//! Event sinks for lock lifecycle events
//!
//! A sink receives every event an instrumented lock emits. The default sink
//! writes JSON lines to standard output; tests usually collect into memory.

mod event_logger;

pub use event_logger::{EventSink, MemorySink, StdoutSink, WriterSink};
