use crate::core::types::Event;
use parking_lot::Mutex;
use std::io::{self, Write};

/// Consumer of lock lifecycle events
///
/// Sinks are called synchronously on the thread performing the lock
/// operation, possibly from many threads at once, so implementations must
/// serialize their own output. A sink must not block on the lock it is
/// observing.
pub trait EventSink: Send + Sync {
    /// Consume one event
    fn emit(&self, event: &Event);
}

impl<F> EventSink for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn emit(&self, event: &Event) {
        self(event)
    }
}

/// Default sink: one JSON line per event on standard output
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn emit(&self, event: &Event) {
        if let Ok(json) = event.to_json_line() {
            // The stdout lock keeps lines from concurrent emitters whole
            let mut out = io::stdout().lock();
            let _ = writeln!(out, "{json}");
        }
    }
}

/// Sink writing one JSON line per event into any writer
///
/// Writes are serialized through an internal mutex. Write errors are
/// dropped so that instrumentation never changes locking behavior.
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        WriterSink {
            writer: Mutex::new(writer),
        }
    }

    /// Flush the underlying writer
    pub fn flush(&self) -> io::Result<()> {
        self.writer.lock().flush()
    }

    /// Give the writer back
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> EventSink for WriterSink<W> {
    fn emit(&self, event: &Event) {
        if let Ok(json) = event.to_json_line() {
            let mut writer = self.writer.lock();
            let _ = writeln!(writer, "{json}");
        }
    }
}

/// In-memory event collector
///
/// Mostly useful in tests, or to hand a live snapshot straight to the
/// analyzer without going through text.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event collected so far, in emission order
    pub fn snapshot(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Drop every collected event
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Render the collected events as newline-delimited wire records
    pub fn to_json_lines(&self) -> String {
        let events = self.events.lock();
        let mut out = String::new();
        for event in events.iter() {
            if let Ok(json) = event.to_json_line() {
                out.push_str(&json);
                out.push('\n');
            }
        }
        out
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &Event) {
        self.events.lock().push(event.clone());
    }
}
