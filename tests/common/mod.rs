use locklog::{Analysis, LockOptions, MemorySink, RwLock, analyze};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

/// How long to give a contender to reach its blocking point
#[allow(dead_code)]
pub const BLOCK_SETTLE: Duration = Duration::from_millis(50);

pub struct Recorder {
    pub sink: Arc<MemorySink>,
}

impl Recorder {
    pub fn new() -> Self {
        Recorder {
            sink: Arc::new(MemorySink::new()),
        }
    }

    /// Options for a lock that reports into this recorder
    pub fn options(&self, name: &str) -> LockOptions {
        LockOptions::new()
            .with_name(name)
            .with_shared_sink(self.sink.clone())
    }

    pub fn lock<T>(&self, value: T, name: &str) -> Arc<RwLock<T>> {
        Arc::new(RwLock::with_options(value, self.options(name)))
    }

    /// Analyze everything recorded so far, going through the wire format
    pub fn analyze(&self) -> Analysis {
        analyze(Cursor::new(self.sink.to_json_lines())).expect("in-memory read cannot fail")
    }
}

#[allow(dead_code)]
pub fn ids(infos: &[locklog::LockInfo]) -> Vec<u64> {
    infos.iter().map(|info| info.id).collect()
}
