use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Correlation identifier type
///
/// Shared by every event of one acquisition attempt (START, ACQUIRED and,
/// for tracked kinds, RELEASED).
pub type CorrelationId = u64;

/// Number of low bits holding the per-process attempt sequence
const SEQUENCE_BITS: u32 = 48;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

// Global counter for acquisition attempts in this process
static NEXT_ATTEMPT: AtomicU64 = AtomicU64::new(1);

lazy_static::lazy_static! {
    // Random per-process tag kept below bit 63 so ids stay positive as i64
    static ref PROCESS_TAG: u64 = u64::from(rand::random::<u16>() & 0x7FFF) << SEQUENCE_BITS;
}

/// Allocate a fresh correlation id for one acquisition attempt
///
/// The low 48 bits are a process-wide monotonic sequence, so two attempts in
/// the same process never share an id; the high bits are a random tag chosen
/// once per process, so logs merged from several processes rarely collide.
pub fn next_correlation_id() -> CorrelationId {
    let sequence = NEXT_ATTEMPT.fetch_add(1, Ordering::Relaxed) & SEQUENCE_MASK;
    *PROCESS_TAG | sequence
}

/// The category of a lock operation
///
/// Distinguishes exclusive from shared acquisition, and tracked operations
/// (which also emit RELEASED) from untracked ones (which never do).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockKind {
    /// Untracked exclusive (write) acquisition
    #[serde(rename = "WLOCK")]
    Write,
    /// Untracked shared (read) acquisition
    #[serde(rename = "RWLOCK")]
    Read,
    /// Tracked exclusive acquisition, emits RELEASED
    #[serde(rename = "LOCK")]
    TrackedWrite,
    /// Tracked shared acquisition, emits RELEASED
    #[serde(rename = "RLOCK")]
    TrackedRead,
}

impl LockKind {
    /// Whether this kind emits a RELEASED event when the lock is given up
    pub fn is_tracked(self) -> bool {
        matches!(self, LockKind::TrackedWrite | LockKind::TrackedRead)
    }

    /// Whether this kind is a shared (reader) acquisition
    pub fn is_shared(self) -> bool {
        matches!(self, LockKind::Read | LockKind::TrackedRead)
    }

    /// The tag written on the wire
    pub fn as_str(self) -> &'static str {
        match self {
            LockKind::Write => "WLOCK",
            LockKind::Read => "RWLOCK",
            LockKind::TrackedWrite => "LOCK",
            LockKind::TrackedRead => "RLOCK",
        }
    }
}

impl std::fmt::Display for LockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Pad-aware so the report can align columns
        f.pad(self.as_str())
    }
}

/// Lifecycle phase of one acquisition attempt
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// About to block on the underlying primitive
    Start,
    /// The underlying primitive granted the lock
    Acquired,
    /// The lock was given up (tracked kinds only)
    Released,
}

/// One observation of a lock lifecycle transition
///
/// This is also the wire record: one JSON object per line, with `trace`
/// omitted when empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    /// Category of the lock operation
    #[serde(alias = "type")]
    pub kind: LockKind,
    /// Lifecycle phase
    pub state: Phase,
    /// Label of the lock instance or call site (may be empty)
    #[serde(default)]
    pub name: String,
    /// Correlation id of the acquisition attempt
    pub id: CorrelationId,
    /// Caller chain, empty unless trace capture is enabled
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub trace: String,
    /// Nanoseconds since the Unix epoch at emission
    pub ts: i64,
}

impl Event {
    /// Create an event stamped with the current time
    pub fn new(
        kind: LockKind,
        state: Phase,
        name: impl Into<String>,
        id: CorrelationId,
        trace: impl Into<String>,
    ) -> Self {
        Event {
            kind,
            state,
            name: name.into(),
            id,
            trace: trace.into(),
            ts: now_nanos(),
        }
    }

    /// The identity used to group events of one acquisition attempt
    pub fn key(&self) -> CorrelationKey {
        CorrelationKey {
            kind: self.kind,
            name: self.name.clone(),
            id: self.id,
        }
    }

    /// Encode as a single wire line, without the trailing newline
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decode one wire line, or `None` if it is not a well-formed record
    pub fn from_json_slice(line: &[u8]) -> Option<Self> {
        serde_json::from_slice(line).ok()
    }
}

/// Grouping key for the events of one acquisition attempt
///
/// Only meaningful within a single analysis pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationKey {
    pub kind: LockKind,
    pub name: String,
    pub id: CorrelationId,
}

fn now_nanos() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
}
