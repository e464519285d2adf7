//! Offline analysis of lock event logs
//!
//! Replays a stream of lifecycle events and reports, per acquisition attempt,
//! the ones that started but never acquired (stuck waiters) and the tracked
//! ones that acquired but never released (held locks). Only presence of each
//! phase matters; arrival order and timestamps are ignored, so a truncated or
//! reordered log is still analyzable.

mod report;
pub use report::print_report;

use crate::core::types::{CorrelationId, CorrelationKey, Event, LockKind, Phase};
use anyhow::{Context, Result};
use fxhash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One reported acquisition attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockInfo {
    /// Category of the lock operation
    pub kind: LockKind,
    /// Label of the lock or call site (may be empty)
    pub name: String,
    /// Correlation id of the attempt
    pub id: CorrelationId,
    /// Caller chain, if the lock was traced
    #[serde(skip_serializing_if = "String::is_empty")]
    pub trace: String,
}

impl From<Event> for LockInfo {
    fn from(event: Event) -> Self {
        LockInfo {
            kind: event.kind,
            name: event.name,
            id: event.id,
            trace: event.trace,
        }
    }
}

/// Result of one analysis pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Analysis {
    /// Started but never acquired (waiting for the lock)
    pub stuck: Vec<LockInfo>,
    /// Tracked, acquired but never released (holding the lock)
    pub held: Vec<LockInfo>,
}

impl Analysis {
    /// True when no attempt is stuck and no tracked lock is held
    pub fn is_clean(&self) -> bool {
        self.stuck.is_empty() && self.held.is_empty()
    }
}

/// Incremental lifecycle reconstruction
///
/// Feed events in any order with [`Analyzer::record`] or raw log lines with
/// [`Analyzer::ingest_line`], then call [`Analyzer::finish`]. An analyzer is
/// owned by one pass; run independent passes for independent inputs.
#[derive(Debug, Default)]
pub struct Analyzer {
    starts: FxHashMap<CorrelationKey, LockInfo>,
    acquires: FxHashMap<CorrelationKey, LockInfo>,
    releases: FxHashSet<CorrelationKey>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one event
    ///
    /// A repeated phase for the same key overwrites the earlier one.
    pub fn record(&mut self, event: Event) {
        let key = event.key();
        match event.state {
            Phase::Start => {
                self.starts.insert(key, event.into());
            }
            Phase::Acquired => {
                self.acquires.insert(key, event.into());
            }
            Phase::Released => {
                self.releases.insert(key);
            }
        }
    }

    /// Decode and record one log line
    ///
    /// Returns whether the line was a well-formed event. Anything else
    /// (blank lines, interleaved program output) is skipped.
    pub fn ingest_line(&mut self, line: &[u8]) -> bool {
        let line = line.trim_ascii();
        if line.is_empty() {
            return false;
        }
        match Event::from_json_slice(line) {
            Some(event) => {
                self.record(event);
                true
            }
            None => false,
        }
    }

    /// Classify every recorded attempt
    pub fn finish(self) -> Analysis {
        let Analyzer {
            starts,
            acquires,
            releases,
        } = self;

        let mut stuck: Vec<LockInfo> = starts
            .into_iter()
            .filter(|(key, _)| !acquires.contains_key(key))
            .map(|(_, info)| info)
            .collect();

        // Untracked kinds never emit RELEASED, so they can never be held
        let mut held: Vec<LockInfo> = acquires
            .into_iter()
            .filter(|(key, _)| key.kind.is_tracked() && !releases.contains(key))
            .map(|(_, info)| info)
            .collect();

        sort_for_report(&mut stuck);
        sort_for_report(&mut held);

        Analysis { stuck, held }
    }
}

/// Deterministic report order: by id, then kind, then name
fn sort_for_report(infos: &mut [LockInfo]) {
    infos.sort_by(|a, b| {
        a.id.cmp(&b.id)
            .then(a.kind.cmp(&b.kind))
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// Analyze newline-delimited event records from a reader
///
/// # Errors
/// Returns an error only if reading from `reader` fails; malformed lines
/// are skipped.
pub fn analyze<R: BufRead>(mut reader: R) -> Result<Analysis> {
    let mut analyzer = Analyzer::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .context("Failed to read event stream")?;
        if read == 0 {
            break;
        }
        analyzer.ingest_line(&line);
    }
    Ok(analyzer.finish())
}

/// Analyze a log file
///
/// # Errors
/// Returns an error if the file cannot be opened or read.
pub fn analyze_file<P: AsRef<Path>>(path: P) -> Result<Analysis> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open log file {}", path.display()))?;
    analyze(BufReader::new(file)).with_context(|| format!("Failed to analyze {}", path.display()))
}

/// Analyze already-decoded events
pub fn analyze_events<I>(events: I) -> Analysis
where
    I: IntoIterator<Item = Event>,
{
    let mut analyzer = Analyzer::new();
    for event in events {
        analyzer.record(event);
    }
    analyzer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, Read, Write};
    use tempfile::NamedTempFile;

    fn event(kind: LockKind, state: Phase, name: &str, id: u64) -> Event {
        Event::new(kind, state, name, id, "")
    }

    fn lines(events: &[Event]) -> String {
        events
            .iter()
            .map(|e| e.to_json_line().unwrap() + "\n")
            .collect()
    }

    #[test]
    fn test_complete_lifecycle_is_clean() {
        let analysis = analyze_events([
            event(LockKind::TrackedWrite, Phase::Start, "a", 1),
            event(LockKind::TrackedWrite, Phase::Acquired, "a", 1),
            event(LockKind::TrackedWrite, Phase::Released, "a", 1),
        ]);
        assert!(analysis.is_clean());
    }

    #[test]
    fn test_mixed_stream() {
        let analysis = analyze_events([
            event(LockKind::TrackedWrite, Phase::Start, "a", 1),
            event(LockKind::TrackedWrite, Phase::Acquired, "a", 1),
            event(LockKind::TrackedWrite, Phase::Released, "a", 1),
            event(LockKind::TrackedRead, Phase::Start, "b", 2),
            event(LockKind::TrackedRead, Phase::Acquired, "b", 2),
            event(LockKind::Write, Phase::Start, "c", 3),
        ]);

        assert_eq!(analysis.held.len(), 1);
        assert_eq!(analysis.held[0].id, 2);
        assert_eq!(analysis.held[0].kind, LockKind::TrackedRead);
        assert_eq!(analysis.stuck.len(), 1);
        assert_eq!(analysis.stuck[0].id, 3);
        assert_eq!(analysis.stuck[0].kind, LockKind::Write);
    }

    #[test]
    fn test_untracked_acquisitions_are_never_held() {
        let analysis = analyze_events([
            event(LockKind::Write, Phase::Start, "w", 1),
            event(LockKind::Write, Phase::Acquired, "w", 1),
            event(LockKind::Read, Phase::Start, "r", 2),
            event(LockKind::Read, Phase::Acquired, "r", 2),
        ]);
        assert!(analysis.is_clean());
    }

    #[test]
    fn test_order_of_arrival_does_not_matter() {
        let analysis = analyze_events([
            event(LockKind::TrackedWrite, Phase::Released, "a", 1),
            event(LockKind::TrackedWrite, Phase::Acquired, "a", 1),
            event(LockKind::TrackedWrite, Phase::Start, "a", 1),
        ]);
        assert!(analysis.is_clean());
    }

    #[test]
    fn test_acquired_without_start_is_held_not_stuck() {
        // Stream truncated at the front
        let analysis = analyze_events([event(LockKind::TrackedWrite, Phase::Acquired, "a", 5)]);
        assert!(analysis.stuck.is_empty());
        assert_eq!(analysis.held.len(), 1);
    }

    #[test]
    fn test_duplicates_overwrite() {
        let mut analyzer = Analyzer::new();
        analyzer.record(Event::new(LockKind::TrackedWrite, Phase::Acquired, "a", 1, "first:1"));
        analyzer.record(Event::new(LockKind::TrackedWrite, Phase::Acquired, "a", 1, "second:2"));
        let analysis = analyzer.finish();
        assert_eq!(analysis.held.len(), 1);
        assert_eq!(analysis.held[0].trace, "second:2");
    }

    #[test]
    fn test_key_includes_kind_and_name() {
        // Same id, different kind or name: independent attempts
        let analysis = analyze_events([
            event(LockKind::TrackedWrite, Phase::Start, "a", 1),
            event(LockKind::TrackedWrite, Phase::Acquired, "a", 1),
            event(LockKind::TrackedWrite, Phase::Released, "b", 1),
            event(LockKind::TrackedRead, Phase::Released, "a", 1),
        ]);
        assert_eq!(analysis.held.len(), 1);
        assert_eq!(analysis.held[0].name, "a");
    }

    #[test]
    fn test_results_sorted_by_id() {
        let analysis = analyze_events([
            event(LockKind::Write, Phase::Start, "", 30),
            event(LockKind::Write, Phase::Start, "", 10),
            event(LockKind::Read, Phase::Start, "", 20),
            event(LockKind::TrackedWrite, Phase::Acquired, "", 9),
            event(LockKind::TrackedRead, Phase::Acquired, "", 3),
        ]);
        let stuck: Vec<_> = analysis.stuck.iter().map(|i| i.id).collect();
        let held: Vec<_> = analysis.held.iter().map(|i| i.id).collect();
        assert_eq!(stuck, vec![10, 20, 30]);
        assert_eq!(held, vec![3, 9]);
    }

    #[test]
    fn test_ignores_non_event_lines() {
        let input = concat!(
            "not json\n",
            r#"{"kind":"LOCK","state":"START","name":"test","id":123,"ts":1234567890}"#,
            "\n",
            "also not json\n",
            "\n",
            r#"{"kind":"LOCK","state":"ACQUIRED","name":"test","id":123,"ts":1234567891}"#,
            "\n",
            r#"{"kind":"LOCK","state":"RELEASED","name":"test"}"#,
            "\n"
        );
        let analysis = analyze(Cursor::new(input)).unwrap();
        assert!(analysis.stuck.is_empty());
        assert_eq!(analysis.held.len(), 1);
        assert_eq!(analysis.held[0].name, "test");
    }

    #[test]
    fn test_non_utf8_noise_is_skipped() {
        let mut input = vec![0xff, 0xfe, b'\n'];
        input.extend_from_slice(
            lines(&[event(LockKind::Write, Phase::Start, "x", 4)]).as_bytes(),
        );
        let analysis = analyze(Cursor::new(input)).unwrap();
        assert_eq!(analysis.stuck.len(), 1);
    }

    #[test]
    fn test_crlf_and_missing_final_newline() {
        let mut input = lines(&[event(LockKind::TrackedRead, Phase::Start, "x", 4)]).replace('\n', "\r\n");
        input.push_str(&event(LockKind::TrackedRead, Phase::Acquired, "x", 4).to_json_line().unwrap());
        let analysis = analyze(Cursor::new(input)).unwrap();
        assert!(analysis.stuck.is_empty());
        assert_eq!(analysis.held.len(), 1);
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stream closed"))
        }
    }

    #[test]
    fn test_read_failure_is_an_error() {
        let result = analyze(io::BufReader::new(FailingReader));
        assert!(result.is_err());
    }

    #[test]
    fn test_analyze_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            "{}",
            lines(&[
                event(LockKind::TrackedWrite, Phase::Start, "f", 1),
                event(LockKind::TrackedWrite, Phase::Acquired, "f", 1),
            ])
        )?;
        file.flush()?;

        let analysis = analyze_file(file.path())?;
        assert_eq!(analysis.held.len(), 1);
        Ok(())
    }

    #[test]
    fn test_analyze_missing_file() {
        let err = analyze_file("/definitely/not/here.log").unwrap_err();
        assert!(format!("{err:#}").contains("Failed to open log file"));
    }

    #[test]
    fn test_analysis_serializes() {
        let analysis = analyze_events([Event::new(LockKind::TrackedRead, Phase::Acquired, "s", 2, "")]);
        let json = serde_json::to_string(&analysis).unwrap();
        assert_eq!(
            json,
            r#"{"stuck":[],"held":[{"kind":"RLOCK","name":"s","id":2}]}"#
        );
    }
}
