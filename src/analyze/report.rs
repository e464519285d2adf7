use super::{Analysis, LockInfo};
use std::fmt;
use std::io::{self, Write};

const RULE: &str = "===============================================";
const UNNAMED: &str = "(unnamed)";

/// Write the human-readable report for `analysis`
///
/// # Errors
/// Returns an error if writing to `writer` fails.
pub fn print_report<W: Write>(mut writer: W, analysis: &Analysis) -> io::Result<()> {
    write!(writer, "{analysis}")?;
    writer.flush()
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "  LOCK CONTENTION ANALYSIS")?;
        writeln!(f, "{RULE}")?;
        writeln!(f)?;

        write_section(
            f,
            "STUCK: Started but never acquired (waiting for lock)",
            &self.stuck,
        )?;
        write_section(
            f,
            "HELD: Acquired but never released (holding lock)",
            &self.held,
        )?;

        writeln!(f, "=== SUMMARY ===")?;
        writeln!(f, "  Stuck waiting: {}", self.stuck.len())?;
        writeln!(f, "  Held:          {}", self.held.len())?;
        writeln!(f)
    }
}

fn write_section(f: &mut fmt::Formatter<'_>, title: &str, infos: &[LockInfo]) -> fmt::Result {
    writeln!(f, "=== {title} ===")?;
    if infos.is_empty() {
        writeln!(f, "  (none)")?;
    }
    for info in infos {
        let name = if info.name.is_empty() {
            UNNAMED
        } else {
            info.name.as_str()
        };
        writeln!(f, "  {:<6} | {:<20} | ID: {}", info.kind, name, info.id)?;
        if !info.trace.is_empty() {
            writeln!(f, "         Trace: {}", info.trace)?;
        }
    }
    writeln!(f)
}
