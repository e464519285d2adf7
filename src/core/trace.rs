//! Caller chain capture for traced locks
//!
//! Produces `name:line` pairs, innermost caller first, joined by
//! [`SEPARATOR`]. Frames belonging to the backtrace machinery and to this
//! crate's lock instrumentation are skipped until the first foreign frame.

/// Separator between frames in a captured chain
pub const SEPARATOR: &str = " <- ";

// Leading frames matching these prefixes are never reported
const INSTRUMENTATION_PREFIXES: &[&str] = &[
    "backtrace::",
    concat!(env!("CARGO_CRATE_NAME"), "::core::"),
    "core::ptr::drop_in_place",
    "core::mem::drop",
];

/// Walk the current stack and return up to `depth` caller frames
///
/// Returns an empty string when `depth` is zero or no symbol could be
/// resolved.
pub fn caller_chain(depth: usize) -> String {
    if depth == 0 {
        return String::new();
    }

    let mut parts: Vec<String> = Vec::with_capacity(depth);
    let mut skipping = true;

    backtrace::trace(|frame| {
        // One frame may resolve to several symbols when calls were inlined
        backtrace::resolve_frame(frame, |symbol| {
            if parts.len() >= depth {
                return;
            }
            let Some(name) = symbol.name() else {
                return;
            };
            let full = format!("{name:#}");
            if skipping && is_instrumentation(&full) {
                return;
            }
            skipping = false;
            parts.push(format!(
                "{}:{}",
                short_name(&full),
                symbol.lineno().unwrap_or(0)
            ));
        });
        parts.len() < depth
    });

    parts.join(SEPARATOR)
}

fn is_instrumentation(symbol: &str) -> bool {
    let symbol = symbol.trim_start_matches('<');
    if symbol.contains("::tests::") {
        return false;
    }
    INSTRUMENTATION_PREFIXES
        .iter()
        .any(|prefix| symbol.starts_with(prefix))
}

/// Last path segment of a demangled symbol, e.g. `worker` for
/// `app::jobs::worker`
fn short_name(symbol: &str) -> &str {
    symbol.rsplit("::").next().unwrap_or(symbol)
}
