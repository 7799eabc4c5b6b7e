// crates/core/src/progress.rs
//! Progress extraction from the separation tool's console output.
//!
//! The tool draws a tqdm-style bar on stderr, e.g.
//! ` 45%|█████████▉            | 105.3/234.0 [00:41<00:50,  2.55seconds/s]`.
//! The percentage is the numeral between the last `|` before the first `%`
//! and that `%`, with spaces removed.

use crate::types::ProgressEvent;

/// Parse a progress percentage out of one output line.
///
/// Returns `None` for lines that are not progress lines, whose numeral does
/// not parse as an integer, or whose value lies outside `[0, 100]`.
pub fn parse_progress_line(line: &str) -> Option<u8> {
    if !line.contains('%') || !line.contains('|') {
        return None;
    }
    let before_percent = line.split('%').next()?;
    let numeral = before_percent.rsplit('|').next()?.trim().replace(' ', "");
    let value: i64 = numeral.parse().ok()?;
    u8::try_from(value).ok().filter(|v| *v <= 100)
}

/// Cumulative progress for one job.
///
/// Only forwards values that keep the sequence non-decreasing. Bags of
/// models (`mdx_extra_q`) restart the bar for each member; those restarts
/// are swallowed.
#[derive(Debug, Default, Clone)]
pub struct ProgressTracker {
    current: Option<u8>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last emitted value, 0 before anything was observed.
    pub fn current(&self) -> u8 {
        self.current.unwrap_or(0)
    }

    /// Feed one output line; returns the event to emit, if any.
    pub fn observe_line(&mut self, line: &str) -> Option<ProgressEvent> {
        let value = parse_progress_line(line)?;
        self.advance(value)
    }

    /// Record a parsed value; returns the event to emit, if any.
    pub fn advance(&mut self, value: u8) -> Option<ProgressEvent> {
        if self.current.is_some_and(|current| value < current) {
            return None;
        }
        let event = ProgressEvent::new(value)?;
        self.current = Some(value);
        Some(event)
    }

    /// The closing event of a successful run; always 100.
    pub fn complete(&mut self) -> ProgressEvent {
        self.current = Some(100);
        ProgressEvent::COMPLETE
    }
}
