// crates/core/src/tail.rs
//! Bounded tail of a process's console output, kept for error reports.

/// Default number of characters retained.
pub const DEFAULT_TAIL_CHARS: usize = 500;

/// Keeps only the last `capacity` characters of everything pushed into it.
///
/// Lines are joined with `\n`. Trimming always lands on a char boundary, so
/// multi-byte progress-bar glyphs never split.
#[derive(Debug, Clone)]
pub struct OutputTail {
    buf: String,
    capacity: usize,
    chars: usize,
}

impl OutputTail {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: String::new(),
            capacity,
            chars: 0,
        }
    }

    /// Append one line of output.
    pub fn push_line(&mut self, line: &str) {
        if !self.buf.is_empty() {
            self.buf.push('\n');
            self.chars += 1;
        }
        self.buf.push_str(line);
        self.chars += line.chars().count();
        self.trim();
    }

    fn trim(&mut self) {
        if self.chars <= self.capacity {
            return;
        }
        let excess = self.chars - self.capacity;
        let cut = self
            .buf
            .char_indices()
            .nth(excess)
            .map(|(idx, _)| idx)
            .unwrap_or(self.buf.len());
        self.buf.drain(..cut);
        self.chars = self.capacity;
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

impl Default for OutputTail {
    fn default() -> Self {
        Self::new(DEFAULT_TAIL_CHARS)
    }
}
