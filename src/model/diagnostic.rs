use std::ops::Range;

/// Diagnostic severity as reported by the analysis backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Suggestion,
    Message,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Suggestion => "suggestion",
            Severity::Message => "info",
        }
    }
}

/// A problem reported for one buffer version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Character offsets into the buffer
    pub range: Range<usize>,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(range: Range<usize>, message: impl Into<String>) -> Self {
        Self {
            range,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    /// Whether the diagnostic touches the half-open span `start..end`.
    ///
    /// An empty diagnostic range counts when it sits inside the span.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        if self.range.start == self.range.end {
            return start <= self.range.start && self.range.start < end;
        }
        self.range.start < end && start < self.range.end
    }

    /// Restrict the range to `[0, len]`
    pub fn clamped(mut self, len: usize) -> Self {
        let end = self.range.end.min(len);
        let start = self.range.start.min(end);
        self.range = start..end;
        self
    }
}
