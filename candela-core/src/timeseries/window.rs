use chrono::{DateTime, TimeDelta, Utc};

/// A half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Window {
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Exclusive end.
    pub end: DateTime<Utc>,
}

impl Window {
    /// Length of the window.
    #[must_use]
    pub fn span(&self) -> TimeDelta {
        self.end - self.start
    }
}

/// Split `[start, end)` into consecutive windows of at most `step`.
///
/// Windows are contiguous and ordered; the last one is truncated at `end`.
/// An empty or inverted range yields no windows. A non-positive `step` yields
/// the whole range as a single window.
#[must_use]
pub fn partition(start: DateTime<Utc>, end: DateTime<Utc>, step: TimeDelta) -> Vec<Window> {
    if start >= end {
        return Vec::new();
    }
    if step <= TimeDelta::zero() {
        return vec![Window { start, end }];
    }
    let mut out = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let next = cursor.checked_add_signed(step).map_or(end, |t| t.min(end));
        out.push(Window {
            start: cursor,
            end: next,
        });
        cursor = next;
    }
    out
}
