/// Receives completion updates from long-running fetches.
///
/// `percent` is in `[0, 100]` and never decreases within one operation.
pub trait Progress: Send + Sync {
    /// Report that `percent` of the work is done.
    fn report(&self, percent: u8);
}

/// Progress sink that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&self, _percent: u8) {}
}

impl<F> Progress for F
where
    F: Fn(u8) + Send + Sync,
{
    fn report(&self, percent: u8) {
        self(percent);
    }
}

/// Integer percentage of `done` out of `total`, saturating at 100.
#[must_use]
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = done.min(total) * 100 / total;
    u8::try_from(pct).unwrap_or(100)
}
