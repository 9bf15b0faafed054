use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CandelaError, Granularity};

/// One successfully warmed `(product, granularity)` combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefetchEntry {
    /// Exchange product id.
    pub product_id: String,
    /// Candle width that was warmed.
    pub granularity: Granularity,
    /// Inclusive start of the range now covered by the cache.
    pub start: DateTime<Utc>,
    /// Exclusive end of the range now covered by the cache.
    pub end: DateTime<Utc>,
    /// Number of candles inside `[start, end)`.
    pub candles: usize,
}

/// A combination that failed and was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefetchFailure {
    /// Exchange product id.
    pub product_id: String,
    /// Candle width that failed.
    pub granularity: Granularity,
    /// Why it failed.
    pub error: CandelaError,
}

/// Outcome of a batch prefetch. Failures never abort the rest of the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrefetchReport {
    /// Combinations that were fetched (or already cached).
    pub entries: Vec<PrefetchEntry>,
    /// Combinations that failed, in completion order.
    pub warnings: Vec<PrefetchFailure>,
}

impl PrefetchReport {
    /// True when every combination succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}
