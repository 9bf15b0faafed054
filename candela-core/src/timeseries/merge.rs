use std::collections::{BTreeMap, btree_map::Entry};

use chrono::{DateTime, Utc};

use crate::Candle;

/// Merge candle batches in priority order (first is highest).
///
/// Candles are keyed by `ts`; the first appearance wins for duplicates and the
/// result is sorted by timestamp.
pub fn merge_candles_by_priority<I>(series: I) -> Vec<Candle>
where
    I: IntoIterator<Item = Vec<Candle>>,
{
    let mut map: BTreeMap<DateTime<Utc>, Candle> = BTreeMap::new();
    for batch in series {
        for c in batch {
            if let Entry::Vacant(v) = map.entry(c.ts) {
                v.insert(c);
            }
        }
    }
    map.into_values().collect()
}
