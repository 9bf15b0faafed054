use std::sync::Arc;

use chrono::{DateTime, Utc};

use candela_core::progress::percent;
use candela_core::{
    CandelaError, CandleRange, Granularity, NoProgress, Progress, merge_candles_by_priority,
};

use super::store::{CacheEntry, CacheKey, CandleStore};
use crate::fetcher::ChunkedFetcher;
use crate::locks::KeyedLocks;

#[derive(Default)]
struct Slot {
    loaded: bool,
    entry: Option<CacheEntry>,
}

/// Splits one operation's 0..=100 into equal consecutive parts.
struct PartProgress<'a> {
    inner: &'a dyn Progress,
    part: usize,
    parts: usize,
}

impl Progress for PartProgress<'_> {
    fn report(&self, pct: u8) {
        let done = self.part * 100 + usize::from(pct);
        self.inner.report(percent(done, self.parts * 100));
    }
}

/// Read-through cache of candle ranges, one contiguous envelope per
/// `(product, granularity)`.
///
/// A request inside the envelope is served from the store without touching the
/// network. Otherwise only the leading gap `[start, cached_start)` and the
/// trailing gap `[cached_end, end)` are fetched, merged with the cached candles
/// (cached values win on equal timestamps), and the envelope grows to the
/// union. Requests for the same key are serialized, so a second caller waits
/// for the first and then finds the range cached. Nothing is committed unless
/// every gap fetch succeeds.
///
/// Once covered, a range is trusted until [`invalidate`](Self::invalidate) is
/// called; the cache never re-fetches inside its envelope.
pub struct RangeCache {
    fetcher: ChunkedFetcher,
    store: Arc<dyn CandleStore>,
    slots: KeyedLocks<CacheKey, Slot>,
}

impl RangeCache {
    /// Cache backed by `store`, filling gaps with `fetcher`.
    pub fn new(fetcher: ChunkedFetcher, store: Arc<dyn CandleStore>) -> Self {
        Self {
            fetcher,
            store,
            slots: KeyedLocks::default(),
        }
    }

    /// The fetcher used to fill gaps.
    pub const fn fetcher(&self) -> &ChunkedFetcher {
        &self.fetcher
    }

    /// Candles for `[start, end)`, fetching only what the envelope lacks.
    ///
    /// # Errors
    /// See [`get_with_progress`](Self::get_with_progress).
    pub async fn get(
        &self,
        product_id: &str,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<CandleRange, CandelaError> {
        self.get_with_progress(product_id, granularity, start, end, &NoProgress)
            .await
    }

    /// Like [`get`](Self::get), reporting progress across all gap fetches.
    ///
    /// # Errors
    /// Returns `InvalidArg` if `start > end`, a fetch error if any gap fails
    /// (the cache is left unchanged), or `Storage` if persisting fails.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela::cache::get",
            skip(self, progress),
            fields(granularity = %granularity),
            err
        )
    )]
    pub async fn get_with_progress(
        &self,
        product_id: &str,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        progress: &dyn Progress,
    ) -> Result<CandleRange, CandelaError> {
        if start > end {
            return Err(CandelaError::InvalidArg(format!(
                "start {start} is after end {end}"
            )));
        }
        if start == end {
            progress.report(100);
            return Ok(CandleRange::empty(product_id, granularity, start, end));
        }

        let key = CacheKey::new(product_id, granularity);
        let slot = self.slots.get(key.clone()).await;
        let mut slot = slot.lock().await;
        if !slot.loaded {
            slot.entry = self.store.load(&key).await?;
            slot.loaded = true;
        }

        let gaps = match &slot.entry {
            Some(e) if e.covers(start, end) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(product_id, "cache hit");
                progress.report(100);
                return Ok(e.slice(start, end));
            }
            Some(e) => {
                let mut gaps = Vec::with_capacity(2);
                if start < e.start {
                    gaps.push((start, e.start));
                }
                if end > e.end {
                    gaps.push((e.end, end));
                }
                gaps
            }
            None => vec![(start, end)],
        };

        let mut fetched = Vec::with_capacity(gaps.len());
        for (part, (gs, ge)) in gaps.iter().copied().enumerate() {
            #[cfg(feature = "tracing")]
            tracing::debug!(product_id, gap_start = %gs, gap_end = %ge, "fetching gap");
            let sub = PartProgress {
                inner: progress,
                part,
                parts: gaps.len(),
            };
            let range = self
                .fetcher
                .fetch_with_progress(product_id, granularity, gs, ge, &sub)
                .await?;
            fetched.push(range.into_candles());
        }

        let merged = match &slot.entry {
            Some(old) => CacheEntry {
                product_id: product_id.to_string(),
                granularity,
                start: start.min(old.start),
                end: end.max(old.end),
                candles: merge_candles_by_priority(
                    std::iter::once(old.candles.clone()).chain(fetched),
                ),
            },
            None => CacheEntry {
                product_id: product_id.to_string(),
                granularity,
                start,
                end,
                candles: merge_candles_by_priority(fetched),
            },
        };

        // Reload from the store if the save fails or is cancelled.
        slot.loaded = false;
        self.store.save(&merged).await?;
        let out = merged.slice(start, end);
        slot.entry = Some(merged);
        slot.loaded = true;
        Ok(out)
    }

    /// The envelope currently covered for `(product_id, granularity)`.
    ///
    /// # Errors
    /// Returns `Storage` if the entry cannot be read.
    pub async fn envelope(
        &self,
        product_id: &str,
        granularity: Granularity,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, CandelaError> {
        let key = CacheKey::new(product_id, granularity);
        let slot = self.slots.get(key.clone()).await;
        let mut slot = slot.lock().await;
        if !slot.loaded {
            slot.entry = self.store.load(&key).await?;
            slot.loaded = true;
        }
        Ok(slot.entry.as_ref().map(|e| (e.start, e.end)))
    }

    /// Drop everything cached for `(product_id, granularity)`.
    ///
    /// # Errors
    /// Returns `Storage` if the persisted entry cannot be deleted.
    pub async fn invalidate(
        &self,
        product_id: &str,
        granularity: Granularity,
    ) -> Result<(), CandelaError> {
        let key = CacheKey::new(product_id, granularity);
        let slot = self.slots.get(key.clone()).await;
        let mut slot = slot.lock().await;
        slot.loaded = false;
        self.store.remove(&key).await?;
        slot.entry = None;
        slot.loaded = true;
        Ok(())
    }
}
