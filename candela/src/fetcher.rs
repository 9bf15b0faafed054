//! Range fetches split into request-sized windows.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use futures::stream::{self, StreamExt};

use candela_core::connector::CandleSource;
use candela_core::progress::percent;
use candela_core::{
    CandelaError, Candle, CandleRange, FetchConfig, Granularity, NoProgress, Progress,
    merge_candles_by_priority, partition,
};

/// Fetches arbitrary `[start, end)` ranges by splitting them into windows of
/// at most `max_candles_per_request` buckets.
///
/// Windows are fetched with bounded concurrency; the shared rate limiter below
/// the source keeps the aggregate call rate in check. Results are merged in
/// window order, so when two adjacent windows both return a boundary candle the
/// earlier window's copy wins.
pub struct ChunkedFetcher {
    source: Arc<dyn CandleSource>,
    config: FetchConfig,
}

impl ChunkedFetcher {
    /// Fetch through `source` with the given partitioning and fan-out.
    pub fn new(source: Arc<dyn CandleSource>, config: FetchConfig) -> Self {
        Self { source, config }
    }

    /// The active partitioning config.
    pub const fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Width of one request window at `granularity`.
    #[must_use]
    pub fn window_for(&self, granularity: Granularity) -> TimeDelta {
        let n = i32::try_from(self.config.max_candles_per_request.max(1)).unwrap_or(i32::MAX);
        granularity.delta() * n
    }

    /// Fetch `[start, end)` without progress reporting.
    ///
    /// # Errors
    /// See [`fetch_with_progress`](Self::fetch_with_progress).
    pub async fn fetch(
        &self,
        product_id: &str,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<CandleRange, CandelaError> {
        self.fetch_with_progress(product_id, granularity, start, end, &NoProgress)
            .await
    }

    /// Fetch `[start, end)`, reporting completion after each window.
    ///
    /// A window that returns no candles is a legitimate gap. A window that
    /// fails makes the whole fetch fail; partial results are never returned.
    ///
    /// # Errors
    /// Returns `InvalidArg` if `start > end`, otherwise the first window error.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela::fetcher::fetch",
            skip(self, progress),
            fields(granularity = %granularity),
            err
        )
    )]
    pub async fn fetch_with_progress(
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
        let windows = partition(start, end, self.window_for(granularity));
        let total = windows.len();
        progress.report(0);

        let mut results: Vec<Option<Vec<Candle>>> = vec![None; total];
        let mut pending = stream::iter(windows.into_iter().enumerate().map(|(i, w)| async move {
            let res = self
                .source
                .candles(product_id, granularity, w.start, w.end)
                .await;
            (i, res)
        }))
        .buffer_unordered(self.config.concurrency.max(1));

        let mut done = 0usize;
        while let Some((i, res)) = pending.next().await {
            let candles = res?;
            #[cfg(feature = "tracing")]
            tracing::debug!(window = i, candles = candles.len(), "window fetched");
            results[i] = Some(candles);
            done += 1;
            progress.report(percent(done, total));
        }
        if total == 0 {
            progress.report(100);
        }

        let merged = merge_candles_by_priority(results.into_iter().flatten());
        Ok(CandleRange::new(product_id, granularity, start, end, merged))
    }
}
