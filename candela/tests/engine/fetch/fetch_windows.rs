use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::helpers::{BTC_USD, btc_listing, dt, exchange, recorder};
use candela::{CandelaError, Candle, ChunkedFetcher, FetchConfig, Granularity};
use candela_core::MAX_CANDLES_PER_REQUEST;
use candela_coinbase::CoinbaseCandles;
use candela_core::connector::{CandleSource, Transport};
use candela_mock::MockExchange;

fn fetcher(ex: &Arc<MockExchange>, max_candles_per_request: u32) -> ChunkedFetcher {
    let transport: Arc<dyn Transport> = Arc::clone(ex) as Arc<dyn Transport>;
    ChunkedFetcher::new(
        Arc::new(CoinbaseCandles::new(transport)),
        FetchConfig {
            max_candles_per_request,
            concurrency: 3,
        },
    )
}

#[test]
fn window_width_follows_request_ceiling() {
    let ex = exchange();
    assert_eq!(fetcher(&ex, 24).window_for(Granularity::H1), TimeDelta::days(1));
    assert_eq!(
        fetcher(&ex, 300).window_for(Granularity::M1),
        TimeDelta::minutes(300)
    );
}

#[tokio::test]
async fn windows_tile_the_range_without_exceeding_the_ceiling() {
    let ex = exchange();
    let f = fetcher(&ex, 24);
    let (start, end) = (dt(2021, 1, 1, 6), dt(2021, 1, 5, 18));

    let range = f.fetch(BTC_USD, Granularity::H1, start, end).await.unwrap();
    assert_eq!(range.len(), 108);

    let mut log = ex.call_log().await;
    log.sort_by_key(|c| c.start);
    assert_eq!(log.len(), 5);
    assert_eq!(log[0].start, start);
    assert_eq!(log[4].end, end);
    assert!(log.windows(2).all(|w| w[0].end == w[1].start));
    assert!(log.iter().all(|c| c.end - c.start <= TimeDelta::days(1)));
}

#[tokio::test]
async fn quiet_window_is_a_gap_not_an_error() {
    let ex = Arc::new(
        MockExchange::new()
            .with_listing(BTC_USD, btc_listing())
            .with_quiet_period(BTC_USD, dt(2021, 1, 2, 0), dt(2021, 1, 3, 0)),
    );
    let range = fetcher(&ex, 24)
        .fetch(BTC_USD, Granularity::H1, dt(2021, 1, 1, 0), dt(2021, 1, 4, 0))
        .await
        .unwrap();
    assert_eq!(range.len(), 48);
    assert!(
        range
            .candles()
            .iter()
            .all(|c| c.ts < dt(2021, 1, 2, 0) || c.ts >= dt(2021, 1, 3, 0))
    );
}

#[tokio::test]
async fn degenerate_ranges() {
    let ex = exchange();
    let f = fetcher(&ex, 24);
    let t = dt(2021, 1, 1, 0);

    let empty = f.fetch(BTC_USD, Granularity::H1, t, t).await.unwrap();
    assert!(empty.is_empty());
    assert_eq!(ex.calls(), 0);

    let err = f
        .fetch(BTC_USD, Granularity::H1, t, t - TimeDelta::hours(1))
        .await
        .unwrap_err();
    assert!(matches!(err, CandelaError::InvalidArg(_)));
}

#[tokio::test]
async fn progress_is_monotonic_and_ends_at_100() {
    let ex = exchange();
    let (seen, sink) = recorder();
    fetcher(&ex, 24)
        .fetch_with_progress(
            BTC_USD,
            Granularity::H1,
            dt(2021, 1, 1, 0),
            dt(2021, 1, 8, 0),
            &sink,
        )
        .await
        .unwrap();

    let seen = seen.lock().unwrap().clone();
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    assert_eq!(seen.last(), Some(&100));
    assert_eq!(seen.len(), 1 + 7);
}

/// Source that returns every bucket in `[start, end]`, end inclusive, tagged
/// with its window start.
struct OverlappingSource;

#[async_trait::async_trait]
impl CandleSource for OverlappingSource {
    fn name(&self) -> &'static str {
        "overlapping"
    }

    async fn candles(
        &self,
        _product_id: &str,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, CandelaError> {
        let tag = start.timestamp() as f64;
        let mut out = Vec::new();
        let mut ts = start;
        while ts <= end {
            out.push(Candle {
                ts,
                open: tag,
                high: tag,
                low: tag,
                close: tag,
                volume: 1.0,
            });
            ts += granularity.delta();
        }
        // newest first, like the exchange
        out.reverse();
        Ok(out)
    }
}

#[tokio::test]
async fn boundary_duplicates_keep_the_earlier_window() {
    let f = ChunkedFetcher::new(
        Arc::new(OverlappingSource),
        FetchConfig {
            max_candles_per_request: 24,
            concurrency: 4,
        },
    );
    let (start, end) = (dt(2021, 1, 1, 0), dt(2021, 1, 4, 0));
    let range = f.fetch(BTC_USD, Granularity::H1, start, end).await.unwrap();

    assert_eq!(range.len(), 72);
    assert!(range.candles().windows(2).all(|w| w[0].ts < w[1].ts));
    assert!(range.candles().iter().all(|c| c.ts < end));

    let boundary = range
        .candles()
        .iter()
        .find(|c| c.ts == dt(2021, 1, 2, 0))
        .unwrap();
    assert_eq!(boundary.close, dt(2021, 1, 1, 0).timestamp() as f64);
}

#[tokio::test]
async fn default_windows_fill_the_exchange_ceiling() {
    let ex = exchange();
    let transport: Arc<dyn Transport> = Arc::clone(&ex) as Arc<dyn Transport>;
    let f = ChunkedFetcher::new(
        Arc::new(CoinbaseCandles::new(transport)),
        FetchConfig::default(),
    );
    assert_eq!(f.config().max_candles_per_request, MAX_CANDLES_PER_REQUEST);

    let start = dt(2021, 1, 1, 0);
    let end = start + Granularity::H1.delta() * (MAX_CANDLES_PER_REQUEST as i32 + 1);
    let range = f.fetch(BTC_USD, Granularity::H1, start, end).await.unwrap();

    assert_eq!(range.len(), MAX_CANDLES_PER_REQUEST as usize + 1);
    assert_eq!(ex.calls(), 2);
}
