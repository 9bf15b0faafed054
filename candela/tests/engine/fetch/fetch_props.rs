use std::sync::Arc;

use chrono::TimeDelta;
use proptest::prelude::*;

use crate::helpers::{BTC_USD, dt, exchange};
use candela::{ChunkedFetcher, FetchConfig, Granularity};
use candela_coinbase::CoinbaseCandles;
use candela_core::connector::Transport;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn fetched_ranges_are_sorted_unique_and_complete(
        offset_min in 0i64..10_000,
        len_min in 0i64..30_000,
        max_candles in 1u32..=300,
        concurrency in 1usize..8,
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let ex = exchange();
        let transport: Arc<dyn Transport> = Arc::clone(&ex) as Arc<dyn Transport>;
        let fetcher = ChunkedFetcher::new(
            Arc::new(CoinbaseCandles::new(transport)),
            FetchConfig { max_candles_per_request: max_candles, concurrency },
        );
        let start = dt(2021, 1, 1, 0) + TimeDelta::minutes(offset_min);
        let end = start + TimeDelta::minutes(len_min);

        let range = rt
            .block_on(fetcher.fetch(BTC_USD, Granularity::H1, start, end))
            .unwrap();

        let candles = range.candles();
        prop_assert!(candles.windows(2).all(|w| w[0].ts < w[1].ts));
        prop_assert!(candles.iter().all(|c| c.ts >= start && c.ts < end));
        prop_assert!(candles.iter().all(|c| c.ts.timestamp() % 3600 == 0));

        let first_bucket = (start.timestamp() + 3599).div_euclid(3600);
        let end_bucket = (end.timestamp() + 3599).div_euclid(3600);
        let expected = usize::try_from(end_bucket - first_bucket).unwrap();
        prop_assert_eq!(candles.len(), expected);
    }
}
