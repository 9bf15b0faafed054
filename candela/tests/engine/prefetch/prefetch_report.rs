use std::sync::Arc;

use chrono::Utc;

use crate::helpers::{
    BTC_USD, DOGE_USD, ETH_USD, btc_listing, builder, day, dt, engine, exchange, fixed_bounds,
    recorder,
};
use candela::{
    Candela, CandelaConfig, CandelaError, Coin, CoinInfo, CoinRegistry, Granularity,
};
use candela_coinbase::CoinbaseCandles;
use candela_core::connector::Transport;
use candela_mock::midnight;

#[tokio::test]
async fn failing_products_become_warnings() {
    let ex = exchange();
    let candela = engine(&ex);
    let (start, end) = (dt(2022, 1, 1, 0), dt(2022, 1, 3, 0));

    let report = candela
        .prefetch()
        .products(&[DOGE_USD, ETH_USD, BTC_USD])
        .unwrap()
        .granularities(&[Granularity::D1, Granularity::H6])
        .period(start, end)
        .run()
        .await
        .unwrap();

    assert!(!report.is_complete());
    let done: Vec<(&str, Granularity)> = report
        .entries
        .iter()
        .map(|e| (e.product_id.as_str(), e.granularity))
        .collect();
    assert_eq!(
        done,
        vec![
            (BTC_USD, Granularity::H6),
            (BTC_USD, Granularity::D1),
            (ETH_USD, Granularity::H6),
            (ETH_USD, Granularity::D1),
        ]
    );
    assert!(report.entries.iter().all(|e| e.start == start && e.end == end));
    assert_eq!(report.entries[0].candles, 8);
    assert_eq!(report.entries[1].candles, 2);

    assert_eq!(report.warnings.len(), 2);
    assert!(report.warnings.iter().all(|w| w.product_id == DOGE_USD));
    assert!(
        report
            .warnings
            .iter()
            .all(|w| matches!(w.error, CandelaError::Http { status: 404, .. }))
    );

    // Warmed: a second run is answered from the cache.
    let calls = ex.calls();
    candela
        .prefetch()
        .products(&[BTC_USD, ETH_USD])
        .unwrap()
        .granularities(&[Granularity::D1, Granularity::H6])
        .period(start, end)
        .run()
        .await
        .unwrap();
    assert_eq!(ex.calls(), calls);
}

#[tokio::test]
async fn known_listing_clamps_an_explicit_period() {
    let ex = exchange();
    let candela = engine(&ex);
    let (seen, sink) = recorder();
    let (start, end) = (dt(2020, 1, 1, 0), dt(2020, 4, 1, 0));

    let report = candela
        .prefetch()
        .products(&[BTC_USD, DOGE_USD])
        .unwrap()
        .granularities(&[Granularity::D1])
        .period(start, end)
        .progress(Arc::new(sink))
        .run()
        .await
        .unwrap();
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].start, start);
    assert_eq!(report.entries[0].candles, 17);
    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen, vec![50, 100]);

    candela.earliest(BTC_USD).await.unwrap();
    let calls = ex.calls();
    let report = candela
        .prefetch()
        .products(&[BTC_USD])
        .unwrap()
        .granularities(&[Granularity::D1])
        .period(start, end)
        .run()
        .await
        .unwrap();
    assert_eq!(report.entries[0].start, midnight(btc_listing()));
    assert_eq!(report.entries[0].candles, 17);
    assert_eq!(ex.calls(), calls);
}

#[tokio::test]
async fn default_period_runs_from_listing_to_today() {
    let ex = exchange();
    let candela = engine(&ex);

    let report = candela
        .prefetch()
        .products(&[BTC_USD])
        .unwrap()
        .granularities(&[Granularity::D1])
        .run()
        .await
        .unwrap();
    assert!(report.is_complete());
    let entry = &report.entries[0];
    assert_eq!(entry.start, midnight(btc_listing()));
    assert_eq!(entry.end, midnight(Utc::now().date_naive()));
    assert_eq!(
        entry.candles,
        usize::try_from((entry.end - entry.start).num_days()).unwrap()
    );
}

#[tokio::test]
async fn located_start_and_registry_selection() {
    let ex = exchange();
    let registry = CoinRegistry::new([
        CoinInfo {
            id: Coin::Bitcoin,
            symbol: BTC_USD.to_string(),
            start_date: None,
            category: None,
        },
        CoinInfo {
            id: Coin::Dogecoin,
            symbol: DOGE_USD.to_string(),
            start_date: None,
            category: None,
        },
    ]);
    let candela = builder(&ex).with_registry(registry).build().unwrap();

    let report = candela
        .prefetch()
        .all_registered()
        .granularities(&[Granularity::D1, Granularity::H1])
        .period(dt(2024, 5, 30, 0), dt(2024, 6, 1, 0))
        .run()
        .await
        .unwrap();
    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.warnings.len(), 2);

    let err = candela
        .prefetch()
        .coins(&[Coin::Bitcoin, Coin::Bitcoin])
        .err()
        .unwrap();
    assert!(matches!(err, CandelaError::InvalidArg(_)));
}

#[tokio::test]
async fn unlisted_product_without_period_warns_per_granularity() {
    let ex = exchange();
    let candela = engine(&ex);

    let report = candela
        .prefetch()
        .products(&[DOGE_USD])
        .unwrap()
        .granularities(&[Granularity::H6, Granularity::D1])
        .run()
        .await
        .unwrap();
    assert!(report.entries.is_empty());
    assert_eq!(report.warnings.len(), 2);
    assert!(
        report
            .warnings
            .iter()
            .all(|w| matches!(w.error, CandelaError::NotFound { .. }))
    );
}

#[tokio::test]
async fn builder_validation() {
    let ex = exchange();
    let candela = engine(&ex);

    let err = candela
        .prefetch()
        .products(&[BTC_USD, BTC_USD])
        .err()
        .unwrap();
    assert!(matches!(err, CandelaError::InvalidArg(_)));

    let err = candela
        .prefetch()
        .add_product(BTC_USD)
        .unwrap()
        .add_product(BTC_USD)
        .err()
        .unwrap();
    assert!(matches!(err, CandelaError::InvalidArg(_)));

    let err = candela.prefetch().run().await.unwrap_err();
    assert!(matches!(err, CandelaError::InvalidArg(_)));

    let err = candela
        .prefetch()
        .add_product(BTC_USD)
        .unwrap()
        .granularities(&[])
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, CandelaError::InvalidArg(_)));
}

#[tokio::test(start_paused = true)]
async fn listing_searches_share_the_limiter_concurrently() {
    let ex = exchange();
    let raw: Arc<dyn Transport> = Arc::clone(&ex) as Arc<dyn Transport>;
    let candela = Candela::builder()
        .config(CandelaConfig {
            locator: fixed_bounds(),
            ..CandelaConfig::default()
        })
        .with_transport(raw, CoinbaseCandles::new)
        .build()
        .unwrap();

    let report = candela
        .prefetch()
        .products(&[BTC_USD, ETH_USD])
        .unwrap()
        .granularities(&[Granularity::D1])
        .concurrency(2)
        .run()
        .await
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(report.entries[0].start, midnight(btc_listing()));
    assert_eq!(report.entries[1].start, midnight(day(2021, 6, 1)));

    // both searches are in flight before either finishes
    let log = ex.call_log().await;
    assert_eq!(log[0].product_id, BTC_USD);
    assert!(log[..3].iter().any(|c| c.product_id == ETH_USD), "{log:?}");
}
