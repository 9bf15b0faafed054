use std::sync::Arc;
use std::time::Duration;

use crate::helpers::{BTC_USD, btc_listing, builder, dt, engine};
use candela::{CacheKey, CandelaError, CandleStore, FileStore, Granularity};
use candela_mock::{MockBehavior, MockExchange, Trigger};

fn failing_on(window_start: chrono::DateTime<chrono::Utc>) -> Arc<MockExchange> {
    Arc::new(
        MockExchange::new()
            .with_listing(BTC_USD, btc_listing())
            .with_rule(
                Trigger::WindowStart(window_start),
                MockBehavior::Fail(CandelaError::http(400, "bad request")),
                None,
            ),
    )
}

#[tokio::test]
async fn failed_window_commits_nothing() {
    // Third of five one-day windows fails.
    let ex = failing_on(dt(2021, 1, 3, 0));
    let candela = engine(&ex);

    let err = candela
        .candles(BTC_USD, Granularity::H1, dt(2021, 1, 1, 0), dt(2021, 1, 6, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, CandelaError::Http { status: 400, .. }));
    assert_eq!(
        candela.cache().envelope(BTC_USD, Granularity::H1).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn failed_extension_keeps_previous_envelope_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let ex = failing_on(dt(2021, 1, 3, 0));
    let candela = builder(&ex).cache_dir(dir.path()).build().unwrap();

    let warm = candela
        .candles(BTC_USD, Granularity::H1, dt(2020, 12, 30, 0), dt(2021, 1, 1, 0))
        .await
        .unwrap();

    let err = candela
        .candles(BTC_USD, Granularity::H1, dt(2020, 12, 30, 0), dt(2021, 1, 6, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, CandelaError::Http { .. }));
    assert_eq!(
        candela.cache().envelope(BTC_USD, Granularity::H1).await.unwrap(),
        Some((dt(2020, 12, 30, 0), dt(2021, 1, 1, 0)))
    );

    let on_disk = FileStore::new(dir.path())
        .load(&CacheKey::new(BTC_USD, Granularity::H1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(on_disk.end, dt(2021, 1, 1, 0));
    assert_eq!(on_disk.candles, warm.candles());

    ex.clear_rules().await;
    let full = candela
        .candles(BTC_USD, Granularity::H1, dt(2020, 12, 30, 0), dt(2021, 1, 6, 0))
        .await
        .unwrap();
    assert_eq!(full.len(), 7 * 24);
}

#[tokio::test(start_paused = true)]
async fn cancelled_fetch_commits_nothing() {
    let ex = Arc::new(
        MockExchange::new()
            .with_listing(BTC_USD, btc_listing())
            .with_rule(Trigger::WindowStart(dt(2021, 1, 2, 0)), MockBehavior::Hang, None),
    );
    let candela = engine(&ex);

    let res = tokio::time::timeout(
        Duration::from_secs(30),
        candela.candles(BTC_USD, Granularity::H1, dt(2021, 1, 1, 0), dt(2021, 1, 4, 0)),
    )
    .await;
    assert!(res.is_err(), "fetch should still be hanging");
    assert_eq!(
        candela.cache().envelope(BTC_USD, Granularity::H1).await.unwrap(),
        None
    );
}
