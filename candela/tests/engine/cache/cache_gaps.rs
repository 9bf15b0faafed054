use crate::helpers::{BTC_USD, buckets, dt, engine, exchange};
use candela::Granularity;

#[tokio::test]
async fn overlapping_request_fetches_only_the_trailing_gap() {
    let ex = exchange();
    let candela = engine(&ex);
    let (a, b, c, d) = (
        dt(2021, 1, 1, 0),
        dt(2021, 1, 2, 0),
        dt(2021, 1, 3, 0),
        dt(2021, 1, 5, 0),
    );

    candela.candles(BTC_USD, Granularity::H1, a, c).await.unwrap();
    let before = ex.call_log().await.len();

    let tail = candela.candles(BTC_USD, Granularity::H1, b, d).await.unwrap();
    assert_eq!((tail.start, tail.end), (b, d));
    assert_eq!(tail.len(), buckets(b, d, Granularity::H1));

    let log = ex.call_log().await;
    assert_eq!(log.len() - before, 2);
    assert!(log[before..].iter().all(|call| call.start >= c && call.end <= d));

    assert_eq!(
        candela.cache().envelope(BTC_USD, Granularity::H1).await.unwrap(),
        Some((a, d))
    );

    let calls = ex.calls();
    let whole = candela.candles(BTC_USD, Granularity::H1, a, d).await.unwrap();
    assert_eq!(ex.calls(), calls);
    assert_eq!(whole.len(), buckets(a, d, Granularity::H1));
    assert!(whole.candles().windows(2).all(|w| w[0].ts < w[1].ts));
}

#[tokio::test]
async fn earlier_request_fetches_only_the_leading_gap() {
    let ex = exchange();
    let candela = engine(&ex);

    candela
        .candles(BTC_USD, Granularity::H1, dt(2021, 1, 3, 0), dt(2021, 1, 5, 0))
        .await
        .unwrap();
    let before = ex.call_log().await.len();

    candela
        .candles(BTC_USD, Granularity::H1, dt(2021, 1, 1, 0), dt(2021, 1, 4, 0))
        .await
        .unwrap();
    let log = ex.call_log().await;
    assert_eq!(log.len() - before, 2);
    assert!(log[before..].iter().all(|call| call.end <= dt(2021, 1, 3, 0)));
    assert_eq!(
        candela.cache().envelope(BTC_USD, Granularity::H1).await.unwrap(),
        Some((dt(2021, 1, 1, 0), dt(2021, 1, 5, 0)))
    );
}

#[tokio::test]
async fn disjoint_request_bridges_the_hole() {
    let ex = exchange();
    let candela = engine(&ex);

    candela
        .candles(BTC_USD, Granularity::H1, dt(2021, 1, 1, 0), dt(2021, 1, 2, 0))
        .await
        .unwrap();
    let later = candela
        .candles(BTC_USD, Granularity::H1, dt(2021, 1, 4, 0), dt(2021, 1, 5, 0))
        .await
        .unwrap();
    assert_eq!(later.len(), 24);
    assert_eq!(ex.calls(), 1 + 3);
    assert_eq!(
        candela.cache().envelope(BTC_USD, Granularity::H1).await.unwrap(),
        Some((dt(2021, 1, 1, 0), dt(2021, 1, 5, 0)))
    );
}

#[tokio::test]
async fn granularities_are_cached_independently() {
    let ex = exchange();
    let candela = engine(&ex);
    let (a, b) = (dt(2021, 1, 1, 0), dt(2021, 1, 3, 0));

    candela.candles(BTC_USD, Granularity::H1, a, b).await.unwrap();
    let calls = ex.calls();
    let daily = candela.candles(BTC_USD, Granularity::D1, a, b).await.unwrap();
    assert_eq!(daily.len(), 2);
    assert_eq!(ex.calls(), calls + 1);
}
