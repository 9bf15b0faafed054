use crate::helpers::{BTC_USD, dt, engine, exchange};
use candela::{Granularity, Interpolation};
use candela_mock::MockExchange;
use chrono::TimeDelta;

#[tokio::test]
async fn hi_lo_path_visits_both_extremes_of_every_candle() {
    let ex = exchange();
    let candela = engine(&ex);
    let (start, end) = (dt(2021, 1, 1, 0), dt(2021, 1, 4, 0));

    let series = candela
        .prices(BTC_USD, Granularity::D1, start, end, Interpolation::HiLo)
        .await
        .unwrap();
    assert_eq!(series.len(), 6);

    for (i, pair) in series.points().chunks(2).enumerate() {
        let ts = start + TimeDelta::days(i64::try_from(i).unwrap());
        let c = MockExchange::candle_at(ts, Granularity::D1);
        let (first, second) = if c.is_bullish() {
            (c.low, c.high)
        } else {
            (c.high, c.low)
        };
        assert_eq!(pair[0].ts, ts);
        assert_eq!(pair[0].price, first);
        assert_eq!(pair[1].ts, ts + TimeDelta::hours(12));
        assert_eq!(pair[1].price, second);
    }
    assert!(series.points().windows(2).all(|w| w[0].ts < w[1].ts));
}

#[tokio::test]
async fn mean_path_and_cache_reuse() {
    let ex = exchange();
    let candela = engine(&ex);
    let (start, end) = (dt(2021, 1, 1, 0), dt(2021, 1, 2, 0));

    let series = candela
        .prices(BTC_USD, Granularity::H1, start, end, Interpolation::Mean)
        .await
        .unwrap();
    assert_eq!(series.len(), 24);
    let c = MockExchange::candle_at(start, Granularity::H1);
    assert_eq!(series.first().unwrap().price, (c.high + c.low) / 2.0);

    let calls = ex.calls();
    let again = candela
        .prices(BTC_USD, Granularity::H1, start, end, Interpolation::HiLo)
        .await
        .unwrap();
    assert_eq!(again.len(), 48);
    assert_eq!(ex.calls(), calls);

    let mid = start + TimeDelta::minutes(15);
    let p = again.value_at(mid).unwrap();
    assert!(p >= c.low && p <= c.high);
}
