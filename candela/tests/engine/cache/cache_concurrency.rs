use std::sync::Arc;

use crate::helpers::{BTC_USD, ETH_USD, btc_listing, day, dt, engine, exchange};
use candela::Granularity;
use candela_mock::{MockBehavior, MockExchange, Trigger};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_same_key_requests_fetch_once() {
    let ex = exchange();
    let candela = engine(&ex);
    let (a, b) = (dt(2021, 1, 1, 0), dt(2021, 1, 4, 0));

    let (r1, r2, r3) = tokio::join!(
        candela.candles(BTC_USD, Granularity::H1, a, b),
        candela.candles(BTC_USD, Granularity::H1, a, b),
        candela.candles(BTC_USD, Granularity::H1, a, b),
    );
    let (r1, r2, r3) = (
        tokio_test::assert_ok!(r1),
        tokio_test::assert_ok!(r2),
        tokio_test::assert_ok!(r3),
    );
    assert_eq!(ex.calls(), 3);
    assert_eq!(r1, r2);
    assert_eq!(r2, r3);
}

#[tokio::test(start_paused = true)]
async fn stalled_product_does_not_block_another() {
    let ex = Arc::new(
        MockExchange::new()
            .with_listing(BTC_USD, btc_listing())
            .with_listing(ETH_USD, day(2021, 6, 1))
            .with_rule(Trigger::Product(ETH_USD.to_string()), MockBehavior::Hang, None),
    );
    let candela = engine(&ex);

    let stalled = candela.candles(ETH_USD, Granularity::H1, dt(2022, 1, 1, 0), dt(2022, 1, 2, 0));
    tokio::pin!(stalled);
    tokio::select! {
        _ = &mut stalled => panic!("stalled product should not complete"),
        res = candela.candles(BTC_USD, Granularity::H1, dt(2022, 1, 1, 0), dt(2022, 1, 2, 0)) => {
            assert_eq!(tokio_test::assert_ok!(res).len(), 24);
        }
    }
}
