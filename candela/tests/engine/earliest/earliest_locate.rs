use std::sync::Arc;

use crate::helpers::{BTC_USD, DOGE_USD, btc_listing, day, engine, exchange, fixed_bounds};
use candela::{Candela, CandelaError, EarliestDateLocator, Granularity, LocatorConfig, RetryConfig};
use candela_coinbase::CoinbaseCandles;
use candela_core::connector::Transport;
use candela_middleware::TransportBuilder;
use candela_mock::{MockBehavior, MockExchange, Trigger};

fn locator(ex: &Arc<MockExchange>, cfg: LocatorConfig) -> EarliestDateLocator {
    let transport: Arc<dyn Transport> = Arc::clone(ex) as Arc<dyn Transport>;
    EarliestDateLocator::new(Arc::new(CoinbaseCandles::new(transport)), cfg)
}

#[tokio::test]
async fn finds_listing_day_in_logarithmic_probes() {
    let ex = exchange();
    let candela = engine(&ex);

    assert_eq!(candela.earliest(BTC_USD).await.unwrap(), btc_listing());
    // ~4500 days between floor and ceiling
    assert!(candela.locator().probes() <= 16, "probes = {}", candela.locator().probes());
    assert_eq!(ex.calls(), candela.locator().probes());

    let log = ex.call_log().await;
    assert!(log.iter().all(|c| c.granularity == Granularity::D1));
    assert!(log.iter().all(|c| (c.end - c.start).num_days() == 1));
}

#[tokio::test]
async fn listing_on_the_ceiling_and_just_above_the_floor() {
    let ex = Arc::new(
        MockExchange::new()
            .with_listing("NEW-USD", day(2024, 6, 1))
            .with_listing("OLD-USD", day(2012, 1, 2)),
    );
    let loc = locator(&ex, fixed_bounds());
    assert_eq!(loc.locate("NEW-USD").await.unwrap(), day(2024, 6, 1));
    assert_eq!(loc.locate("OLD-USD").await.unwrap(), day(2012, 1, 2));
}

#[tokio::test]
async fn explicit_floor_narrows_the_search() {
    let ex = exchange();
    let loc = locator(&ex, fixed_bounds());

    let found = loc.locate_from(BTC_USD, day(2020, 1, 1)).await.unwrap();
    assert_eq!(found, btc_listing());
    assert!(loc.probes() <= 13);

    let err = loc.locate_from(BTC_USD, day(2025, 1, 1)).await.unwrap_err();
    assert!(matches!(err, CandelaError::InvalidArg(_)));
}

#[tokio::test]
async fn product_without_history_is_not_found_after_one_probe() {
    let ex = exchange();
    let candela = engine(&ex);

    let err = candela.earliest(DOGE_USD).await.unwrap_err();
    assert!(matches!(err, CandelaError::NotFound { .. }));
    assert_eq!(ex.calls(), 1);

    // Recorded: neither the search nor a range fetch goes back to the network.
    let err = candela.earliest(DOGE_USD).await.unwrap_err();
    assert!(matches!(err, CandelaError::NotFound { .. }));
    let err = candela
        .candles(
            DOGE_USD,
            Granularity::H1,
            crate::helpers::dt(2022, 1, 1, 0),
            crate::helpers::dt(2022, 1, 2, 0),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CandelaError::NotFound { .. }));
    assert_eq!(ex.calls(), 1);
}

#[tokio::test]
async fn failed_probe_counts_as_no_data() {
    let ex = Arc::new(
        MockExchange::new()
            .with_listing(BTC_USD, btc_listing())
            .with_rule(
                Trigger::Call(1),
                MockBehavior::Fail(CandelaError::http(503, "Service Unavailable")),
                Some(1),
            ),
    );
    let loc = locator(&ex, fixed_bounds());

    // The ceiling probe fails without a retry layer, so the product looks unlisted.
    let err = loc.locate(BTC_USD).await.unwrap_err();
    assert!(matches!(err, CandelaError::NotFound { .. }));
    assert_eq!(loc.probes(), 1);
}

#[tokio::test(start_paused = true)]
async fn retry_layer_absorbs_a_flaky_probe() {
    let ex = Arc::new(
        MockExchange::new()
            .with_listing(BTC_USD, btc_listing())
            .with_rule(
                Trigger::Call(3),
                MockBehavior::Fail(CandelaError::http(503, "Service Unavailable")),
                Some(1),
            ),
    );
    let raw: Arc<dyn Transport> = Arc::clone(&ex) as Arc<dyn Transport>;
    let transport = TransportBuilder::new(raw)
        .with_retry_config(&RetryConfig::default())
        .build()
        .unwrap();
    let candela = Candela::builder()
        .with_source(Arc::new(CoinbaseCandles::new(transport)))
        .locator_config(fixed_bounds())
        .build()
        .unwrap();

    assert_eq!(candela.earliest(BTC_USD).await.unwrap(), btc_listing());
    assert_eq!(ex.calls(), candela.locator().probes() + 1);
}
