use std::sync::Arc;

use candela::{Candela, RateLimitConfig};
use candela_coinbase::{CoinbaseCandles, HttpTransport};
use candela_core::connector::Transport;
use candela_middleware::TokenBucket;
use chrono::NaiveDate;

/// Engine over the live Coinbase API, or the fake exchange when
/// `CANDELA_EXAMPLES_USE_MOCK` is set.
pub fn engine() -> Result<Candela, Box<dyn std::error::Error>> {
    let transport: Arc<dyn Transport> = if std::env::var("CANDELA_EXAMPLES_USE_MOCK").is_ok() {
        println!("--- (Using Mock Exchange for CI) ---");
        let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN);
        Arc::new(
            candela_mock::MockExchange::new()
                .with_listing("BTC-USD", day(2015, 7, 20))
                .with_listing("ETH-USD", day(2016, 5, 18))
                .with_listing("SOL-USD", day(2021, 6, 17)),
        )
    } else {
        let limiter = TokenBucket::shared(RateLimitConfig::default());
        HttpTransport::rate_limited(limiter)?.build()?
    };

    let cache_dir = std::env::var("CANDELA_CACHE_DIR").unwrap_or_else(|_| "data/cache".into());
    Ok(Candela::builder()
        .with_source(Arc::new(CoinbaseCandles::new(transport)))
        .cache_dir(cache_dir)
        .build()?)
}

/// Install a `RUST_LOG`-driven subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
