//! Candela-specific error taxonomy, configuration primitives, and coin registry.
#![warn(missing_docs)]

mod coin;
mod config;
mod error;
mod granularity;
mod reports;

pub use coin::{Coin, CoinInfo, CoinRegistry};
pub use config::{
    CandelaConfig, FetchConfig, LocatorConfig, MAX_CANDLES_PER_REQUEST, RateLimitConfig,
    RetryConfig,
};
pub use error::CandelaError;
pub use granularity::Granularity;
pub use reports::{PrefetchEntry, PrefetchFailure, PrefetchReport};
