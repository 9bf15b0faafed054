//! Candela acquires historical crypto candles from a rate-limited exchange API
//! and keeps them in a local range cache.
//!
//! Overview
//! - [`EarliestDateLocator`] binary-searches the first trading day of a product
//!   with single-day probes; results are kept in an [`EarliestDateBook`].
//! - [`ChunkedFetcher`] splits a `[start, end)` request into windows no larger
//!   than the exchange's per-call candle ceiling and fetches them concurrently.
//! - [`RangeCache`] serves requests from one contiguous envelope per
//!   `(product, granularity)`, fetching only leading and trailing gaps.
//! - [`Candela`] ties these together and derives continuous price series.
//!
//! Pacing and retries live below the [`CandleSource`](candela_core::CandleSource)
//! in the transport stack (see `candela-middleware`), so one shared limiter
//! bounds every call the engine makes.
//!
//! Key behaviors and trade-offs
//! - Cached envelopes are trusted: once a range is covered it is never
//!   re-fetched until [`RangeCache::invalidate`] is called.
//! - A fetch either commits entirely or not at all; failures and cancellations
//!   leave the cache as it was.
//! - Batch prefetches report failing products and continue with the rest.
//!
//! Example
//! ```rust,ignore
//! use candela::{Candela, Granularity, Interpolation};
//!
//! let start = candela.earliest("BTC-USD").await?.and_time(chrono::NaiveTime::MIN).and_utc();
//! let prices = candela
//!     .prices("BTC-USD", Granularity::H1, start, start + chrono::TimeDelta::days(7), Interpolation::HiLo)
//!     .await?;
//! ```
#![warn(missing_docs)]

pub mod cache;
mod core;
mod earliest;
mod fetcher;
mod locator;
mod locks;
mod prefetch;

pub use crate::cache::{CacheEntry, CacheKey, CandleStore, FileStore, MemoryStore, RangeCache};
pub use crate::core::{Candela, CandelaBuilder, EARLIEST_FILE};
pub use crate::earliest::{EarliestDateBook, EarliestDateRecord};
pub use crate::fetcher::ChunkedFetcher;
pub use crate::locator::EarliestDateLocator;
pub use crate::prefetch::PrefetchBuilder;

pub use candela_core::{
    CandelaConfig, CandelaError, Candle, CandleRange, Coin, CoinInfo, CoinRegistry, FetchConfig,
    Granularity, Interpolation, LocatorConfig, NoProgress, PrefetchEntry, PrefetchFailure,
    PrefetchReport, PricePoint, PriceSeries, Progress, RateLimitConfig, RetryConfig,
};
