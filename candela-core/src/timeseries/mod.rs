//! Time-series utilities shared by the fetcher, the cache, and the interpolator.
//!
//! Modules include:
//! - `window`: split a range into request-sized sub-windows
//! - `merge`: merge candle batches with first-wins semantics
//! - `interpolate`: turn candles into a price path
/// Candle to price-path conversion.
pub mod interpolate;
/// Merge utilities for joining candle batches.
pub mod merge;
/// Sub-window partitioning.
pub mod window;
