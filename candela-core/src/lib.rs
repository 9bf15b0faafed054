//! candela-core
//!
//! Core types, traits, and utilities shared across the candela workspace.
//!
//! - `candle`: OHLCV candles, ranges, and derived price series.
//! - `connector`: the `Transport` and `CandleSource` traits every exchange
//!   adapter and middleware layer implements.
//! - `timeseries`: window partitioning, first-wins merging, and candle
//!   interpolation.
//!
//! Async runtime (Tokio)
//! ---------------------
//! The traits here are runtime-agnostic, but every implementation in the
//! workspace (rate limiting, retry deadlines, the on-disk store) assumes a
//! Tokio 1.x runtime.
#![warn(missing_docs)]

/// Candle, range, and price-series value types.
pub mod candle;
/// Transport and candle-source traits.
pub mod connector;
/// Middleware trait implemented by transport wrappers.
pub mod middleware;
/// Progress reporting hook for long-running fetches.
pub mod progress;
/// Time-series utilities for partitioning, merging, and interpolation.
pub mod timeseries;

pub use candela_types::*;
pub use candle::{Candle, CandleRange, Interpolation, PricePoint, PriceSeries};
pub use connector::{CandleSource, Query, Transport};
pub use middleware::Middleware;
pub use progress::{NoProgress, Progress};
pub use timeseries::interpolate::interpolate;
pub use timeseries::merge::merge_candles_by_priority;
pub use timeseries::window::{Window, partition};
