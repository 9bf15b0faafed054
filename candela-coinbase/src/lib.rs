//! candela-coinbase
//!
//! Public connector for the Coinbase Exchange candle endpoint. [`HttpTransport`]
//! speaks HTTP and classifies failures; [`CoinbaseCandles`] turns the
//! endpoint's row arrays into [`Candle`](candela_core::Candle)s over any
//! [`Transport`](candela_core::Transport).
#![warn(missing_docs)]

mod builder;
mod candles;
/// reqwest-backed transport and status classification.
pub mod http;

pub use builder::CoinbaseTransportBuilder;
pub use candles::{CoinbaseCandles, parse_rows};
pub use http::HttpTransport;

/// Public REST endpoint of Coinbase Exchange.
pub const DEFAULT_BASE_URL: &str = "https://api.exchange.coinbase.com";
