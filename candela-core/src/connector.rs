use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Candle, CandelaError, Granularity};

/// Query string parameters for a [`Transport`] call.
pub type Query = [(&'static str, String)];

/// The single choke point for outbound exchange calls.
///
/// Implementations are either a concrete HTTP client or a wrapper that adds
/// behavior (rate limiting, retries) around an inner transport. Every layer
/// must be shareable across tasks.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Stable name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Issue a `GET` for `path` with `query` and return the decoded JSON body.
    ///
    /// # Errors
    /// Transient failures are reported as `Timeout`, `RateLimited`, `Connect`,
    /// or a 5xx `Http`. Anything else is fatal.
    async fn get(&self, path: &str, query: &Query) -> Result<serde_json::Value, CandelaError>;
}

/// Focused role trait for anything that can return candles for a time window.
///
/// A single call must not span more buckets than the exchange allows per
/// request; callers partition larger ranges before calling.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Stable name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Fetch the candles of `product_id` at `granularity` within `[start, end)`.
    ///
    /// The result may be unordered and may be empty when nothing traded.
    async fn candles(
        &self,
        product_id: &str,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, CandelaError>;
}
