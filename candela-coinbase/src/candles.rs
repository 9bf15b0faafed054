use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use candela_core::connector::{CandleSource, Transport};
use candela_core::{CandelaError, Candle, Granularity};

/// Candle source for `GET /products/{id}/candles`.
pub struct CoinbaseCandles {
    transport: Arc<dyn Transport>,
}

impl CoinbaseCandles {
    /// Issue requests through `transport` (usually a rate-limited, retrying stack).
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// The transport requests go through.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn num(v: &serde_json::Value, field: &str, row: usize) -> Result<f64, CandelaError> {
    v.as_f64()
        .ok_or_else(|| CandelaError::data(format!("row {row}: {field} is not a number")))
}

/// Parse the endpoint's `[time, low, high, open, close, volume]` rows.
///
/// Rows come back newest-first; ordering is left to the caller.
///
/// # Errors
/// Returns `CandelaError::Data` for a non-array body, a short row, or a
/// non-numeric field.
pub fn parse_rows(body: &serde_json::Value) -> Result<Vec<Candle>, CandelaError> {
    let rows = body
        .as_array()
        .ok_or_else(|| CandelaError::data(format!("expected candle array, got {body}")))?;
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let cols = row
                .as_array()
                .filter(|c| c.len() >= 6)
                .ok_or_else(|| CandelaError::data(format!("row {i}: expected 6 columns")))?;
            let secs = cols[0]
                .as_i64()
                .or_else(|| cols[0].as_f64().map(|f| f as i64))
                .ok_or_else(|| CandelaError::data(format!("row {i}: bad time")))?;
            let ts = DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| CandelaError::data(format!("row {i}: time out of range")))?;
            Ok(Candle {
                ts,
                low: num(&cols[1], "low", i)?,
                high: num(&cols[2], "high", i)?,
                open: num(&cols[3], "open", i)?,
                close: num(&cols[4], "close", i)?,
                volume: num(&cols[5], "volume", i)?,
            })
        })
        .collect()
}

#[async_trait]
impl CandleSource for CoinbaseCandles {
    fn name(&self) -> &'static str {
        self.transport.name()
    }

    async fn candles(
        &self,
        product_id: &str,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, CandelaError> {
        let path = format!("/products/{product_id}/candles");
        let query = [
            ("start", iso(start)),
            ("end", iso(end)),
            ("granularity", granularity.seconds().to_string()),
        ];
        let body = self.transport.get(&path, &query).await?;
        parse_rows(&body)
    }
}
