//! Candle, range, and price-series value types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timeseries::merge::merge_candles_by_priority;
use crate::Granularity;

/// One OHLCV aggregate over a fixed bucket starting at `ts`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket open time.
    pub ts: DateTime<Utc>,
    /// First traded price in the bucket.
    pub open: f64,
    /// Highest traded price in the bucket.
    pub high: f64,
    /// Lowest traded price in the bucket.
    pub low: f64,
    /// Last traded price in the bucket.
    pub close: f64,
    /// Base-currency volume traded in the bucket.
    pub volume: f64,
}

impl Candle {
    /// True when the bucket closed at or above its open.
    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}

/// Ordered candles for one `(product, granularity)` covering `[start, end)`.
///
/// Invariant: `candles` is sorted ascending by `ts`, has no duplicate timestamps,
/// and every `ts` falls inside `[start, end)`. Missing buckets are legitimate
/// trade-free periods, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleRange {
    /// Exchange product id, e.g. `"BTC-USD"`.
    pub product_id: String,
    /// Bucket width.
    pub granularity: Granularity,
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Exclusive end.
    pub end: DateTime<Utc>,
    candles: Vec<Candle>,
}

impl CandleRange {
    /// Build a range, normalizing `candles` to satisfy the range invariant.
    ///
    /// Candles outside `[start, end)` are dropped, the rest are sorted, and for
    /// duplicate timestamps the first occurrence wins.
    pub fn new(
        product_id: impl Into<String>,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        candles: Vec<Candle>,
    ) -> Self {
        let candles = merge_candles_by_priority([candles])
            .into_iter()
            .filter(|c| c.ts >= start && c.ts < end)
            .collect();
        Self {
            product_id: product_id.into(),
            granularity,
            start,
            end,
            candles,
        }
    }

    /// An empty range (no trades) over `[start, end)`.
    pub fn empty(
        product_id: impl Into<String>,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            granularity,
            start,
            end,
            candles: Vec::new(),
        }
    }

    /// Candles in ascending order.
    #[must_use]
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Consume the range and return its candles.
    #[must_use]
    pub fn into_candles(self) -> Vec<Candle> {
        self.candles
    }

    /// Number of candles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// True when the range holds no candles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Sub-range `[start, end)` intersected with this range's bounds.
    #[must_use]
    pub fn slice(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let start = start.max(self.start);
        let end = end.min(self.end).max(start);
        let lo = self.candles.partition_point(|c| c.ts < start);
        let hi = self.candles.partition_point(|c| c.ts < end);
        Self {
            product_id: self.product_id.clone(),
            granularity: self.granularity,
            start,
            end,
            candles: self.candles[lo..hi].to_vec(),
        }
    }
}

/// Policy used to turn candles into a price path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interpolation {
    /// Zig-zag through each candle's low and high, ordered by candle direction.
    #[default]
    #[serde(rename = "Hi-Lo")]
    HiLo,
    /// One point per candle at the mean of its high and low.
    #[serde(rename = "mean")]
    Mean,
}

/// A single `(timestamp, price)` sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Sample time.
    pub ts: DateTime<Utc>,
    /// Price at `ts`.
    pub price: f64,
}

/// Ordered price samples derived from a [`CandleRange`].
///
/// Between samples the price is taken to move linearly, so the series describes
/// a continuous path; see [`PriceSeries::value_at`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Wrap points that are already sorted by `ts`.
    #[must_use]
    pub const fn from_sorted(points: Vec<PricePoint>) -> Self {
        Self { points }
    }

    /// Samples in ascending order.
    #[must_use]
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the series holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First sample, if any.
    #[must_use]
    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    /// Last sample, if any.
    #[must_use]
    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Price at `ts`, linearly interpolated between neighbouring samples.
    ///
    /// Times before the first or after the last sample are clamped to the
    /// respective end value. Returns `None` for an empty series.
    #[must_use]
    pub fn value_at(&self, ts: DateTime<Utc>) -> Option<f64> {
        let idx = self.points.partition_point(|p| p.ts <= ts);
        match (idx.checked_sub(1).map(|i| self.points[i]), self.points.get(idx)) {
            (None, None) => None,
            (Some(a), None) => Some(a.price),
            (None, Some(b)) => Some(b.price),
            (Some(a), Some(b)) => {
                let span = (b.ts - a.ts).num_milliseconds() as f64;
                let into = (ts - a.ts).num_milliseconds() as f64;
                Some(a.price + (b.price - a.price) * (into / span))
            }
        }
    }
}

impl IntoIterator for PriceSeries {
    type Item = PricePoint;
    type IntoIter = std::vec::IntoIter<PricePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}
