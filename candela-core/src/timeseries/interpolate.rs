use crate::{CandleRange, Interpolation, PricePoint, PriceSeries};

/// Convert a candle range into a price path.
///
/// `Interpolation::Mean` emits one point per candle at its open time with the
/// price `(high + low) / 2`.
///
/// `Interpolation::HiLo` emits two points per candle: the first extreme at the
/// open time and the second at the middle of the bucket. A bullish candle
/// (close >= open) visits its low first and then its high; a bearish candle
/// visits its high first and then its low. Linear motion between consecutive
/// points is implied.
///
/// The output is ordered by timestamp; an empty range yields an empty series.
#[must_use]
pub fn interpolate(range: &CandleRange, policy: Interpolation) -> PriceSeries {
    let candles = range.candles();
    let half = range.granularity.delta() / 2;
    let points = match policy {
        Interpolation::Mean => candles
            .iter()
            .map(|c| PricePoint {
                ts: c.ts,
                price: (c.high + c.low) / 2.0,
            })
            .collect(),
        Interpolation::HiLo => {
            let mut out = Vec::with_capacity(candles.len() * 2);
            for c in candles {
                let (first, second) = if c.is_bullish() {
                    (c.low, c.high)
                } else {
                    (c.high, c.low)
                };
                out.push(PricePoint {
                    ts: c.ts,
                    price: first,
                });
                out.push(PricePoint {
                    ts: c.ts + half,
                    price: second,
                });
            }
            out
        }
    };
    PriceSeries::from_sorted(points)
}
