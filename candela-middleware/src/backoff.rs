use std::time::Duration;

use rand::Rng;

/// `delay` stretched by a random extra of up to `percent` percent.
///
/// Sub-millisecond jitter is dropped; `percent == 0` returns `delay` unchanged.
pub fn jittered(delay: Duration, percent: u32) -> Duration {
    let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    let spread = ms.saturating_mul(u64::from(percent.min(100))) / 100;
    if spread == 0 {
        return delay;
    }
    delay.saturating_add(Duration::from_millis(rand::rng().random_range(0..=spread)))
}
