use core::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::CandelaError;

/// Candle bucket width accepted by the exchange.
///
/// Serialized as the raw number of seconds so persisted records stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Granularity {
    /// One-minute candles.
    M1,
    /// Five-minute candles.
    M5,
    /// Fifteen-minute candles.
    M15,
    /// Hourly candles.
    H1,
    /// Six-hour candles.
    H6,
    /// Daily candles.
    D1,
}

impl Granularity {
    /// Every granularity, finest first.
    pub const ALL: [Self; 6] = [Self::M1, Self::M5, Self::M15, Self::H1, Self::H6, Self::D1];

    /// Bucket width in seconds.
    #[must_use]
    pub const fn seconds(self) -> u32 {
        match self {
            Self::M1 => 60,
            Self::M5 => 300,
            Self::M15 => 900,
            Self::H1 => 3_600,
            Self::H6 => 21_600,
            Self::D1 => 86_400,
        }
    }

    /// Bucket width as a `chrono::TimeDelta`.
    #[must_use]
    pub fn delta(self) -> chrono::TimeDelta {
        chrono::TimeDelta::seconds(i64::from(self.seconds()))
    }

    /// Bucket width as a `std::time::Duration`.
    #[must_use]
    pub const fn duration(self) -> Duration {
        Duration::from_secs(self.seconds() as u64)
    }

    /// Short human label, e.g. `"1h"`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::H1 => "1h",
            Self::H6 => "6h",
            Self::D1 => "1d",
        }
    }
}

impl TryFrom<u32> for Granularity {
    type Error = CandelaError;

    fn try_from(secs: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|g| g.seconds() == secs)
            .ok_or_else(|| CandelaError::InvalidArg(format!("unsupported granularity: {secs}s")))
    }
}

impl From<Granularity> for u32 {
    fn from(g: Granularity) -> Self {
        g.seconds()
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
