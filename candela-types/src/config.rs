//! Configuration types shared across the transport stack and the engine.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Granularity;

/// Process-wide outbound call rate.
///
/// Calls are spaced `1 / per_second` apart; `burst` lets that many calls go out
/// back-to-back after an idle period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Sustained calls per second.
    pub per_second: u32,
    /// Calls that may be granted without spacing after idling (>= 1).
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: 10,
            burst: 1,
        }
    }
}

impl RateLimitConfig {
    /// Spacing between two consecutive grants.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(1) / self.per_second.max(1)
    }
}

/// Exponential backoff for transient transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one (>= 1).
    pub max_attempts: u32,
    /// Delay before the first retry; doubles after each subsequent failure.
    pub base_delay: Duration,
    /// Upper bound for a single backoff delay.
    pub max_delay: Duration,
    /// Random jitter percentage [0, 100] added to each delay.
    pub jitter_percent: u8,
    /// Deadline applied to every individual attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
            jitter_percent: 0,
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

/// Most candles the exchange returns for a single request.
pub const MAX_CANDLES_PER_REQUEST: u32 = 300;

/// Sub-window partitioning and fan-out for range fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-call candle ceiling imposed by the exchange.
    pub max_candles_per_request: u32,
    /// Sub-window fetches allowed in flight at once.
    pub concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_candles_per_request: MAX_CANDLES_PER_REQUEST,
            concurrency: 10,
        }
    }
}

/// Search bounds for the earliest-date locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// Lower bound of the search (the exchange's founding date by default).
    pub floor: NaiveDate,
    /// Known-safe upper bound. `None` means "yesterday" at the time of the search.
    pub ceiling: Option<NaiveDate>,
    /// Granularity used for single-day probes.
    pub probe_granularity: Granularity,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            floor: NaiveDate::from_ymd_opt(2012, 1, 1).unwrap_or(NaiveDate::MIN),
            ceiling: None,
            probe_granularity: Granularity::D1,
        }
    }
}

/// Global configuration for the `Candela` engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandelaConfig {
    /// Outbound call rate shared by every component. Applied when the engine
    /// wraps a raw transport itself (`CandelaBuilder::with_transport`).
    pub rate_limit: RateLimitConfig,
    /// Retry policy and per-attempt deadline for transient failures, applied
    /// alongside `rate_limit`.
    pub retry: RetryConfig,
    /// Range partitioning and fan-out.
    pub fetch: FetchConfig,
    /// Earliest-date search bounds.
    pub locator: LocatorConfig,
    /// Directory holding persisted cache entries and earliest-date records.
    /// `None` keeps everything in memory for the lifetime of the process.
    pub cache_dir: Option<PathBuf>,
}

impl Default for CandelaConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            fetch: FetchConfig::default(),
            locator: LocatorConfig::default(),
            cache_dir: None,
        }
    }
}
