//! Binary search for the first trading day of a product.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{NaiveDate, NaiveTime, TimeDelta, Utc};

use candela_core::connector::CandleSource;
use candela_core::{CandelaError, LocatorConfig};

/// Finds the earliest date for which a product has at least one candle.
///
/// Each probe asks the source for a single-day window. A failed probe counts as
/// "no data" rather than an error, since an unlisted or not-yet-listed product
/// is an expected outcome of the search. Probes for one product are strictly
/// sequential; searches for different products are independent.
pub struct EarliestDateLocator {
    source: Arc<dyn CandleSource>,
    config: LocatorConfig,
    probes: AtomicUsize,
}

impl EarliestDateLocator {
    /// Search through `source` within the bounds of `config`.
    pub fn new(source: Arc<dyn CandleSource>, config: LocatorConfig) -> Self {
        Self {
            source,
            config,
            probes: AtomicUsize::new(0),
        }
    }

    /// The active search bounds.
    pub const fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Probes issued so far across all searches.
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::Relaxed)
    }

    fn ceiling(&self) -> NaiveDate {
        self.config
            .ceiling
            .unwrap_or_else(|| Utc::now().date_naive() - TimeDelta::days(1))
    }

    async fn has_data(&self, product_id: &str, day: NaiveDate) -> bool {
        self.probes.fetch_add(1, Ordering::Relaxed);
        let start = day.and_time(NaiveTime::MIN).and_utc();
        let end = start + TimeDelta::days(1);
        match self
            .source
            .candles(product_id, self.config.probe_granularity, start, end)
            .await
        {
            Ok(candles) => candles.iter().any(|c| c.ts >= start && c.ts < end),
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(product_id, %day, error = %_e, "probe failed, treating day as empty");
                false
            }
        }
    }

    /// Locate the first day with data, searching from the configured floor.
    ///
    /// # Errors
    /// Returns `NotFound` when the ceiling itself has no data (the product has
    /// never traded) or the final verification fails.
    pub async fn locate(&self, product_id: &str) -> Result<NaiveDate, CandelaError> {
        self.locate_from(product_id, self.config.floor).await
    }

    /// Locate the first day with data, searching upwards from `floor`.
    ///
    /// The result is exact when `floor` itself has no data. The lower bound is
    /// assumed data-free and never probed, so when trading began on or before
    /// `floor` the answer can be `floor + 1 day`.
    ///
    /// # Errors
    /// Returns `InvalidArg` if `floor` is after the ceiling and `NotFound` as
    /// for [`locate`](Self::locate).
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "candela::locator::locate", skip(self), err)
    )]
    pub async fn locate_from(
        &self,
        product_id: &str,
        floor: NaiveDate,
    ) -> Result<NaiveDate, CandelaError> {
        let ceiling = self.ceiling();
        if floor > ceiling {
            return Err(CandelaError::InvalidArg(format!(
                "search floor {floor} is after ceiling {ceiling}"
            )));
        }
        let not_found = || CandelaError::not_found(format!("history for {product_id}"));

        if !self.has_data(product_id, ceiling).await {
            return Err(not_found());
        }

        let (mut low, mut high) = (floor, ceiling);
        while (high - low).num_days() > 1 {
            let mid = low + TimeDelta::days((high - low).num_days() / 2);
            if self.has_data(product_id, mid).await {
                high = mid;
            } else {
                low = mid;
            }
        }

        if self.has_data(product_id, high).await {
            return Ok(high);
        }
        let next = high + TimeDelta::days(1);
        if next <= ceiling && self.has_data(product_id, next).await {
            return Ok(next);
        }
        Err(not_found())
    }
}
