use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use futures::stream::{self, StreamExt};

use candela_core::progress::percent;
use candela_core::{
    CandelaError, Coin, Granularity, PrefetchEntry, PrefetchFailure, PrefetchReport, Progress,
};

use crate::Candela;

/// Builder to warm the cache for many products and granularities at once.
pub struct PrefetchBuilder<'a> {
    pub(crate) candela: &'a Candela,
    pub(crate) products: Vec<String>,
    pub(crate) granularities: Vec<Granularity>,
    pub(crate) period: (Option<DateTime<Utc>>, Option<DateTime<Utc>>),
    pub(crate) concurrency: usize,
    pub(crate) progress: Option<Arc<dyn Progress>>,
}

impl<'a> PrefetchBuilder<'a> {
    /// Create a new builder bound to a `Candela` instance.
    ///
    /// Behavior:
    /// - Starts with no products and every granularity.
    /// - Each product's range defaults to `[earliest day, today 00:00 UTC)`.
    #[must_use]
    pub fn new(candela: &'a Candela) -> Self {
        Self {
            candela,
            products: Vec::new(),
            granularities: Granularity::ALL.to_vec(),
            period: (None, None),
            concurrency: 4,
            progress: None,
        }
    }

    /// Replace the product list.
    ///
    /// # Errors
    /// Returns an error if the list contains duplicates.
    pub fn products(mut self, products: &[&str]) -> Result<Self, CandelaError> {
        let mut seen = HashSet::new();
        for p in products {
            if !seen.insert(*p) {
                return Err(CandelaError::InvalidArg(format!(
                    "duplicate product '{p}' in products list"
                )));
            }
        }
        self.products = products.iter().map(|p| (*p).to_string()).collect();
        Ok(self)
    }

    /// Add a single product.
    ///
    /// # Errors
    /// Returns an error if the product is already in the list.
    pub fn add_product(mut self, product_id: &str) -> Result<Self, CandelaError> {
        if self.products.iter().any(|p| p == product_id) {
            return Err(CandelaError::InvalidArg(format!(
                "duplicate product '{product_id}' already exists in products list"
            )));
        }
        self.products.push(product_id.to_string());
        Ok(self)
    }

    /// Replace the product list with the trading pairs of `coins`.
    ///
    /// # Errors
    /// Returns an error if two coins map to the same product.
    pub fn coins(self, coins: &[Coin]) -> Result<Self, CandelaError> {
        let ids: Vec<String> = coins.iter().map(|c| self.candela.product_id(*c)).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        self.products(&refs)
    }

    /// Replace the product list with every coin in the registry.
    #[must_use]
    pub fn all_registered(mut self) -> Self {
        self.products = self
            .candela
            .registry()
            .iter()
            .map(|c| c.symbol.clone())
            .collect();
        self
    }

    /// Restrict to these granularities.
    #[must_use]
    pub fn granularities(mut self, granularities: &[Granularity]) -> Self {
        self.granularities = granularities.to_vec();
        self.granularities.sort();
        self.granularities.dedup();
        self
    }

    /// Use an explicit `[start, end)` for every product.
    #[must_use]
    pub const fn period(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.period = (Some(start), Some(end));
        self
    }

    /// Combinations fetched at once. The shared rate limiter still bounds the
    /// aggregate call rate.
    #[must_use]
    pub const fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }

    /// Report the share of finished combinations.
    #[must_use]
    pub fn progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Warm every `(product, granularity)` combination.
    ///
    /// Behavior and trade-offs:
    /// - Products without an explicit start are located first, up to
    ///   `concurrency` searches at once; a product whose search fails
    ///   contributes one warning per granularity.
    /// - A failing combination is recorded in `warnings` and skipped; the rest
    ///   of the batch continues.
    /// - Entries are sorted by product, then granularity.
    ///
    /// # Errors
    /// Returns an error only if no products or granularities are specified.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela::prefetch::run",
            skip(self),
            fields(products = self.products.len(), granularities = self.granularities.len()),
        )
    )]
    pub async fn run(self) -> Result<PrefetchReport, CandelaError> {
        if self.products.is_empty() {
            return Err(CandelaError::InvalidArg(
                "no products specified for prefetch".into(),
            ));
        }
        if self.granularities.is_empty() {
            return Err(CandelaError::InvalidArg(
                "no granularities specified for prefetch".into(),
            ));
        }
        let candela = self.candela;
        let concurrency = self.concurrency.max(1);
        let (first, last) = self.period;
        let end = last.unwrap_or_else(|| {
            Utc::now()
                .date_naive()
                .and_time(NaiveTime::MIN)
                .and_utc()
        });

        let starts: Vec<(&String, Result<DateTime<Utc>, CandelaError>)> =
            stream::iter(self.products.iter().map(|product| async move {
                let start = match first {
                    Some(s) => Ok(s),
                    None => candela
                        .earliest(product)
                        .await
                        .map(|d| d.and_time(NaiveTime::MIN).and_utc()),
                };
                (product, start)
            }))
            .buffered(concurrency)
            .collect()
            .await;

        let mut report = PrefetchReport::default();
        let mut jobs = Vec::new();
        for (product, start) in starts {
            for &g in &self.granularities {
                match &start {
                    Ok(s) => jobs.push((product.clone(), g, *s)),
                    Err(e) => report.warnings.push(PrefetchFailure {
                        product_id: product.clone(),
                        granularity: g,
                        error: e.clone(),
                    }),
                }
            }
        }

        let total = jobs.len();
        let mut done = 0usize;
        let mut results = stream::iter(jobs.into_iter().map(|(product, g, start)| async move {
            let res = candela.candles(&product, g, start, end.max(start)).await;
            (product, g, res)
        }))
        .buffer_unordered(concurrency);

        while let Some((product_id, granularity, res)) = results.next().await {
            match res {
                Ok(range) => report.entries.push(PrefetchEntry {
                    product_id,
                    granularity,
                    start: range.start,
                    end: range.end,
                    candles: range.len(),
                }),
                Err(error) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(%product_id, %granularity, %error, "prefetch failed, skipping");
                    report.warnings.push(PrefetchFailure {
                        product_id,
                        granularity,
                        error,
                    });
                }
            }
            done += 1;
            if let Some(p) = &self.progress {
                p.report(percent(done, total));
            }
        }

        report
            .entries
            .sort_by(|a, b| (&a.product_id, a.granularity).cmp(&(&b.product_id, b.granularity)));
        Ok(report)
    }
}
