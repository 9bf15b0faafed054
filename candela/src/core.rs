use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use candela_core::connector::{CandleSource, Transport};
use candela_core::{
    CandelaConfig, CandelaError, CandleRange, Coin, CoinRegistry, FetchConfig, Granularity,
    Interpolation, LocatorConfig, NoProgress, PriceSeries, Progress, interpolate,
};

use candela_middleware::TransportBuilder;

use crate::cache::{CandleStore, FileStore, MemoryStore, RangeCache};
use crate::earliest::EarliestDateBook;
use crate::fetcher::ChunkedFetcher;
use crate::locator::EarliestDateLocator;
use crate::locks::KeyedLocks;
use crate::prefetch::PrefetchBuilder;

/// File name of the earliest-date book inside the cache directory.
pub const EARLIEST_FILE: &str = "earliest_dates.json";

/// The acquisition engine: earliest-date discovery, cached range fetches, and
/// price-series derivation over a single candle source.
pub struct Candela {
    pub(crate) source: Arc<dyn CandleSource>,
    pub(crate) cache: RangeCache,
    pub(crate) locator: EarliestDateLocator,
    pub(crate) book: EarliestDateBook,
    pub(crate) registry: CoinRegistry,
    pub(crate) hints: HashMap<String, NaiveDate>,
    pub(crate) cfg: CandelaConfig,
    locating: KeyedLocks<String, ()>,
}

type SourceFactory = Box<dyn FnOnce(Arc<dyn Transport>) -> Arc<dyn CandleSource> + Send>;

enum SourceSpec {
    Ready(Arc<dyn CandleSource>),
    Paced(Arc<dyn Transport>, SourceFactory),
}

/// Builder for constructing a [`Candela`] engine.
pub struct CandelaBuilder {
    source: Option<SourceSpec>,
    store: Option<Arc<dyn CandleStore>>,
    registry: CoinRegistry,
    hints: HashMap<String, NaiveDate>,
    cfg: CandelaConfig,
}

impl Default for CandelaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CandelaBuilder {
    /// Create a new builder with default configuration.
    ///
    /// A candle source is required; everything else is optional. Without a
    /// cache directory or explicit store, cached ranges and earliest dates live
    /// in memory only.
    #[must_use]
    pub fn new() -> Self {
        Self {
            source: None,
            store: None,
            registry: CoinRegistry::default(),
            hints: HashMap::new(),
            cfg: CandelaConfig::default(),
        }
    }

    /// Set the candle source (usually an exchange connector over a paced,
    /// retrying transport). The configured rate limit and retry policy are
    /// not applied to it.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn CandleSource>) -> Self {
        self.source = Some(SourceSpec::Ready(source));
        self
    }

    /// Use a raw transport wrapped at build time with the configured
    /// [`RateLimitConfig`](candela_core::RateLimitConfig) and
    /// [`RetryConfig`](candela_core::RetryConfig); `make` turns the wrapped
    /// transport into the candle source.
    ///
    /// Replaces any source set with [`with_source`](Self::with_source).
    #[must_use]
    pub fn with_transport<F, S>(mut self, raw: Arc<dyn Transport>, make: F) -> Self
    where
        F: FnOnce(Arc<dyn Transport>) -> S + Send + 'static,
        S: CandleSource + 'static,
    {
        let factory: SourceFactory =
            Box::new(move |t| -> Arc<dyn CandleSource> { Arc::new(make(t)) });
        self.source = Some(SourceSpec::Paced(raw, factory));
        self
    }

    /// Persist cache entries through a custom store.
    ///
    /// Takes precedence over [`cache_dir`](Self::cache_dir) for candle data;
    /// the earliest-date book still follows `cache_dir`.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn CandleStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use `registry` for coin lookups. Its `start_date` values become
    /// earliest-date hints unless a hint for the same product is set explicitly.
    #[must_use]
    pub fn with_registry(mut self, registry: CoinRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Declare the first trading day of `product_id`, skipping the search.
    #[must_use]
    pub fn with_hint(mut self, product_id: &str, earliest: NaiveDate) -> Self {
        self.hints.insert(product_id.to_string(), earliest);
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, cfg: CandelaConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Persist cache entries and earliest-date records under `dir`.
    #[must_use]
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cfg.cache_dir = Some(dir.into());
        self
    }

    /// Set range partitioning and fan-out.
    #[must_use]
    pub const fn fetch_config(mut self, fetch: FetchConfig) -> Self {
        self.cfg.fetch = fetch;
        self
    }

    /// Set earliest-date search bounds.
    #[must_use]
    pub const fn locator_config(mut self, locator: LocatorConfig) -> Self {
        self.cfg.locator = locator;
        self
    }

    /// Build the engine.
    ///
    /// # Errors
    /// Returns `InvalidArg` if no source was set, the per-request candle limit
    /// or concurrency is zero, a one-day probe at the locator's granularity
    /// would exceed the per-request candle limit, or the locator floor is
    /// after its ceiling.
    pub fn build(self) -> Result<Candela, CandelaError> {
        let spec = self
            .source
            .ok_or_else(|| CandelaError::InvalidArg("no candle source configured".into()))?;
        if self.cfg.fetch.max_candles_per_request == 0 {
            return Err(CandelaError::InvalidArg(
                "max_candles_per_request must be at least 1".into(),
            ));
        }
        if self.cfg.fetch.concurrency == 0 {
            return Err(CandelaError::InvalidArg(
                "concurrency must be at least 1".into(),
            ));
        }
        let probe = self.cfg.locator.probe_granularity;
        let per_day = Granularity::D1.seconds() / probe.seconds();
        if per_day > self.cfg.fetch.max_candles_per_request {
            return Err(CandelaError::InvalidArg(format!(
                "a one-day probe at {} spans {per_day} candles, over the limit of {}",
                probe.label(),
                self.cfg.fetch.max_candles_per_request
            )));
        }
        if let Some(ceiling) = self.cfg.locator.ceiling
            && self.cfg.locator.floor > ceiling
        {
            return Err(CandelaError::InvalidArg(format!(
                "locator floor {} is after ceiling {ceiling}",
                self.cfg.locator.floor
            )));
        }

        let source = match spec {
            SourceSpec::Ready(source) => source,
            SourceSpec::Paced(raw, make) => {
                let transport = TransportBuilder::new(raw)
                    .with_rate_limit(self.cfg.rate_limit)
                    .with_retry_config(&self.cfg.retry)
                    .build()?;
                make(transport)
            }
        };

        let store: Arc<dyn CandleStore> = match (self.store, &self.cfg.cache_dir) {
            (Some(s), _) => s,
            (None, Some(dir)) => Arc::new(FileStore::new(dir.clone())),
            (None, None) => Arc::new(MemoryStore::new()),
        };
        let book = self.cfg.cache_dir.as_ref().map_or_else(EarliestDateBook::in_memory, |d| {
            EarliestDateBook::at(d.join(EARLIEST_FILE))
        });

        let mut hints: HashMap<String, NaiveDate> = self
            .registry
            .iter()
            .filter_map(|c| c.start_date.map(|d| (c.symbol.clone(), d)))
            .collect();
        hints.extend(self.hints);

        let fetcher = ChunkedFetcher::new(Arc::clone(&source), self.cfg.fetch);
        Ok(Candela {
            locator: EarliestDateLocator::new(Arc::clone(&source), self.cfg.locator),
            cache: RangeCache::new(fetcher, store),
            source,
            book,
            registry: self.registry,
            hints,
            cfg: self.cfg,
            locating: KeyedLocks::default(),
        })
    }
}

impl Candela {
    /// Start building a new `Candela` instance.
    ///
    /// ```rust,ignore
    /// use std::sync::Arc;
    /// use candela::Candela;
    /// use candela_coinbase::{CoinbaseCandles, HttpTransport};
    /// use candela_middleware::TokenBucket;
    ///
    /// let limiter = TokenBucket::shared(Default::default());
    /// let transport = HttpTransport::rate_limited(limiter)?.build()?;
    /// let candela = Candela::builder()
    ///     .with_source(Arc::new(CoinbaseCandles::new(transport)))
    ///     .cache_dir("data/cache")
    ///     .build()?;
    /// ```
    #[must_use]
    pub fn builder() -> CandelaBuilder {
        CandelaBuilder::new()
    }

    /// Active configuration.
    pub const fn config(&self) -> &CandelaConfig {
        &self.cfg
    }

    /// The coin registry.
    pub const fn registry(&self) -> &CoinRegistry {
        &self.registry
    }

    /// The range cache.
    pub const fn cache(&self) -> &RangeCache {
        &self.cache
    }

    /// The earliest-date locator.
    pub const fn locator(&self) -> &EarliestDateLocator {
        &self.locator
    }

    /// The earliest-date book.
    pub const fn earliest_book(&self) -> &EarliestDateBook {
        &self.book
    }

    /// The underlying candle source.
    pub fn source(&self) -> &Arc<dyn CandleSource> {
        &self.source
    }

    /// Product id for `coin` per the registry.
    #[must_use]
    pub fn product_id(&self, coin: Coin) -> String {
        self.registry.product_id(coin)
    }

    /// Earliest day known without probing: a hint, then a stored record.
    ///
    /// `Ok(None)` means nothing is known yet; `Ok(Some(None))` means the
    /// product was confirmed to have no history.
    ///
    /// # Errors
    /// Returns `Storage` if the earliest-date book cannot be read.
    pub async fn known_earliest(
        &self,
        product_id: &str,
    ) -> Result<Option<Option<NaiveDate>>, CandelaError> {
        if let Some(d) = self.hints.get(product_id) {
            return Ok(Some(Some(*d)));
        }
        self.book.get(product_id).await
    }

    /// First trading day of `product_id`, running the search once and
    /// persisting the outcome.
    ///
    /// # Errors
    /// Returns `NotFound` if the product has no history (also when a previous
    /// search recorded that), or `Storage` if the result cannot be persisted.
    pub async fn earliest(&self, product_id: &str) -> Result<NaiveDate, CandelaError> {
        let lock = self.locating.get(product_id.to_string()).await;
        let _guard = lock.lock().await;
        let not_found = || CandelaError::not_found(format!("history for {product_id}"));

        match self.known_earliest(product_id).await? {
            Some(Some(d)) => return Ok(d),
            Some(None) => return Err(not_found()),
            None => {}
        }
        match self.locator.locate(product_id).await {
            Ok(d) => {
                self.book.record(product_id, Some(d)).await?;
                Ok(d)
            }
            Err(CandelaError::NotFound { what }) => {
                self.book.record(product_id, None).await?;
                Err(CandelaError::NotFound { what })
            }
            Err(e) => Err(e),
        }
    }

    /// [`earliest`](Self::earliest) for a registered coin.
    ///
    /// # Errors
    /// As for [`earliest`](Self::earliest).
    pub async fn earliest_for(&self, coin: Coin) -> Result<NaiveDate, CandelaError> {
        self.earliest(&self.product_id(coin)).await
    }

    /// Drop the stored earliest-date record for `product_id`. Hints are kept.
    ///
    /// # Errors
    /// Returns `Storage` if the book cannot be written.
    pub async fn forget_earliest(&self, product_id: &str) -> Result<bool, CandelaError> {
        self.book.forget(product_id).await
    }

    /// Candles for `[start, end)`, served from the cache where possible.
    ///
    /// # Errors
    /// See [`candles_with_progress`](Self::candles_with_progress).
    pub async fn candles(
        &self,
        product_id: &str,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<CandleRange, CandelaError> {
        self.candles_with_progress(product_id, granularity, start, end, &NoProgress)
            .await
    }

    /// Like [`candles`](Self::candles), reporting fetch progress.
    ///
    /// When the product's earliest day is already known, `start` is clamped up
    /// to it so no requests are spent before listing.
    ///
    /// # Errors
    /// Returns `NotFound` if the product is recorded as having no history,
    /// `InvalidArg` if `start > end`, and any fetch or storage error.
    pub async fn candles_with_progress(
        &self,
        product_id: &str,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        progress: &dyn Progress,
    ) -> Result<CandleRange, CandelaError> {
        if start > end {
            return Err(CandelaError::InvalidArg(format!(
                "start {start} is after end {end}"
            )));
        }
        let start = match self.known_earliest(product_id).await? {
            Some(Some(day)) => start.max(day.and_time(NaiveTime::MIN).and_utc()),
            Some(None) => {
                return Err(CandelaError::not_found(format!(
                    "history for {product_id}"
                )));
            }
            None => start,
        };
        if start >= end {
            progress.report(100);
            return Ok(CandleRange::empty(product_id, granularity, end, end));
        }
        self.cache
            .get_with_progress(product_id, granularity, start, end, progress)
            .await
    }

    /// Continuous price path for `[start, end)` derived with `policy`.
    ///
    /// # Errors
    /// As for [`candles`](Self::candles).
    pub async fn prices(
        &self,
        product_id: &str,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        policy: Interpolation,
    ) -> Result<PriceSeries, CandelaError> {
        let range = self.candles(product_id, granularity, start, end).await?;
        Ok(interpolate(&range, policy))
    }

    /// Start a batch cache warm-up.
    #[must_use]
    pub fn prefetch(&self) -> PrefetchBuilder<'_> {
        PrefetchBuilder::new(self)
    }
}
