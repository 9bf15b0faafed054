use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use candela_core::{CandelaError, Candle, CandleRange, Granularity};

/// Identity of one cache record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    /// Exchange product id.
    pub product_id: String,
    /// Bucket width.
    pub granularity: Granularity,
}

impl CacheKey {
    /// Key for `(product_id, granularity)`.
    pub fn new(product_id: impl Into<String>, granularity: Granularity) -> Self {
        Self {
            product_id: product_id.into(),
            granularity,
        }
    }
}

/// Persisted candles for one `(product, granularity)` plus the envelope
/// `[start, end)` they are known to fully cover.
///
/// Buckets inside the envelope without a candle are trade-free periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Exchange product id.
    pub product_id: String,
    /// Bucket width.
    pub granularity: Granularity,
    /// Inclusive start of the covered envelope.
    pub start: DateTime<Utc>,
    /// Exclusive end of the covered envelope.
    pub end: DateTime<Utc>,
    /// Candles sorted by `ts`, unique, inside the envelope.
    pub candles: Vec<Candle>,
}

impl CacheEntry {
    /// The record's key.
    #[must_use]
    pub fn key(&self) -> CacheKey {
        CacheKey::new(self.product_id.clone(), self.granularity)
    }

    /// True when `[start, end)` lies inside the envelope.
    #[must_use]
    pub fn covers(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start >= self.start && end <= self.end
    }

    /// Cached candles within `[start, end)` as a range with those exact bounds.
    #[must_use]
    pub fn slice(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> CandleRange {
        let lo = self.candles.partition_point(|c| c.ts < start);
        let hi = self.candles.partition_point(|c| c.ts < end).max(lo);
        CandleRange::new(
            self.product_id.clone(),
            self.granularity,
            start,
            end,
            self.candles[lo..hi].to_vec(),
        )
    }
}

/// Pluggable persistence for cache entries.
///
/// `save` must replace the previous record atomically: after a crash either
/// the old or the new entry is readable, never a mix.
#[async_trait]
pub trait CandleStore: Send + Sync {
    /// Read the entry for `key`, if any.
    async fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CandelaError>;
    /// Replace the entry for `entry.key()`.
    async fn save(&self, entry: &CacheEntry) -> Result<(), CandelaError>;
    /// Delete the entry for `key`. Deleting a missing entry is not an error.
    async fn remove(&self, key: &CacheKey) -> Result<(), CandelaError>;
}

/// Process-lifetime store.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CandleStore for MemoryStore {
    async fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CandelaError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn save(&self, entry: &CacheEntry) -> Result<(), CandelaError> {
        self.entries.lock().await.insert(entry.key(), entry.clone());
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), CandelaError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// One JSON file per `(product, granularity)` under a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store files under `dir`, creating it on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory holding the entries.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`, e.g. `BTC-USD_3600.json`.
    #[must_use]
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        let product: String = key
            .product_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir
            .join(format!("{product}_{}.json", key.granularity.seconds()))
    }
}

/// Write `bytes` to `path` via a sibling temp file and a rename.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CandelaError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl CandleStore for FileStore {
    async fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CandelaError> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry: CacheEntry = serde_json::from_slice(&bytes).map_err(|e| {
            CandelaError::storage(format!("{}: {e}", path.display()))
        })?;
        if entry.key() != *key {
            return Err(CandelaError::storage(format!(
                "{}: holds {} {}",
                path.display(),
                entry.product_id,
                entry.granularity
            )));
        }
        Ok(Some(entry))
    }

    async fn save(&self, entry: &CacheEntry) -> Result<(), CandelaError> {
        let bytes = serde_json::to_vec(entry)?;
        write_atomic(&self.path_for(&entry.key()), &bytes).await
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), CandelaError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
