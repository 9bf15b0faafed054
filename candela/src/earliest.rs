//! Persisted results of earliest-date searches.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use candela_core::CandelaError;

use crate::cache::write_atomic;

/// The earliest trading day found for a product.
///
/// `earliest: None` records that the product was confirmed to have no history.
/// Records never expire; use [`EarliestDateBook::forget`] when an exchange
/// backfills older data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarliestDateRecord {
    /// Exchange product id.
    pub product_id: String,
    /// First day with data, if any.
    pub earliest: Option<NaiveDate>,
}

/// Collection of [`EarliestDateRecord`]s, optionally mirrored to one JSON file.
///
/// The file is read lazily on first access and rewritten atomically after
/// every change.
pub struct EarliestDateBook {
    path: Option<PathBuf>,
    records: Mutex<Option<BTreeMap<String, Option<NaiveDate>>>>,
}

impl EarliestDateBook {
    /// A book that lives only as long as the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: Mutex::new(Some(BTreeMap::new())),
        }
    }

    /// A book persisted at `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            records: Mutex::new(None),
        }
    }

    /// Backing file, if persisted.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn read(path: &Path) -> Result<BTreeMap<String, Option<NaiveDate>>, CandelaError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        let records: Vec<EarliestDateRecord> = serde_json::from_slice(&bytes)
            .map_err(|e| CandelaError::storage(format!("{}: {e}", path.display())))?;
        Ok(records
            .into_iter()
            .map(|r| (r.product_id, r.earliest))
            .collect())
    }

    async fn persist(&self, map: &BTreeMap<String, Option<NaiveDate>>) -> Result<(), CandelaError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(&to_records(map))?;
        write_atomic(path, &bytes).await
    }

    async fn with_records<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, Option<NaiveDate>>) -> T,
    ) -> Result<T, CandelaError> {
        let mut guard = self.records.lock().await;
        if guard.is_none() {
            let loaded = match &self.path {
                Some(p) => Self::read(p).await?,
                None => BTreeMap::new(),
            };
            *guard = Some(loaded);
        }
        let map = guard.get_or_insert_with(BTreeMap::new);
        let mut next = map.clone();
        let out = f(&mut next);
        if next != *map {
            // memory only moves once the file does
            self.persist(&next).await?;
            *map = next;
        }
        Ok(out)
    }

    /// The record for `product_id`: `None` if never searched, `Some(None)` if
    /// confirmed empty.
    ///
    /// # Errors
    /// Returns `Storage` if the backing file cannot be read.
    pub async fn get(&self, product_id: &str) -> Result<Option<Option<NaiveDate>>, CandelaError> {
        self.with_records(|m| m.get(product_id).copied()).await
    }

    /// Store a search result.
    ///
    /// # Errors
    /// Returns `Storage` if the backing file cannot be written.
    pub async fn record(
        &self,
        product_id: &str,
        earliest: Option<NaiveDate>,
    ) -> Result<(), CandelaError> {
        self.with_records(|m| {
            m.insert(product_id.to_string(), earliest);
        })
        .await
    }

    /// Drop the record for `product_id`. Returns whether one existed.
    ///
    /// # Errors
    /// Returns `Storage` if the backing file cannot be written.
    pub async fn forget(&self, product_id: &str) -> Result<bool, CandelaError> {
        self.with_records(|m| m.remove(product_id).is_some()).await
    }

    /// Every record, ordered by product id.
    ///
    /// # Errors
    /// Returns `Storage` if the backing file cannot be read.
    pub async fn records(&self) -> Result<Vec<EarliestDateRecord>, CandelaError> {
        self.with_records(|m| to_records(m)).await
    }
}

fn to_records(map: &BTreeMap<String, Option<NaiveDate>>) -> Vec<EarliestDateRecord> {
    map.iter()
        .map(|(p, e)| EarliestDateRecord {
            product_id: p.clone(),
            earliest: *e,
        })
        .collect()
}
