//! Saved backtests: a file-backed key-value store plus the library index.
//!
//! Each key is one pretty-printed JSON document `<dir>/<key>.json`. Saved
//! backtests live under their own name; the reserved key `library` holds the
//! index of everything saved, with just enough metadata to list and sort
//! without opening each record.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use rptr_core::domain::{Bar, OrderEvent, Timestamp};
use rptr_core::metrics::{summarize, BacktestSummary};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Key of the library index document.
pub const LIBRARY_KEY: &str = "library";

const MAX_KEY_LEN: usize = 128;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store document '{key}': {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid key '{0}' (use letters, digits, '-', '_' or '.')")]
    InvalidKey(String),

    #[error("'{0}' is reserved")]
    ReservedKey(String),

    #[error("no saved backtest named '{0}'")]
    NotFound(String),
}

/// A saved backtest: both input streams, the strategy source and derived metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRecord {
    pub name: String,
    /// Date of the first save; re-saving under the same name keeps it.
    pub saved: NaiveDate,
    /// BLAKE3 over bars and orders.
    pub input_hash: String,
    #[serde(default)]
    pub summary: Option<BacktestSummary>,
    #[serde(default)]
    pub strategy: Option<String>,
    pub bars: Vec<Bar>,
    pub orders: Vec<OrderEvent>,
}

/// Library index entry. Metric fields are absent when the summary was undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub cagr_pct: Option<f64>,
    pub max_dd_pct: Option<f64>,
    pub period_days: Option<i64>,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub saved: NaiveDate,
}

impl LibraryEntry {
    fn from_record(record: &BacktestRecord) -> Self {
        let s = record.summary.as_ref();
        Self {
            cagr_pct: s.map(|s| s.cagr_pct),
            max_dd_pct: s.map(|s| s.max_dd_pct),
            period_days: s.map(|s| s.period_days),
            start: s.map(|s| s.start_date),
            end: s.map(|s| s.end_date),
            saved: record.saved,
        }
    }
}

/// Name → entry, sorted by name.
pub type Library = BTreeMap<String, LibraryEntry>;

/// File-per-key JSON store rooted at a directory.
#[derive(Debug, Clone)]
pub struct BacktestStore {
    dir: PathBuf,
}

impl BacktestStore {
    /// Open the store, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let value = serde_json::from_str(&json).map_err(|source| StoreError::Json {
            key: key.to_string(),
            source,
        })?;
        Ok(Some(value))
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
            key: key.to_string(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(key, "store put");
        Ok(())
    }

    /// Remove a key. Returns whether it existed.
    pub fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(key, "store delete");
        Ok(true)
    }

    /// All keys in the store, sorted.
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let mut keys: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let path = e.path();
                if path.extension().and_then(|x| x.to_str()) != Some("json") {
                    return None;
                }
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(String::from)
            })
            .filter(|k| validate_key(k).is_ok())
            .collect();
        keys.sort();
        Ok(keys)
    }

    // ── Backtests and library ────────────────────────────────────────

    pub fn list_library(&self) -> Result<Library, StoreError> {
        Ok(self.get(LIBRARY_KEY)?.unwrap_or_default())
    }

    /// Save under `name` with today's date (or the original date on re-save).
    pub fn save_backtest(
        &self,
        name: &str,
        bars: &[Bar],
        orders: &[OrderEvent],
        strategy: Option<&str>,
    ) -> Result<LibraryEntry, StoreError> {
        self.save_backtest_on(name, bars, orders, strategy, Utc::now().date_naive())
    }

    pub fn save_backtest_on(
        &self,
        name: &str,
        bars: &[Bar],
        orders: &[OrderEvent],
        strategy: Option<&str>,
        today: NaiveDate,
    ) -> Result<LibraryEntry, StoreError> {
        if name == LIBRARY_KEY {
            return Err(StoreError::ReservedKey(name.to_string()));
        }
        validate_key(name)?;

        let saved = match self.get::<BacktestRecord>(name)? {
            Some(existing) => existing.saved,
            None => today,
        };
        let record = BacktestRecord {
            name: name.to_string(),
            saved,
            input_hash: input_hash(bars, orders),
            summary: summarize(orders).ok(),
            strategy: strategy.map(String::from),
            bars: bars.to_vec(),
            orders: orders.to_vec(),
        };
        self.put(name, &record)?;

        let entry = LibraryEntry::from_record(&record);
        let mut library = self.list_library()?;
        library.insert(name.to_string(), entry.clone());
        self.put(LIBRARY_KEY, &library)?;

        info!(name, bars = bars.len(), orders = orders.len(), "saved backtest");
        Ok(entry)
    }

    pub fn load_backtest(&self, name: &str) -> Result<BacktestRecord, StoreError> {
        if name == LIBRARY_KEY {
            return Err(StoreError::ReservedKey(name.to_string()));
        }
        self.get(name)?
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    /// Remove the record and its library entry. Returns whether either existed.
    pub fn delete_backtest(&self, name: &str) -> Result<bool, StoreError> {
        if name == LIBRARY_KEY {
            return Err(StoreError::ReservedKey(name.to_string()));
        }
        let removed_record = self.delete(name)?;
        let mut library = self.list_library()?;
        let removed_entry = library.remove(name).is_some();
        if removed_entry {
            self.put(LIBRARY_KEY, &library)?;
        }
        if removed_record || removed_entry {
            info!(name, "deleted backtest");
        }
        Ok(removed_record || removed_entry)
    }
}

fn validate_key(key: &str) -> Result<(), StoreError> {
    let ok = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// Deterministic BLAKE3 hash over both input streams.
pub fn input_hash(bars: &[Bar], orders: &[OrderEvent]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.time.secs().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
    }
    for order in orders {
        hasher.update(&order.time.secs().to_le_bytes());
        hasher.update(order.order_type.as_str().as_bytes());
        hasher.update(order.id.as_bytes());
        for field in [
            &order.price,
            &order.quantity,
            &order.av_price,
            &order.position,
            &order.pnl,
            &order.balance,
            &order.drawdown,
        ] {
            hasher.update(field.raw().as_bytes());
            hasher.update(b"\x1f");
        }
    }
    hasher.finalize().to_hex().to_string()
}
