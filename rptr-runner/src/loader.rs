//! Loading a backtest selection and guarding against stale completions.
//!
//! Both input streams are fetched concurrently and joined before anything is
//! derived from them. Every selection is tagged with a generation token; a
//! completion whose token is no longer current is dropped instead of
//! overwriting a newer selection.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;
use rptr_core::{BacktestContext, CoreError, ViewSettings};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ingest::{load_bars_csv, load_orders_csv, IngestError};
use crate::store::{input_hash, BacktestStore, StoreError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cannot build overlays: {0}")]
    Core(#[from] CoreError),

    #[error("read strategy {path}: {source}")]
    Strategy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What to load.
#[derive(Debug, Clone)]
pub enum SelectionSource {
    Files {
        bars: PathBuf,
        orders: PathBuf,
        strategy: Option<PathBuf>,
    },
    Saved {
        store: BacktestStore,
        name: String,
    },
}

impl SelectionSource {
    /// Short label for headers and logs.
    pub fn label(&self) -> String {
        match self {
            SelectionSource::Files { orders, .. } => orders.display().to_string(),
            SelectionSource::Saved { name, .. } => name.clone(),
        }
    }
}

/// Where a loaded backtest came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    Files { bars: PathBuf, orders: PathBuf },
    Saved { name: String, saved: NaiveDate },
}

/// One fully loaded selection: the immutable context plus what surrounds it.
#[derive(Debug, Clone)]
pub struct LoadedBacktest {
    pub context: BacktestContext,
    pub strategy: Option<String>,
    pub provenance: Provenance,
    pub input_hash: String,
}

/// Load a selection, fetching both streams concurrently.
pub fn load_inputs(
    source: &SelectionSource,
    settings: &ViewSettings,
) -> Result<LoadedBacktest, LoadError> {
    match source {
        SelectionSource::Files {
            bars,
            orders,
            strategy,
        } => {
            let (bars_result, orders_result) =
                rayon::join(|| load_bars_csv(bars), || load_orders_csv(orders));
            let (bar_data, order_data) = (bars_result?, orders_result?);
            let strategy_text = strategy.as_deref().map(read_strategy).transpose()?;
            let hash = input_hash(&bar_data, &order_data);
            let context = BacktestContext::new(bar_data, order_data, settings)?;
            info!(
                bars = context.bars().len(),
                orders = context.events().len(),
                "loaded backtest from files"
            );
            Ok(LoadedBacktest {
                context,
                strategy: strategy_text,
                provenance: Provenance::Files {
                    bars: bars.clone(),
                    orders: orders.clone(),
                },
                input_hash: hash,
            })
        }
        SelectionSource::Saved { store, name } => {
            let record = store.load_backtest(name)?;
            let context = BacktestContext::new(record.bars, record.orders, settings)?;
            info!(name = %name, bars = context.bars().len(), "loaded saved backtest");
            Ok(LoadedBacktest {
                context,
                strategy: record.strategy,
                provenance: Provenance::Saved {
                    name: record.name,
                    saved: record.saved,
                },
                input_hash: record.input_hash,
            })
        }
    }
}

fn read_strategy(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Strategy {
        path: path.to_path_buf(),
        source,
    })
}

/// Generation of a selection. Later selections have larger tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SelectionToken(u64);

impl SelectionToken {
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// Hands out selection tokens and decides which completions may apply.
///
/// Shared between the thread that starts selections and the threads that
/// complete them.
#[derive(Debug, Default)]
pub struct SelectionTracker {
    current: AtomicU64,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new selection; every earlier token becomes stale.
    pub fn begin(&self) -> SelectionToken {
        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "selection started");
        SelectionToken(generation)
    }

    pub fn is_current(&self, token: SelectionToken) -> bool {
        self.current.load(Ordering::SeqCst) == token.0
    }

    /// Pass `value` through only if `token` is still the latest selection.
    pub fn accept<T>(&self, token: SelectionToken, value: T) -> Option<T> {
        if self.is_current(token) {
            Some(value)
        } else {
            warn!(
                stale = token.0,
                current = self.current.load(Ordering::SeqCst),
                "discarding stale selection result"
            );
            None
        }
    }
}
