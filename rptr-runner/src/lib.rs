//! Replayer Runner: everything around the alignment engine.
//!
//! This crate builds on `rptr-core` to provide:
//! - CSV ingest of bar and order files with canonical timestamps
//! - Concurrent loading of both streams with an explicit join
//! - Selection-generation tokens that drop stale completions
//! - The saved-backtest store and library index
//! - TOML viewer configuration
//! - Exports and deterministic sample data

pub mod config;
pub mod export;
pub mod ingest;
pub mod loader;
pub mod sample;
pub mod store;

pub use config::{ConfigError, ViewerConfig};
pub use ingest::{load_bars_csv, load_orders_csv, IngestError};
pub use loader::{
    load_inputs, LoadError, LoadedBacktest, Provenance, SelectionSource, SelectionToken,
    SelectionTracker,
};
pub use store::{BacktestRecord, BacktestStore, Library, LibraryEntry, StoreError};
