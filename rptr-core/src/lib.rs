//! Replayer Core: alignment and metrics engine for backtest review.
//!
//! Turns a bar series and an order-event stream into everything a chart
//! needs:
//! - Canonical integer timestamps and the timestamp → bar index
//! - Forward-filled equity and drawdown overlays aligned to the bars
//! - Summary metrics (CAGR, max drawdown, holding period)
//! - Full and lite trade markers with width-based level of detail
//! - Display formatting for the trade table

pub mod align;
pub mod domain;
pub mod error;
pub mod format;
pub mod lod;
pub mod markers;
pub mod metrics;
pub mod overlays;
pub mod time_index;
pub mod trade_table;

pub use error::CoreError;
pub use overlays::{build_overlays, scroll_window, BacktestContext, Overlays, ViewSettings};
