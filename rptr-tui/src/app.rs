//! Application state: single-owner, main-thread only.
//!
//! All viewer state lives here. Loads and saves run on the worker thread and
//! come back through `apply_response`; only the latest selection is applied.

use std::ops::Range;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

use rptr_core::lod::{visible_width, MarkerDetail};
use rptr_core::{scroll_window, BacktestContext};
use rptr_runner::{
    BacktestStore, LibraryEntry, LoadedBacktest, SelectionSource, SelectionToken,
    SelectionTracker, ViewerConfig,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::persistence::LastSelection;
use crate::worker::{WorkerCommand, WorkerResponse};

/// Narrowest zoom, in bars.
pub const MIN_VISIBLE_BARS: f64 = 10.0;

/// Which pane receives navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Chart,
    Trades,
}

impl Focus {
    pub fn toggle(self) -> Focus {
        match self {
            Focus::Chart => Focus::Trades,
            Focus::Trades => Focus::Chart,
        }
    }
}

/// Series drawn under the candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverlaySeries {
    #[default]
    Equity,
    Drawdown,
}

impl OverlaySeries {
    pub fn toggle(self) -> OverlaySeries {
        match self {
            OverlaySeries::Equity => OverlaySeries::Drawdown,
            OverlaySeries::Drawdown => OverlaySeries::Equity,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OverlaySeries::Equity => "Equity",
            OverlaySeries::Drawdown => "Drawdown %",
        }
    }
}

/// Which overlay (if any) is shown on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    None,
    Help,
    Library,
    Strategy,
    SaveAs(String),
    /// Delete the named saved backtest once confirmed.
    ConfirmDelete(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// Visible logical range of the chart, in bar positions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub from: f64,
    pub to: f64,
}

impl Viewport {
    pub fn full(bar_count: usize) -> Self {
        Self {
            from: 0.0,
            to: bar_count as f64,
        }
    }

    pub fn width(&self) -> usize {
        visible_width(self.from, self.to)
    }

    pub fn pan(&mut self, delta: f64, bar_count: usize) {
        self.from += delta;
        self.to += delta;
        self.clamp(bar_count);
    }

    /// Scale the span around its centre. `factor < 1` zooms in.
    pub fn zoom(&mut self, factor: f64, bar_count: usize) {
        let n = bar_count as f64;
        let span = ((self.to - self.from) * factor).clamp(MIN_VISIBLE_BARS.min(n), n);
        let centre = (self.from + self.to) / 2.0;
        self.from = centre - span / 2.0;
        self.to = self.from + span;
        self.clamp(bar_count);
    }

    pub fn show(&mut self, range: Range<usize>) {
        self.from = range.start as f64;
        self.to = range.end as f64;
    }

    /// Bar indices at least partly inside the viewport.
    pub fn bar_range(&self, bar_count: usize) -> Range<usize> {
        let start = (self.from.max(0.0).floor() as usize).min(bar_count);
        let end = (self.to.max(0.0).ceil() as usize).min(bar_count);
        start..end.max(start)
    }

    fn clamp(&mut self, bar_count: usize) {
        let n = bar_count as f64;
        let span = (self.to - self.from).clamp(0.0, n);
        self.from = self.from.clamp(0.0, n - span);
        self.to = self.from + span;
    }
}

pub struct ChartState {
    pub viewport: Viewport,
    pub series: OverlaySeries,
    /// Marker detail for the current viewport.
    pub detail: MarkerDetail,
    /// Bar under the keyboard crosshair.
    pub cursor: Option<usize>,
}

#[derive(Default)]
pub struct LibraryState {
    pub entries: Vec<(String, LibraryEntry)>,
    pub cursor: usize,
}

impl LibraryState {
    pub fn selected_name(&self) -> Option<&str> {
        self.entries.get(self.cursor).map(|(name, _)| name.as_str())
    }
}

pub struct AppState {
    pub running: bool,
    pub focus: Focus,
    pub overlay: Overlay,

    pub config: ViewerConfig,
    pub store: Option<BacktestStore>,

    // Selection
    pub tracker: Arc<SelectionTracker>,
    pub pending: Option<(SelectionToken, String)>,
    pub loaded: Option<LoadedBacktest>,
    pub last_selection: Option<LastSelection>,

    // Panes
    pub chart: ChartState,
    pub selected_trade: usize,
    pub library: LibraryState,
    pub strategy_scroll: u16,

    pub status_message: Option<(String, StatusLevel)>,

    // Worker communication
    pub worker_tx: Sender<WorkerCommand>,
    pub worker_rx: Receiver<WorkerResponse>,
}

impl AppState {
    pub fn new(
        config: ViewerConfig,
        store: Option<BacktestStore>,
        tracker: Arc<SelectionTracker>,
        worker_tx: Sender<WorkerCommand>,
        worker_rx: Receiver<WorkerResponse>,
    ) -> Self {
        Self {
            running: true,
            focus: Focus::Chart,
            overlay: Overlay::None,
            config,
            store,
            tracker,
            pending: None,
            loaded: None,
            last_selection: None,
            chart: ChartState {
                viewport: Viewport::default(),
                series: OverlaySeries::Equity,
                detail: MarkerDetail::None,
                cursor: None,
            },
            selected_trade: 0,
            library: LibraryState::default(),
            strategy_scroll: 0,
            status_message: None,
            worker_tx,
            worker_rx,
        }
    }

    pub fn context(&self) -> Option<&BacktestContext> {
        self.loaded.as_ref().map(|l| &l.context)
    }

    pub fn bar_count(&self) -> usize {
        self.context().map_or(0, |ctx| ctx.bars().len())
    }

    // ── Selection ──

    /// Start loading a selection. Any load still in flight becomes stale.
    pub fn select(&mut self, selection: LastSelection) {
        let source = match &selection {
            LastSelection::Files {
                bars,
                orders,
                strategy,
            } => SelectionSource::Files {
                bars: bars.clone(),
                orders: orders.clone(),
                strategy: strategy.clone(),
            },
            LastSelection::Saved { name } => match &self.store {
                Some(store) => SelectionSource::Saved {
                    store: store.clone(),
                    name: name.clone(),
                },
                None => {
                    self.set_error("No backtest store available");
                    return;
                }
            },
        };

        let token = self.tracker.begin();
        let label = source.label();
        let cmd = WorkerCommand::Load {
            token,
            source,
            settings: self.config.view_settings(),
        };
        if self.worker_tx.send(cmd).is_err() {
            self.set_error("Worker is not running");
            return;
        }
        self.set_status(format!("Loading {label}..."));
        self.pending = Some((token, label));
        self.last_selection = Some(selection);
    }

    pub fn reload(&mut self) {
        if let Some(selection) = self.last_selection.clone() {
            self.select(selection);
        }
    }

    pub fn apply_response(&mut self, resp: WorkerResponse) {
        match resp {
            WorkerResponse::Loaded { token, backtest } => {
                if let Some(backtest) = self.tracker.accept(token, *backtest) {
                    self.apply_loaded(backtest);
                }
            }
            WorkerResponse::LoadFailed {
                token,
                label,
                error,
            } => {
                if self.tracker.is_current(token) {
                    self.pending = None;
                    self.set_error(format!("{label}: {error}"));
                }
            }
            WorkerResponse::Saved { name, entry } => {
                self.set_status(format!("Saved '{name}' ({})", entry.saved));
                self.refresh_library();
            }
            WorkerResponse::SaveFailed { name, error } => {
                self.set_error(format!("Save '{name}' failed: {error}"));
            }
        }
    }

    fn apply_loaded(&mut self, backtest: LoadedBacktest) {
        let bars = backtest.context.bars().len();
        let trades = backtest.context.trade_rows().len();
        let headline = match backtest.context.summary() {
            Ok(summary) => summary.headline(),
            Err(e) => e.to_string(),
        };
        self.pending = None;
        self.loaded = Some(backtest);
        self.chart.viewport = Viewport::full(bars);
        self.chart.cursor = None;
        self.selected_trade = 0;
        self.strategy_scroll = 0;
        self.update_detail();
        self.set_status(format!("{bars} bars, {trades} orders | {headline}"));
    }

    // ── Chart ──

    /// Re-evaluate marker detail after any viewport change.
    pub fn update_detail(&mut self) {
        let width = self.chart.viewport.width();
        let detail = self
            .context()
            .map_or(MarkerDetail::None, |ctx| ctx.marker_detail(width));
        if detail != self.chart.detail {
            info!(width, detail = ?detail, "marker detail changed");
            self.chart.detail = detail;
        }
    }

    /// Pan by a tenth of the visible span (at least one bar) per step.
    pub fn pan(&mut self, steps: f64) {
        let span = self.chart.viewport.to - self.chart.viewport.from;
        let step = (span / 10.0).max(1.0);
        let n = self.bar_count();
        self.chart.viewport.pan(steps * step, n);
        self.update_detail();
    }

    pub fn zoom(&mut self, factor: f64) {
        let n = self.bar_count();
        self.chart.viewport.zoom(factor, n);
        self.update_detail();
    }

    pub fn reset_view(&mut self) {
        self.chart.viewport = Viewport::full(self.bar_count());
        self.update_detail();
    }

    /// Step the crosshair within the visible bars. It starts from the
    /// rightmost visible bar.
    pub fn move_cursor(&mut self, delta: isize) {
        let range = self.chart.viewport.bar_range(self.bar_count());
        if range.is_empty() {
            return;
        }
        let last = range.end - 1;
        let next = match self.chart.cursor.filter(|bar| range.contains(bar)) {
            Some(bar) => bar.saturating_add_signed(delta).clamp(range.start, last),
            None => last,
        };
        self.chart.cursor = Some(next);
    }

    pub fn clear_cursor(&mut self) {
        self.chart.cursor = None;
    }

    /// Bar whose OHLC is shown: the crosshair when it is on screen, else the
    /// selected order's bar.
    pub fn readout_bar(&self) -> Option<usize> {
        let range = self.chart.viewport.bar_range(self.bar_count());
        self.chart
            .cursor
            .filter(|bar| range.contains(bar))
            .or_else(|| self.selected_trade_bar())
    }

    // ── Trades ──

    pub fn move_trade(&mut self, delta: isize) {
        let count = self.context().map_or(0, |ctx| ctx.trade_rows().len());
        if count == 0 {
            return;
        }
        let next = self.selected_trade.saturating_add_signed(delta);
        self.selected_trade = next.min(count - 1);
    }

    /// Scroll the chart so the selected order's bar is centred.
    pub fn jump_to_selected_trade(&mut self) {
        let Some(ctx) = self.context() else {
            return;
        };
        let Some(row) = ctx.trade_rows().get(self.selected_trade) else {
            return;
        };
        let time = row.time;
        let bar_count = ctx.bars().len();
        match ctx.lookup_bar_index(time) {
            Some(index) => {
                let width = self.chart.viewport.width().max(MIN_VISIBLE_BARS as usize);
                self.chart
                    .viewport
                    .show(scroll_window(index, width, bar_count));
                self.update_detail();
                self.set_status(format!("Order at {} (bar {index})", time.minute_string()));
            }
            None => {
                warn!(time = %time, "order has no matching bar");
                self.set_warning(format!("No bar at {}", time.minute_string()));
            }
        }
    }

    /// Bar index of the selected order, if it lands on a bar.
    pub fn selected_trade_bar(&self) -> Option<usize> {
        let ctx = self.context()?;
        let row = ctx.trade_rows().get(self.selected_trade)?;
        ctx.lookup_bar_index(row.time)
    }

    // ── Library ──

    pub fn open_library(&mut self) {
        self.refresh_library();
        self.overlay = Overlay::Library;
    }

    pub fn refresh_library(&mut self) {
        let Some(store) = &self.store else {
            return;
        };
        match store.list_library() {
            Ok(library) => {
                self.library.entries = library.into_iter().collect();
                let last = self.library.entries.len().saturating_sub(1);
                self.library.cursor = self.library.cursor.min(last);
            }
            Err(e) => self.set_error(format!("Library: {e}")),
        }
    }

    pub fn load_library_selection(&mut self) {
        if let Some(name) = self.library.selected_name().map(str::to_string) {
            self.overlay = Overlay::None;
            self.select(LastSelection::Saved { name });
        }
    }

    /// Ask before deleting the highlighted library entry.
    pub fn request_delete_selection(&mut self) {
        if let Some(name) = self.library.selected_name().map(str::to_string) {
            self.overlay = Overlay::ConfirmDelete(name);
        }
    }

    /// Delete a saved backtest and return to the library.
    pub fn delete_saved(&mut self, name: &str) {
        self.overlay = Overlay::Library;
        let Some(store) = &self.store else {
            return;
        };
        match store.delete_backtest(name) {
            Ok(true) => self.set_status(format!("Deleted '{name}'")),
            Ok(false) => self.set_warning(format!("'{name}' was already gone")),
            Err(e) => self.set_error(format!("Delete '{name}' failed: {e}")),
        }
        self.refresh_library();
    }

    /// Save the loaded backtest under `name` on the worker thread.
    pub fn save_as(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        let (Some(store), Some(loaded)) = (&self.store, &self.loaded) else {
            self.set_warning("Nothing to save");
            return;
        };
        let cmd = WorkerCommand::Save {
            store: store.clone(),
            name: name.to_string(),
            bars: loaded.context.bars().to_vec(),
            orders: loaded.context.events().to_vec(),
            strategy: loaded.strategy.clone(),
        };
        if self.worker_tx.send(cmd).is_err() {
            self.set_error("Worker is not running");
        } else {
            self.set_status(format!("Saving '{name}'..."));
        }
    }

    // ── Status ──

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Info));
    }

    pub fn set_warning(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Warning));
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        warn!(message = %msg, "viewer error");
        self.status_message = Some((msg, StatusLevel::Error));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rptr_core::ViewSettings;
    use rptr_runner::{sample, Provenance};
    use std::path::PathBuf;
    use std::sync::mpsc;

    pub(crate) fn test_app() -> (AppState, Receiver<WorkerCommand>, Sender<WorkerResponse>) {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let app = AppState::new(
            ViewerConfig::default(),
            None,
            Arc::new(SelectionTracker::new()),
            cmd_tx,
            resp_rx,
        );
        (app, cmd_rx, resp_tx)
    }

    pub(crate) fn loaded(bars: usize, seed: u64) -> LoadedBacktest {
        let s = sample::generate(bars, seed);
        LoadedBacktest {
            context: BacktestContext::new(s.bars, s.orders, &ViewSettings::default()).unwrap(),
            strategy: Some(s.strategy),
            provenance: Provenance::Files {
                bars: PathBuf::from("data.csv"),
                orders: PathBuf::from("orders.csv"),
            },
            input_hash: String::new(),
        }
    }

    fn files() -> LastSelection {
        LastSelection::Files {
            bars: "data.csv".into(),
            orders: "orders.csv".into(),
            strategy: None,
        }
    }

    #[test]
    fn viewport_pan_clamps_to_series() {
        let mut v = Viewport { from: 0.0, to: 100.0 };
        v.pan(-50.0, 1000);
        assert_eq!(v, Viewport { from: 0.0, to: 100.0 });
        v.pan(2000.0, 1000);
        assert_eq!(v, Viewport { from: 900.0, to: 1000.0 });
        assert_eq!(v.bar_range(1000), 900..1000);
    }

    #[test]
    fn viewport_zoom_keeps_bounds() {
        let mut v = Viewport::full(1000);
        v.zoom(0.5, 1000);
        assert_eq!(v, Viewport { from: 250.0, to: 750.0 });
        v.zoom(0.0, 1000);
        assert_eq!(v.to - v.from, MIN_VISIBLE_BARS);
        v.zoom(100.0, 1000);
        assert_eq!(v, Viewport::full(1000));
    }

    #[test]
    fn tiny_series_zoom_does_not_exceed_it() {
        let mut v = Viewport::full(4);
        v.zoom(0.1, 4);
        assert_eq!(v, Viewport::full(4));
    }

    #[test]
    fn selection_sends_load_and_applies_latest_only() {
        let (mut app, cmd_rx, _resp_tx) = test_app();
        app.select(files());
        app.select(files());
        let tokens: Vec<SelectionToken> = cmd_rx
            .try_iter()
            .filter_map(|cmd| match cmd {
                WorkerCommand::Load { token, .. } => Some(token),
                _ => None,
            })
            .collect();
        assert_eq!(tokens.len(), 2);

        app.apply_response(WorkerResponse::Loaded {
            token: tokens[0],
            backtest: Box::new(loaded(100, 1)),
        });
        assert!(app.loaded.is_none());

        app.apply_response(WorkerResponse::Loaded {
            token: tokens[1],
            backtest: Box::new(loaded(120, 2)),
        });
        assert_eq!(app.bar_count(), 120);
        assert!(app.pending.is_none());
        assert_eq!(app.chart.viewport, Viewport::full(120));
    }

    #[test]
    fn stale_failure_does_not_clear_pending() {
        let (mut app, cmd_rx, _resp_tx) = test_app();
        app.select(files());
        app.select(files());
        let first = match cmd_rx.try_recv().unwrap() {
            WorkerCommand::Load { token, .. } => token,
            other => panic!("unexpected {other:?}"),
        };
        app.apply_response(WorkerResponse::LoadFailed {
            token: first,
            label: "x".into(),
            error: "boom".into(),
        });
        assert!(app.pending.is_some());
        assert!(app.status_message.as_ref().is_some_and(|(_, l)| *l == StatusLevel::Info));
    }

    #[test]
    fn zooming_walks_through_detail_levels() {
        let (mut app, _cmd_rx, _resp_tx) = test_app();
        app.loaded = Some(loaded(1000, 3));
        app.reset_view();
        assert_eq!(app.chart.detail, MarkerDetail::None);

        app.zoom(0.5);
        assert_eq!(app.chart.viewport.width(), 500);
        assert_eq!(app.chart.detail, MarkerDetail::Lite);

        app.zoom(0.4);
        assert_eq!(app.chart.viewport.width(), 200);
        assert_eq!(app.chart.detail, MarkerDetail::Full);
    }

    #[test]
    fn jump_centres_selected_order() {
        let (mut app, _cmd_rx, _resp_tx) = test_app();
        app.loaded = Some(loaded(1000, 4));
        app.reset_view();
        app.zoom(0.1);
        let width = app.chart.viewport.width();

        app.move_trade(5);
        let target = app.selected_trade_bar().unwrap();
        app.jump_to_selected_trade();

        let range = app.chart.viewport.bar_range(1000);
        assert!(range.contains(&target));
        assert_eq!(range.len(), width);
    }

    #[test]
    fn cursor_stays_in_view_and_drives_readout() {
        let (mut app, _cmd_rx, _resp_tx) = test_app();
        app.move_cursor(1);
        assert_eq!(app.chart.cursor, None);

        app.loaded = Some(loaded(100, 8));
        app.reset_view();
        app.move_cursor(-1);
        assert_eq!(app.chart.cursor, Some(99));
        app.move_cursor(-5);
        assert_eq!(app.chart.cursor, Some(94));
        app.move_cursor(50);
        assert_eq!(app.chart.cursor, Some(99));
        assert_eq!(app.readout_bar(), Some(99));

        app.clear_cursor();
        assert_eq!(app.readout_bar(), app.selected_trade_bar());
    }

    #[test]
    fn trade_selection_is_clamped() {
        let (mut app, _cmd_rx, _resp_tx) = test_app();
        app.move_trade(3);
        assert_eq!(app.selected_trade, 0);

        app.loaded = Some(loaded(200, 5));
        let count = app.context().unwrap().trade_rows().len();
        app.move_trade(-4);
        assert_eq!(app.selected_trade, 0);
        app.move_trade(10_000);
        assert_eq!(app.selected_trade, count - 1);
    }

    #[test]
    fn saved_selection_without_store_is_error() {
        let (mut app, cmd_rx, _resp_tx) = test_app();
        app.select(LastSelection::Saved { name: "a".into() });
        assert!(cmd_rx.try_recv().is_err());
        assert!(matches!(app.status_message, Some((_, StatusLevel::Error))));
    }

    #[test]
    fn library_roundtrip_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _cmd_rx, _resp_tx) = test_app();
        let store = BacktestStore::open(dir.path()).unwrap();
        let s = sample::generate(60, 6);
        store.save_backtest("one", &s.bars, &s.orders, None).unwrap();
        app.store = Some(store);

        app.open_library();
        assert_eq!(app.overlay, Overlay::Library);
        assert_eq!(app.library.selected_name(), Some("one"));

        app.request_delete_selection();
        assert_eq!(app.overlay, Overlay::ConfirmDelete("one".into()));
        assert_eq!(app.library.entries.len(), 1);

        app.delete_saved("one");
        assert_eq!(app.overlay, Overlay::Library);
        assert!(app.library.entries.is_empty());
        assert_eq!(app.library.selected_name(), None);
    }
}
