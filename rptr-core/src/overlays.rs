//! Per-load overlay construction and the immutable context handed to renderers.
//!
//! One `BacktestContext` is built per backtest selection and replaced
//! wholesale on the next one; nothing here is mutated after construction.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::align::{align, balance_points, drawdown_points, AlignedSeries};
use crate::domain::{check_ascending, Bar, OrderEvent, Timestamp};
use crate::error::CoreError;
use crate::lod::{select_visible_markers, LodPolicy, MarkerDetail};
use crate::markers::{build_markers, Marker, MarkerSets, MarkerStyle};
use crate::metrics::{summarize, BacktestSummary};
use crate::time_index::TimeIndex;
use crate::trade_table::{build_rows, TradeRow};

/// Everything derived from one (bars, events) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlays {
    pub equity: AlignedSeries,
    pub drawdown: AlignedSeries,
    /// Metrics failures are kept here so the chart can still be drawn.
    pub summary: Result<BacktestSummary, CoreError>,
    pub markers: MarkerSets,
}

/// Build both aligned overlays, the summary and the two marker sets.
///
/// Fails only when the bar timeline is not strictly ascending.
pub fn build_overlays(
    bars: &[Bar],
    events: &[OrderEvent],
    style: &MarkerStyle,
) -> Result<Overlays, CoreError> {
    check_ascending(bars)?;
    Ok(Overlays {
        equity: align(bars, &balance_points(events)),
        drawdown: align(bars, &drawdown_points(events)),
        summary: summarize(events),
        markers: build_markers(events, style),
    })
}

/// Display settings that shape the derived data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSettings {
    pub markers: MarkerStyle,
    pub lod: LodPolicy,
    pub sig_digits: usize,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            markers: MarkerStyle::default(),
            lod: LodPolicy::default(),
            sig_digits: 2,
        }
    }
}

/// Immutable per-selection state: inputs, index and everything derived.
#[derive(Debug, Clone)]
pub struct BacktestContext {
    bars: Vec<Bar>,
    events: Vec<OrderEvent>,
    index: TimeIndex,
    overlays: Overlays,
    rows: Vec<TradeRow>,
    lod: LodPolicy,
}

impl BacktestContext {
    pub fn new(
        bars: Vec<Bar>,
        events: Vec<OrderEvent>,
        settings: &ViewSettings,
    ) -> Result<Self, CoreError> {
        let index = TimeIndex::build(&bars)?;
        let overlays = build_overlays(&bars, &events, &settings.markers)?;
        let rows = build_rows(&events, settings.sig_digits);
        Ok(Self {
            bars,
            events,
            index,
            overlays,
            rows,
            lod: settings.lod,
        })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn events(&self) -> &[OrderEvent] {
        &self.events
    }

    pub fn overlays(&self) -> &Overlays {
        &self.overlays
    }

    pub fn summary(&self) -> Result<&BacktestSummary, &CoreError> {
        self.overlays.summary.as_ref()
    }

    pub fn trade_rows(&self) -> &[TradeRow] {
        &self.rows
    }

    pub fn lod(&self) -> LodPolicy {
        self.lod
    }

    /// Bar position for an exact timestamp.
    pub fn lookup_bar_index(&self, time: Timestamp) -> Option<usize> {
        self.index.lookup(time)
    }

    pub fn marker_detail(&self, visible_width: usize) -> MarkerDetail {
        self.lod.select(visible_width)
    }

    pub fn visible_markers(&self, visible_width: usize) -> &[Marker] {
        select_visible_markers(
            visible_width,
            &self.overlays.markers.full,
            &self.overlays.markers.lite,
            &self.lod,
        )
    }
}

/// Window of `visible_width` bar positions centred on `bar_index`, clamped
/// to `0..bar_count`.
pub fn scroll_window(bar_index: usize, visible_width: usize, bar_count: usize) -> Range<usize> {
    let width = visible_width.min(bar_count);
    let start = bar_index.saturating_sub(width / 2);
    let end = (start + width).min(bar_count);
    end.saturating_sub(width)..end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderType;

    fn bars(times: &[i64]) -> Vec<Bar> {
        times
            .iter()
            .map(|&t| Bar {
                time: Timestamp(t),
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.5,
            })
            .collect()
    }

    fn events() -> Vec<OrderEvent> {
        vec![
            OrderEvent::fill(Timestamp(60), OrderType::Buy, 10.0, 1.0).with_snapshot(1000.0, 0.0),
            OrderEvent::fill(Timestamp(180), OrderType::Sell, 11.0, 1.0)
                .with_snapshot(1200.0, 5.0),
        ]
    }

    #[test]
    fn overlays_match_bar_cardinality() {
        let overlays = build_overlays(&bars(&[0, 60, 120, 180]), &events(), &MarkerStyle::default())
            .unwrap();
        assert_eq!(overlays.equity.len(), 4);
        assert_eq!(overlays.drawdown.len(), 4);
        assert_eq!(overlays.markers.full.len(), 2);
    }

    #[test]
    fn unsorted_bars_are_rejected() {
        let err = build_overlays(&bars(&[60, 0]), &events(), &MarkerStyle::default()).unwrap_err();
        assert!(matches!(err, CoreError::PreconditionViolation { .. }));
    }

    #[test]
    fn summary_failure_does_not_block_overlays() {
        let overlays = build_overlays(&bars(&[0, 60]), &[], &MarkerStyle::default()).unwrap();
        assert_eq!(overlays.summary, Err(CoreError::EmptyEventStream));
        assert_eq!(overlays.equity.len(), 2);
    }

    #[test]
    fn context_lookup_and_lod() {
        let ctx = BacktestContext::new(
            bars(&[0, 60, 120, 180]),
            events(),
            &ViewSettings::default(),
        )
        .unwrap();
        assert_eq!(ctx.lookup_bar_index(Timestamp(180)), Some(3));
        assert_eq!(ctx.lookup_bar_index(Timestamp(90)), None);
        assert_eq!(ctx.visible_markers(150).len(), 2);
        assert!(ctx.visible_markers(150)[0].text.is_some());
        assert!(ctx.visible_markers(300)[0].text.is_none());
        assert!(ctx.visible_markers(900).is_empty());
        assert_eq!(ctx.trade_rows().len(), 2);
    }

    #[test]
    fn scroll_window_centres_and_clamps() {
        assert_eq!(scroll_window(50, 20, 100), 40..60);
        assert_eq!(scroll_window(3, 20, 100), 0..20);
        assert_eq!(scroll_window(98, 20, 100), 80..100);
        assert_eq!(scroll_window(2, 20, 5), 0..5);
        assert_eq!(scroll_window(0, 0, 0), 0..0);
    }
}
