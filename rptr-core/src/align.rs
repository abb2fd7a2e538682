//! Forward-fill join of a sparse event series onto the dense bar timeline.
//!
//! Zero-order hold: every bar gets the value of the last event that landed
//! exactly on a bar timestamp at or before it, or `0.0` before the first one.
//! Event timestamps that match no bar never influence the output.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, OrderEvent, Timestamp};

/// One point of a sparse, event-keyed series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SparsePoint {
    pub time: Timestamp,
    pub value: f64,
}

/// One point of a dense series aligned to the bars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignedPoint {
    pub time: Timestamp,
    pub value: f64,
}

/// Dense series with exactly one point per bar, in bar order.
pub type AlignedSeries = Vec<AlignedPoint>;

/// Align `events` onto `bars`.
///
/// When several events share a timestamp the last one wins.
pub fn align(bars: &[Bar], events: &[SparsePoint]) -> AlignedSeries {
    let by_time: HashMap<Timestamp, f64> = events.iter().map(|p| (p.time, p.value)).collect();

    let mut last = 0.0;
    bars.iter()
        .map(|bar| {
            if let Some(&v) = by_time.get(&bar.time) {
                last = v;
            }
            AlignedPoint {
                time: bar.time,
                value: last,
            }
        })
        .collect()
}

/// `{time, balance}` points for the equity overlay. Malformed balances are skipped.
pub fn balance_points(events: &[OrderEvent]) -> Vec<SparsePoint> {
    events
        .iter()
        .filter_map(|e| {
            e.balance.value().map(|value| SparsePoint {
                time: e.time,
                value,
            })
        })
        .collect()
}

/// `{time, drawdown}` points for the drawdown overlay. Malformed drawdowns are skipped.
pub fn drawdown_points(events: &[OrderEvent]) -> Vec<SparsePoint> {
    events
        .iter()
        .filter_map(|e| {
            e.drawdown.value().map(|value| SparsePoint {
                time: e.time,
                value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Numeric, OrderType};

    fn bars(times: &[i64]) -> Vec<Bar> {
        times
            .iter()
            .map(|&t| Bar {
                time: Timestamp(t),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
            })
            .collect()
    }

    fn point(t: i64, value: f64) -> SparsePoint {
        SparsePoint {
            time: Timestamp(t),
            value,
        }
    }

    fn values(series: &AlignedSeries) -> Vec<f64> {
        series.iter().map(|p| p.value).collect()
    }

    #[test]
    fn carries_last_value_forward() {
        let series = align(
            &bars(&[0, 60, 120, 180]),
            &[point(60, 1000.0), point(180, 1200.0)],
        );
        assert_eq!(values(&series), vec![0.0, 1000.0, 1000.0, 1200.0]);
        assert_eq!(series[2].time, Timestamp(120));
    }

    #[test]
    fn no_events_yields_zeros() {
        let series = align(&bars(&[0, 60, 120]), &[]);
        assert_eq!(values(&series), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn off_grid_events_are_dropped() {
        let series = align(&bars(&[0, 60, 120]), &[point(30, 5.0), point(120, 7.0)]);
        assert_eq!(values(&series), vec![0.0, 0.0, 7.0]);
    }

    #[test]
    fn events_after_last_bar_are_ignored() {
        let series = align(&bars(&[0, 60]), &[point(0, 1.0), point(600, 9.0)]);
        assert_eq!(values(&series), vec![1.0, 1.0]);
    }

    #[test]
    fn same_timestamp_last_event_wins() {
        let series = align(&bars(&[0, 60]), &[point(60, 1.0), point(60, 2.0)]);
        assert_eq!(values(&series), vec![0.0, 2.0]);
    }

    #[test]
    fn empty_bars_yield_empty_series() {
        assert!(align(&[], &[point(0, 1.0)]).is_empty());
    }

    #[test]
    fn malformed_snapshots_are_skipped() {
        let mut bad = OrderEvent::fill(Timestamp(60), OrderType::Sell, 10.0, 1.0)
            .with_snapshot(1100.0, 2.0);
        bad.balance = Numeric::Malformed("-".into());
        let events = vec![
            OrderEvent::fill(Timestamp(0), OrderType::Buy, 10.0, 1.0).with_snapshot(1000.0, 0.0),
            bad,
        ];

        let equity = align(&bars(&[0, 60]), &balance_points(&events));
        assert_eq!(values(&equity), vec![1000.0, 1000.0]);

        let drawdown = align(&bars(&[0, 60]), &drawdown_points(&events));
        assert_eq!(values(&drawdown), vec![0.0, 2.0]);
    }
}
