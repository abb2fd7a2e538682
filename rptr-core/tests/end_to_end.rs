//! End-to-end scenarios over the public core API.
//!
//! Tests:
//! 1. Four-bar scenario: overlays, summary and markers agree
//! 2. Degenerate single-event stream: CAGR undefined, charts still built
//! 3. Worked metric examples (CAGR 50%, max drawdown 12%)
//! 4. Jump-to-order through the context
//! 5. Malformed fields degrade to placeholders, not failures

use rptr_core::domain::{Bar, Numeric, OrderEvent, OrderType, Timestamp};
use rptr_core::lod::MarkerDetail;
use rptr_core::metrics::{cagr_pct, max_drawdown_pct, summarize};
use rptr_core::{scroll_window, BacktestContext, CoreError, ViewSettings};

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn bars(times: &[i64]) -> Vec<Bar> {
    times
        .iter()
        .enumerate()
        .map(|(i, &t)| {
            let close = 100.0 + i as f64;
            Bar {
                time: Timestamp(t),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
            }
        })
        .collect()
}

const DAY: i64 = 86_400;

/// Order events at `t = 60` and `t = 180`, in units of `unit` seconds.
fn scenario_events(unit: i64) -> Vec<OrderEvent> {
    vec![
        OrderEvent::fill(Timestamp(60 * unit), OrderType::Buy, 101.0, 10.0)
            .with_snapshot(1000.0, 0.0)
            .with_id("Long"),
        OrderEvent::fill(Timestamp(180 * unit), OrderType::Sell, 103.0, 10.0)
            .with_snapshot(1200.0, 5.0)
            .with_id("Exit"),
    ]
}

fn scenario_bars(unit: i64) -> Vec<Bar> {
    bars(&[0, 60 * unit, 120 * unit, 180 * unit])
}

fn values(series: &[rptr_core::align::AlignedPoint]) -> Vec<f64> {
    series.iter().map(|p| p.value).collect()
}

// ──────────────────────────────────────────────
// Scenarios
// ──────────────────────────────────────────────

#[test]
fn four_bar_scenario() {
    let ctx =
        BacktestContext::new(scenario_bars(DAY), scenario_events(DAY), &ViewSettings::default())
            .unwrap();

    let overlays = ctx.overlays();
    assert_eq!(values(&overlays.equity), vec![0.0, 1000.0, 1000.0, 1200.0]);
    assert_eq!(values(&overlays.drawdown), vec![0.0, 0.0, 0.0, 5.0]);

    let summary = ctx.summary().unwrap();
    assert_eq!(summary.capital, 1000);
    assert_eq!(summary.nav, 1200);
    assert_eq!(summary.max_dd_pct, 5.0);
    assert_eq!(summary.period_days, 120);
    assert_eq!(summary.start_date, Timestamp(60 * DAY));
    assert_eq!(summary.end_date, Timestamp(180 * DAY));

    assert_eq!(ctx.marker_detail(4), MarkerDetail::Full);
    let markers = ctx.visible_markers(4);
    assert_eq!(markers.len(), 2);
    assert_eq!(markers[0].text.as_deref(), Some("Buy @ 101 Qty: 10"));
    assert_eq!(markers[1].text.as_deref(), Some("Sell @ 103 Qty: 10"));
}

#[test]
fn scenario_in_seconds_has_same_overlays_but_no_summary() {
    // 60 → 180 seconds truncates to a zero-day holding period
    let ctx = BacktestContext::new(scenario_bars(1), scenario_events(1), &ViewSettings::default())
        .unwrap();
    assert_eq!(
        values(&ctx.overlays().equity),
        vec![0.0, 1000.0, 1000.0, 1200.0]
    );
    assert_eq!(values(&ctx.overlays().drawdown), vec![0.0, 0.0, 0.0, 5.0]);
    assert!(matches!(
        ctx.summary(),
        Err(CoreError::UndefinedMetric { metric: "cagr", .. })
    ));
}

#[test]
fn single_event_stream_is_undefined_not_nan() {
    let events = vec![OrderEvent::fill(Timestamp(60), OrderType::Buy, 1.0, 1.0)
        .with_snapshot(1000.0, 0.0)];
    let err = summarize(&events).unwrap_err();
    assert!(matches!(err, CoreError::UndefinedMetric { metric: "cagr", .. }));

    // The chart still gets its overlays
    let ctx = BacktestContext::new(bars(&[0, 60]), events, &ViewSettings::default()).unwrap();
    assert!(ctx.summary().is_err());
    assert_eq!(values(&ctx.overlays().equity), vec![0.0, 1000.0]);
}

#[test]
fn worked_metric_examples() {
    assert_eq!(cagr_pct(100_000, 150_000, 365).unwrap(), 50.0);

    let events: Vec<OrderEvent> = [0.0, 5.0, 12.0, 3.0]
        .iter()
        .enumerate()
        .map(|(i, &dd)| {
            OrderEvent::fill(Timestamp(i as i64 * 60), OrderType::Buy, 1.0, 1.0)
                .with_snapshot(1000.0, dd)
        })
        .collect();
    assert_eq!(max_drawdown_pct(&events), 12.0);
}

#[test]
fn summary_over_a_year() {
    let day = DAY;
    let events = vec![
        OrderEvent::fill(Timestamp(0), OrderType::Buy, 1.0, 1.0).with_snapshot(100_000.0, 0.0),
        OrderEvent::fill(Timestamp(200 * day), OrderType::Sell, 1.0, 1.0)
            .with_snapshot(90_000.0, 10.0),
        OrderEvent::fill(Timestamp(365 * day), OrderType::Sell, 1.0, 1.0)
            .with_snapshot(150_000.0, 0.0),
    ];
    let summary = summarize(&events).unwrap();
    assert_eq!(summary.period_days, 365);
    assert_eq!(summary.cagr_pct, 50.0);
    assert_eq!(summary.max_dd_pct, 10.0);
    assert_eq!(
        summary.headline(),
        "CAGR: 50% \u{2022} MaxDD: 10% \u{2022} 365 days \u{2022} 1970-01-01 - 1971-01-01"
    );
}

#[test]
fn jump_to_order_scrolls_to_its_bar() {
    let times: Vec<i64> = (0..1_000).map(|i| i * 60).collect();
    let events = vec![OrderEvent::fill(Timestamp(600 * 60), OrderType::Buy, 1.0, 1.0)
        .with_snapshot(1000.0, 0.0)];
    let ctx = BacktestContext::new(bars(&times), events, &ViewSettings::default()).unwrap();

    let row = &ctx.trade_rows()[0];
    let idx = ctx.lookup_bar_index(row.time).unwrap();
    assert_eq!(idx, 600);
    assert_eq!(scroll_window(idx, 100, ctx.bars().len()), 550..650);

    assert_eq!(ctx.lookup_bar_index(Timestamp(30)), None);
}

#[test]
fn malformed_fields_degrade_to_placeholders() {
    let mut event = OrderEvent::fill(Timestamp(60), OrderType::Buy, 1.0, 1.0)
        .with_snapshot(1000.0, 0.0);
    event.pnl = Numeric::parse("-");
    event.price = Numeric::parse("n/a");

    let ctx = BacktestContext::new(bars(&[0, 60]), vec![event], &ViewSettings::default()).unwrap();
    let row = &ctx.trade_rows()[0];
    assert_eq!(row.pnl.text, "-");
    assert_eq!(row.price.text, "-");
    assert_eq!(row.price.raw, "n/a");
    assert_eq!(
        ctx.visible_markers(2)[0].text.as_deref(),
        Some("Buy @ - Qty: 1")
    );
}

#[test]
fn unsorted_bars_fail_the_whole_load() {
    let err = BacktestContext::new(bars(&[0, 120, 60]), scenario_events(1), &ViewSettings::default())
        .unwrap_err();
    assert_eq!(
        err,
        CoreError::PreconditionViolation {
            index: 2,
            previous: Timestamp(120),
            current: Timestamp(60),
        }
    );
}
