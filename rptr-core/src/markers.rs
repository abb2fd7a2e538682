//! Trade markers: one full (annotated) and one lite (bare) marker per order event.
//!
//! Buys sit below the bar with an up arrow; every other order type sits above
//! the bar with a down arrow.

use serde::{Deserialize, Serialize};

use crate::domain::{OrderEvent, Timestamp};
use crate::format::format_significant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerSide {
    AboveBar,
    BelowBar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerShape {
    ArrowUp,
    ArrowDown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub time: Timestamp,
    #[serde(rename = "position")]
    pub side: MarkerSide,
    pub color: String,
    pub shape: MarkerShape,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text: Option<String>,
}

/// Marker colours, as CSS hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerStyle {
    pub buy_color: String,
    pub sell_color: String,
    /// Decimal places for the price in the annotation.
    pub price_digits: usize,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            buy_color: "#0345a1".into(),
            sell_color: "#870a01".into(),
            price_digits: 2,
        }
    }
}

/// Full and lite marker sets, index-aligned with the events they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerSets {
    pub full: Vec<Marker>,
    pub lite: Vec<Marker>,
}

pub fn build_markers(events: &[OrderEvent], style: &MarkerStyle) -> MarkerSets {
    let full: Vec<Marker> = events
        .iter()
        .map(|e| {
            let mut marker = lite_marker(e, style);
            marker.text = Some(annotation(e, style.price_digits));
            marker
        })
        .collect();
    let lite = events.iter().map(|e| lite_marker(e, style)).collect();
    MarkerSets { full, lite }
}

fn lite_marker(event: &OrderEvent, style: &MarkerStyle) -> Marker {
    if event.order_type.is_buy() {
        Marker {
            time: event.time,
            side: MarkerSide::BelowBar,
            color: style.buy_color.clone(),
            shape: MarkerShape::ArrowUp,
            text: None,
        }
    } else {
        Marker {
            time: event.time,
            side: MarkerSide::AboveBar,
            color: style.sell_color.clone(),
            shape: MarkerShape::ArrowDown,
            text: None,
        }
    }
}

/// `Buy @ 101.25 Qty: 3`. The quantity is shown as it came in.
fn annotation(event: &OrderEvent, price_digits: usize) -> String {
    let price = event
        .price
        .value()
        .map(|p| format_significant(p, price_digits))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} @ {} Qty: {}",
        event.order_type.action_label(),
        price,
        event.quantity.raw().trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Numeric, OrderType};

    fn events() -> Vec<OrderEvent> {
        vec![
            OrderEvent::fill(Timestamp(60), OrderType::Buy, 101.25, 3.0),
            OrderEvent::fill(Timestamp(120), OrderType::Sell, 99.0, 3.0),
            OrderEvent::fill(Timestamp(180), OrderType::Other("Reversal".into()), 0.5, 1.5),
        ]
    }

    #[test]
    fn buy_is_below_with_up_arrow() {
        let sets = build_markers(&events(), &MarkerStyle::default());
        let m = &sets.full[0];
        assert_eq!(m.shape, MarkerShape::ArrowUp);
        assert_eq!(m.side, MarkerSide::BelowBar);
        assert_eq!(m.color, "#0345a1");
    }

    #[test]
    fn sell_and_other_are_above_with_down_arrow() {
        let sets = build_markers(&events(), &MarkerStyle::default());
        for m in &sets.full[1..] {
            assert_eq!(m.shape, MarkerShape::ArrowDown);
            assert_eq!(m.side, MarkerSide::AboveBar);
            assert_eq!(m.color, "#870a01");
        }
    }

    #[test]
    fn full_markers_are_annotated() {
        let sets = build_markers(&events(), &MarkerStyle::default());
        assert_eq!(sets.full[0].text.as_deref(), Some("Buy @ 101.25 Qty: 3"));
        assert_eq!(sets.full[1].text.as_deref(), Some("Sell @ 99 Qty: 3"));
        assert_eq!(sets.full[2].text.as_deref(), Some("Sell @ 0.50 Qty: 1.5"));
    }

    #[test]
    fn lite_markers_match_full_without_text() {
        let sets = build_markers(&events(), &MarkerStyle::default());
        assert_eq!(sets.full.len(), sets.lite.len());
        for (full, lite) in sets.full.iter().zip(&sets.lite) {
            assert!(lite.text.is_none());
            assert_eq!(full.time, lite.time);
            assert_eq!(full.side, lite.side);
            assert_eq!(full.shape, lite.shape);
            assert_eq!(full.color, lite.color);
        }
    }

    #[test]
    fn malformed_price_renders_dash() {
        let mut e = OrderEvent::fill(Timestamp(0), OrderType::Buy, 1.0, 2.0);
        e.price = Numeric::Malformed("?".into());
        let sets = build_markers(&[e], &MarkerStyle::default());
        assert_eq!(sets.full[0].text.as_deref(), Some("Buy @ - Qty: 2"));
    }

    #[test]
    fn quantity_is_shown_as_written() {
        let mut e = OrderEvent::fill(Timestamp(0), OrderType::Buy, 1.0, 0.001);
        e.quantity = Numeric::parse("0.0010");
        let sets = build_markers(&[e], &MarkerStyle::default());
        assert_eq!(sets.full[0].text.as_deref(), Some("Buy @ 1 Qty: 0.0010"));
    }

    #[test]
    fn custom_colors_apply() {
        let style = MarkerStyle {
            buy_color: "green".into(),
            sell_color: "red".into(),
            price_digits: 2,
        };
        let sets = build_markers(&events(), &style);
        assert_eq!(sets.lite[0].color, "green");
        assert_eq!(sets.lite[1].color, "red");
    }

    #[test]
    fn lite_marker_serializes_without_text() {
        let sets = build_markers(&events()[..1], &MarkerStyle::default());
        let json = serde_json::to_value(&sets.lite[0]).unwrap();
        assert_eq!(json["position"], "belowBar");
        assert_eq!(json["shape"], "arrowUp");
        assert!(json.get("text").is_none());
    }

    #[test]
    fn empty_events_empty_sets() {
        let sets = build_markers(&[], &MarkerStyle::default());
        assert!(sets.full.is_empty() && sets.lite.is_empty());
    }
}
