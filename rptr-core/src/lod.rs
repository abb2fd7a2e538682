//! Level of detail for trade markers.
//!
//! The wider the visible window, the less marker detail is drawn:
//! `width > 500` → none, `200 < width <= 500` → lite, `width <= 200` → full.
//! Selection is O(1) and side-effect free; call it on every viewport change.

use serde::{Deserialize, Serialize};

use crate::markers::Marker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarkerDetail {
    None,
    Lite,
    Full,
}

/// Width thresholds, in bar positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodPolicy {
    /// Widths above this get lite markers.
    pub lite_above: usize,
    /// Widths above this get no markers.
    pub hide_above: usize,
}

impl Default for LodPolicy {
    fn default() -> Self {
        Self {
            lite_above: 200,
            hide_above: 500,
        }
    }
}

impl LodPolicy {
    pub fn select(&self, visible_width: usize) -> MarkerDetail {
        if visible_width > self.hide_above {
            MarkerDetail::None
        } else if visible_width > self.lite_above {
            MarkerDetail::Lite
        } else {
            MarkerDetail::Full
        }
    }
}

/// Select with the default thresholds.
pub fn select_detail(visible_width: usize) -> MarkerDetail {
    LodPolicy::default().select(visible_width)
}

/// Integer width of a fractional logical range: `trunc(to) - trunc(from)`,
/// never negative.
pub fn visible_width(from: f64, to: f64) -> usize {
    let width = to.trunc() - from.trunc();
    if width.is_finite() && width > 0.0 {
        width as usize
    } else {
        0
    }
}

/// The marker set the renderer should show at this width.
pub fn select_visible_markers<'a>(
    visible_width: usize,
    full: &'a [Marker],
    lite: &'a [Marker],
    policy: &LodPolicy,
) -> &'a [Marker] {
    match policy.select(visible_width) {
        MarkerDetail::None => &[],
        MarkerDetail::Lite => lite,
        MarkerDetail::Full => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Timestamp;
    use crate::markers::{MarkerShape, MarkerSide};

    #[test]
    fn boundaries_are_exact() {
        assert_eq!(select_detail(500), MarkerDetail::Lite);
        assert_eq!(select_detail(501), MarkerDetail::None);
        assert_eq!(select_detail(200), MarkerDetail::Full);
        assert_eq!(select_detail(201), MarkerDetail::Lite);
    }

    #[test]
    fn extremes() {
        assert_eq!(select_detail(0), MarkerDetail::Full);
        assert_eq!(select_detail(usize::MAX), MarkerDetail::None);
    }

    #[test]
    fn custom_policy() {
        let policy = LodPolicy {
            lite_above: 10,
            hide_above: 20,
        };
        assert_eq!(policy.select(10), MarkerDetail::Full);
        assert_eq!(policy.select(11), MarkerDetail::Lite);
        assert_eq!(policy.select(21), MarkerDetail::None);
    }

    #[test]
    fn width_truncates_both_ends() {
        assert_eq!(visible_width(10.7, 210.2), 200);
        assert_eq!(visible_width(-3.5, 4.9), 7);
        assert_eq!(visible_width(50.0, 10.0), 0);
        assert_eq!(visible_width(f64::NAN, 10.0), 0);
    }

    #[test]
    fn picks_matching_set() {
        let marker = |text: Option<&str>| Marker {
            time: Timestamp(0),
            side: MarkerSide::BelowBar,
            color: "#000".into(),
            shape: MarkerShape::ArrowUp,
            text: text.map(String::from),
        };
        let full = vec![marker(Some("Buy @ 1 Qty: 1"))];
        let lite = vec![marker(None)];
        let policy = LodPolicy::default();

        assert_eq!(select_visible_markers(100, &full, &lite, &policy), &full[..]);
        assert_eq!(select_visible_markers(300, &full, &lite, &policy), &lite[..]);
        assert!(select_visible_markers(600, &full, &lite, &policy).is_empty());
    }
}
