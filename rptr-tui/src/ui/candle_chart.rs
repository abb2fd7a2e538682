//! Candle chart panel: OHLC candles with level-of-detail trade markers.
//!
//! Renders with direct buffer writes:
//! - Each terminal column is one candle; wide ranges fold several bars into
//!   one column (open of the first, close of the last, extreme high/low)
//! - Body: block char, green if close >= open, pink otherwise
//! - Wicks: vertical line chars to high/low
//! - Markers: ▲ under the bar for buys, ▼ over the bar otherwise; full
//!   markers also get their annotation when there is room
//! - Title: visible range, marker detail and the O/H/L/C of the readout bar,
//!   coloured by its direction

use std::ops::Range;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use rptr_core::domain::Bar;
use rptr_core::format::format_significant;
use rptr_core::markers::MarkerSide;
use rptr_core::BacktestContext;

use crate::theme::Theme;

/// One drawn column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Fold `bars` into columns of `per_column` bars. Void bars are skipped; a
/// column with no drawable bar is `None`.
pub fn bucket_bars(bars: &[Bar], per_column: usize) -> Vec<Option<Candle>> {
    bars.chunks(per_column.max(1))
        .map(|chunk| {
            let mut drawable = chunk.iter().filter(|b| !b.is_void());
            let first = drawable.next()?;
            let mut candle = Candle {
                open: first.open,
                high: first.high,
                low: first.low,
                close: first.close,
            };
            for b in drawable {
                candle.high = candle.high.max(b.high);
                candle.low = candle.low.min(b.low);
                candle.close = b.close;
            }
            Some(candle)
        })
        .collect()
}

/// `2021-01-04 O 101.00 H 103.00 L 99.00 C 102.00`
pub fn ohlc_readout(bar: &Bar) -> String {
    format!(
        "{} O {} H {} L {} C {}",
        bar.time.date_string(),
        format_significant(bar.open, 2),
        format_significant(bar.high, 2),
        format_significant(bar.low, 2),
        format_significant(bar.close, 2),
    )
}

/// Map a price to a row in the plot area (0 = top).
fn price_to_y(price: f64, y_min: f64, y_max: f64, plot_height: u16) -> u16 {
    if (y_max - y_min).abs() < 1e-9 || plot_height == 0 {
        return 0;
    }
    let frac = (price - y_min) / (y_max - y_min);
    let y = plot_height.saturating_sub(1) as f64 * (1.0 - frac);
    y.round().max(0.0).min(plot_height.saturating_sub(1) as f64) as u16
}

pub struct CandleChartPanel<'a> {
    ctx: &'a BacktestContext,
    range: Range<usize>,
    visible_width: usize,
    highlight: Option<usize>,
    cursor: Option<usize>,
    readout: Option<usize>,
    focused: bool,
    theme: &'a Theme,
}

impl<'a> CandleChartPanel<'a> {
    pub fn new(
        ctx: &'a BacktestContext,
        range: Range<usize>,
        visible_width: usize,
        theme: &'a Theme,
    ) -> Self {
        Self {
            ctx,
            range,
            visible_width,
            highlight: None,
            cursor: None,
            readout: None,
            focused: false,
            theme,
        }
    }

    /// Bar to mark with a vertical guide (the selected order).
    pub fn highlight(mut self, bar: Option<usize>) -> Self {
        self.highlight = bar;
        self
    }

    /// Bar under the crosshair.
    pub fn cursor(mut self, bar: Option<usize>) -> Self {
        self.cursor = bar;
        self
    }

    /// Bar whose OHLC goes in the title.
    pub fn readout(mut self, bar: Option<usize>) -> Self {
        self.readout = bar;
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }
}

impl Widget for CandleChartPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bars = self.ctx.bars().get(self.range.clone()).unwrap_or(&[]);
        let detail = self.ctx.marker_detail(self.visible_width);

        if bars.is_empty() {
            Block::default()
                .title(" Price [No Data] ")
                .borders(Borders::ALL)
                .border_style(self.theme.border(self.focused))
                .style(Style::default().bg(self.theme.background))
                .render(area, buf);
            return;
        }

        let mut title = vec![Span::styled(
            format!(
                " Price | bars {}-{} | width {} | markers {:?} ",
                self.range.start,
                self.range.end.saturating_sub(1),
                self.visible_width,
                detail
            ),
            self.theme.title(self.focused),
        )];
        if let Some(bar) = self.readout.and_then(|i| self.ctx.bars().get(i)) {
            let color = if bar.is_void() {
                self.theme.muted
            } else if bar.is_up() {
                self.theme.positive
            } else {
                self.theme.negative
            };
            title.push(Span::styled(
                format!("| {} ", ohlc_readout(bar)),
                Style::default().fg(color),
            ));
        }

        let block = Block::default()
            .title(Line::from(title))
            .borders(Borders::ALL)
            .border_style(self.theme.border(self.focused))
            .style(Style::default().bg(self.theme.background));
        let inner = block.inner(area);
        block.render(area, buf);

        // Left margin for Y-axis labels, bottom row for dates
        let label_width: u16 = 9;
        let plot_left = inner.x + label_width;
        let plot_top = inner.y;
        let plot_width = inner.width.saturating_sub(label_width);
        let plot_height = inner.height.saturating_sub(1);
        if plot_width == 0 || plot_height == 0 {
            return;
        }

        let per_column = bars.len().div_ceil(plot_width as usize).max(1);
        let candles = bucket_bars(bars, per_column);

        let y_min = candles.iter().flatten().map(|c| c.low).fold(f64::INFINITY, f64::min);
        let y_max = candles
            .iter()
            .flatten()
            .map(|c| c.high)
            .fold(f64::NEG_INFINITY, f64::max);
        if !y_min.is_finite() || !y_max.is_finite() {
            return;
        }
        let pad = if y_max > y_min { (y_max - y_min) * 0.05 } else { 1.0 };
        let (y_lower, y_upper) = (y_min - pad, y_max + pad);
        let to_y = |price: f64| price_to_y(price, y_lower, y_upper, plot_height);

        let muted = Style::default().fg(self.theme.muted);
        let y_labels = [y_upper, (y_upper + y_lower) / 2.0, y_lower];
        let y_positions = [0u16, plot_height / 2, plot_height.saturating_sub(1)];
        for (value, y) in y_labels.iter().zip(y_positions) {
            buf.set_string(inner.x, plot_top + y, format!("{value:>8.2}"), muted);
        }

        let column_of = |bar: usize| -> Option<u16> {
            if !self.range.contains(&bar) {
                return None;
            }
            let col = ((bar - self.range.start) / per_column) as u16;
            (col < plot_width).then_some(col)
        };

        // Guides first so candles draw over them
        let guides = [
            (self.highlight, self.theme.neutral),
            (self.cursor, self.theme.accent),
        ];
        for (bar, color) in guides {
            if let Some(col) = bar.and_then(column_of) {
                let style = Style::default().fg(color).add_modifier(Modifier::DIM);
                for y in 0..plot_height {
                    buf.set_string(plot_left + col, plot_top + y, "┊", style);
                }
            }
        }

        for (i, candle) in candles.iter().enumerate().take(plot_width as usize) {
            let Some(c) = candle else {
                continue;
            };
            let x = plot_left + i as u16;
            let is_up = c.close >= c.open;
            let style = Style::default().fg(if is_up {
                self.theme.positive
            } else {
                self.theme.negative
            });

            let high_y = to_y(c.high);
            let low_y = to_y(c.low);
            let body_top_y = to_y(c.open.max(c.close));
            let body_bot_y = to_y(c.open.min(c.close));

            for y in high_y..body_top_y {
                buf.set_string(x, plot_top + y, "│", style);
            }
            let body = if is_up { "█" } else { "▓" };
            for y in body_top_y..=body_bot_y {
                buf.set_string(x, plot_top + y, body, style);
            }
            for y in (body_bot_y + 1)..=low_y {
                buf.set_string(x, plot_top + y, "│", style);
            }
        }

        // Markers: rows right above/below the candle; labels only where free
        let mut label_end = vec![plot_left; plot_height as usize];
        let plot_right = plot_left + plot_width;
        for marker in self.ctx.visible_markers(self.visible_width) {
            let Some(bar) = self.ctx.lookup_bar_index(marker.time) else {
                continue;
            };
            let Some(col) = column_of(bar) else {
                continue;
            };
            let Some(c) = candles.get(col as usize).copied().flatten() else {
                continue;
            };
            let is_buy = marker.side == MarkerSide::BelowBar;
            let (y, glyph) = if is_buy {
                ((to_y(c.low) + 1).min(plot_height - 1), "▲")
            } else {
                (to_y(c.high).saturating_sub(1), "▼")
            };
            let x = plot_left + col;
            let style = Style::default()
                .fg(self.theme.marker_color(&marker.color, is_buy))
                .add_modifier(Modifier::BOLD);
            buf.set_string(x, plot_top + y, glyph, style);

            if let Some(text) = &marker.text {
                let start = x + 1;
                let len = text.chars().count() as u16;
                let row = y as usize;
                if start >= label_end[row] && start + len <= plot_right {
                    buf.set_string(start, plot_top + y, text, style.remove_modifier(Modifier::BOLD));
                    label_end[row] = start + len + 1;
                }
            }
        }

        // Dates of the first and last visible bars
        let date_y = plot_top + plot_height;
        let first = bars[0].time.date_string();
        let last = bars[bars.len() - 1].time.date_string();
        buf.set_string(plot_left, date_y, &first, muted);
        let last_x = plot_right.saturating_sub(last.len() as u16);
        if last_x > plot_left + first.len() as u16 {
            buf.set_string(last_x, date_y, &last, muted);
        }
    }
}
