//! Equity / drawdown line chart under the candles, over the same bar range.

use std::ops::Range;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    symbols,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Widget},
};
use rptr_core::align::AlignedPoint;
use rptr_core::format::compact_number;

use crate::app::OverlaySeries;
use crate::theme::Theme;

pub struct OverlayChartPanel<'a> {
    points: &'a [AlignedPoint],
    range: Range<usize>,
    series: OverlaySeries,
    theme: &'a Theme,
}

impl<'a> OverlayChartPanel<'a> {
    pub fn new(
        points: &'a [AlignedPoint],
        range: Range<usize>,
        series: OverlaySeries,
        theme: &'a Theme,
    ) -> Self {
        Self {
            points,
            range,
            series,
            theme,
        }
    }
}

impl Widget for OverlayChartPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let visible = self.points.get(self.range.clone()).unwrap_or(&[]);
        let data: Vec<(f64, f64)> = visible
            .iter()
            .enumerate()
            .map(|(i, p)| ((self.range.start + i) as f64, p.value))
            .filter(|(_, v)| v.is_finite())
            .collect();

        let block = Block::default()
            .title(format!(" {} [o to toggle] ", self.series.label()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.muted))
            .style(Style::default().bg(self.theme.background));

        if data.is_empty() {
            block.render(area, buf);
            return;
        }

        let y_min = data.iter().map(|&(_, v)| v).fold(f64::INFINITY, f64::min);
        let y_max = data.iter().map(|&(_, v)| v).fold(f64::NEG_INFINITY, f64::max);
        let pad = if y_max > y_min { (y_max - y_min) * 0.05 } else { 1.0 };
        let (y_lower, y_upper) = (y_min - pad, y_max + pad);
        let x_min = self.range.start as f64;
        let x_max = (self.range.end.saturating_sub(1) as f64).max(x_min + 1.0);

        let color = match self.series {
            OverlaySeries::Equity => self.theme.accent,
            OverlaySeries::Drawdown => self.theme.negative,
        };
        let dataset = Dataset::default()
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(color))
            .graph_type(GraphType::Line)
            .data(&data);

        let muted = Style::default().fg(self.theme.muted);
        let chart = Chart::new(vec![dataset])
            .block(block)
            .x_axis(Axis::default().style(muted).bounds([x_min, x_max]))
            .y_axis(
                Axis::default()
                    .style(muted)
                    .bounds([y_lower, y_upper])
                    .labels(vec![
                        Span::styled(compact_number(y_lower), muted),
                        Span::styled(compact_number(y_upper), muted),
                    ]),
            );
        chart.render(area, buf);
    }
}
