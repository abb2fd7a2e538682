//! Trade tape panel: one row per order event, formatted for display.
//!
//! Enter on a row scrolls the chart to that order's bar.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table, Widget},
};
use rptr_core::trade_table::{TradeRow, COLUMNS};

use crate::theme::Theme;

pub struct TradeTapePanel<'a> {
    rows: &'a [TradeRow],
    selected: usize,
    focused: bool,
    theme: &'a Theme,
}

impl<'a> TradeTapePanel<'a> {
    pub fn new(rows: &'a [TradeRow], selected: usize, focused: bool, theme: &'a Theme) -> Self {
        Self {
            rows,
            selected,
            focused,
            theme,
        }
    }
}

/// First row to draw so `selected` stays on screen.
fn scroll_offset(selected: usize, visible_rows: usize) -> usize {
    if visible_rows == 0 {
        return selected;
    }
    selected.saturating_sub(visible_rows - 1)
}

impl Widget for TradeTapePanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(format!(" Orders ({}) ", self.rows.len()))
            .title_style(self.theme.title(self.focused))
            .borders(Borders::ALL)
            .border_style(self.theme.border(self.focused))
            .style(Style::default().bg(self.theme.background));

        let header = Row::new(COLUMNS.iter().map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )
        }))
        .height(1);

        // borders + header
        let visible_rows = area.height.saturating_sub(3) as usize;
        let offset = scroll_offset(self.selected, visible_rows);

        let rows = self
            .rows
            .iter()
            .enumerate()
            .skip(offset)
            .take(visible_rows)
            .map(|(i, row)| {
                let style = if i == self.selected {
                    Style::default()
                        .bg(self.theme.neutral)
                        .fg(self.theme.text_primary)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(self.theme.text_primary)
                };
                let texts = row.texts();
                let pnl_color = row
                    .pnl
                    .raw
                    .trim()
                    .parse::<f64>()
                    .map_or(self.theme.text_secondary, |v| self.theme.pnl_color(v));

                let cells = texts.into_iter().enumerate().map(|(col, text)| {
                    let cell = Cell::from(text.to_string());
                    match col {
                        1 => cell.style(Style::default().fg(self.theme.side_color(row.is_buy))),
                        6 => cell.style(Style::default().fg(pnl_color)),
                        _ => cell,
                    }
                });
                Row::new(cells).style(style).height(1)
            });

        let widths = [
            Constraint::Length(16),
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Length(9),
            Constraint::Length(10),
            Constraint::Length(9),
            Constraint::Length(11),
            Constraint::Length(11),
            Constraint::Min(8),
        ];

        Table::new(rows, widths)
            .header(header)
            .block(block)
            .column_spacing(1)
            .render(area, buf);
    }
}
