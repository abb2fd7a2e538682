//! Overlay widgets: help, library browser, strategy source, save prompt,
//! delete confirmation.

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use ratatui::Frame;
use rptr_runner::LibraryEntry;

use crate::app::AppState;
use crate::theme::Theme;
use crate::ui::centered_rect;

fn popup_block(title: String, theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.accent))
        .title(title)
        .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
        .style(Style::default().bg(theme.background))
}

pub fn render_help(f: &mut Frame, area: Rect, theme: &Theme) {
    let popup = centered_rect(60, 70, area);
    f.render_widget(Clear, popup);

    let key = Style::default().fg(theme.accent);
    let text = Style::default().fg(theme.text_secondary);
    let entry = |k: &'static str, what: &'static str| {
        Line::from(vec![Span::styled(format!("  {k:<12}"), key), Span::styled(what, text)])
    };
    let lines = vec![
        Line::from(Span::styled("Keys", key.add_modifier(Modifier::BOLD))),
        Line::from(""),
        entry("Tab", "switch between chart and orders"),
        entry("h / l", "pan chart"),
        entry("PgUp / PgDn", "pan chart by a page"),
        entry("+ / -", "zoom in / out (marker detail follows the width)"),
        entry("0", "show the whole series"),
        entry("[ / ]", "move the crosshair (OHLC in the title)"),
        entry("j / k", "select order (orders pane)"),
        entry("Enter", "scroll chart to the selected order"),
        entry("o", "toggle equity / drawdown"),
        entry("L", "library of saved backtests"),
        entry("s", "save the current backtest"),
        entry("v", "view strategy source"),
        entry("r", "reload the current selection"),
        entry("q", "quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to dismiss...",
            Style::default().fg(theme.neutral),
        )),
    ];
    f.render_widget(
        Paragraph::new(lines).block(popup_block(" Help ".to_string(), theme)),
        popup,
    );
}

fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v}%"))
}

fn library_row<'a>(name: &'a str, entry: &'a LibraryEntry) -> Row<'a> {
    let range = match (entry.start, entry.end) {
        (Some(s), Some(e)) => format!("{} - {}", s.date_string(), e.date_string()),
        _ => "-".to_string(),
    };
    Row::new(vec![
        Cell::from(name),
        Cell::from(pct(entry.cagr_pct)),
        Cell::from(pct(entry.max_dd_pct)),
        Cell::from(entry.period_days.map_or_else(|| "-".to_string(), |d| d.to_string())),
        Cell::from(range),
        Cell::from(entry.saved.to_string()),
    ])
}

pub fn render_library(f: &mut Frame, area: Rect, app: &AppState, theme: &Theme) {
    let popup = centered_rect(85, 70, area);
    f.render_widget(Clear, popup);
    let block = popup_block(
        format!(
            " Library ({}) [Enter]load [d]elete [Esc]close ",
            app.library.entries.len()
        ),
        theme,
    );

    if app.store.is_none() {
        f.render_widget(
            Paragraph::new(Span::styled(
                "Backtest store is unavailable.",
                Style::default().fg(theme.negative),
            ))
            .block(block),
            popup,
        );
        return;
    }
    if app.library.entries.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled(
                "No saved backtests. Press s on a loaded backtest to save it.",
                Style::default().fg(theme.muted),
            ))
            .block(block),
            popup,
        );
        return;
    }

    let header = Row::new(["Name", "CAGR", "MaxDD", "Days", "Range", "Saved"])
        .style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD));
    let rows = app
        .library
        .entries
        .iter()
        .enumerate()
        .map(|(i, (name, entry))| {
            let row = library_row(name, entry);
            if i == app.library.cursor {
                row.style(
                    Style::default()
                        .bg(theme.neutral)
                        .fg(theme.text_primary)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                row.style(Style::default().fg(theme.text_primary))
            }
        });
    let widths = [
        Constraint::Min(16),
        Constraint::Length(9),
        Constraint::Length(9),
        Constraint::Length(6),
        Constraint::Length(23),
        Constraint::Length(10),
    ];
    f.render_widget(Table::new(rows, widths).header(header).block(block), popup);
}

pub fn render_strategy(f: &mut Frame, area: Rect, app: &AppState, theme: &Theme) {
    let popup = centered_rect(80, 80, area);
    f.render_widget(Clear, popup);
    let block = popup_block(" Strategy [j/k]scroll [Esc]close ".to_string(), theme);

    let source = app.loaded.as_ref().and_then(|l| l.strategy.as_deref());
    let para = match source {
        Some(text) => Paragraph::new(text)
            .style(Style::default().fg(theme.text_primary))
            .scroll((app.strategy_scroll, 0)),
        None => Paragraph::new(Span::styled(
            "No strategy source for this backtest.",
            Style::default().fg(theme.muted),
        )),
    };
    f.render_widget(para.block(block).wrap(Wrap { trim: false }), popup);
}

pub fn render_confirm_delete(f: &mut Frame, area: Rect, name: &str, theme: &Theme) {
    let popup = centered_rect(50, 20, area);
    f.render_widget(Clear, popup);
    let lines = vec![
        Line::from(vec![
            Span::styled("Delete saved backtest ", Style::default().fg(theme.text_primary)),
            Span::styled(
                format!("'{name}'"),
                Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
            ),
            Span::styled("?", Style::default().fg(theme.text_primary)),
        ]),
        Line::from(Span::styled(
            "This cannot be undone.",
            Style::default().fg(theme.negative),
        )),
    ];
    let block = popup_block(" Confirm Delete [y]es [n]o ".to_string(), theme);
    f.render_widget(Paragraph::new(lines).block(block), popup);
}

pub fn render_save_prompt(f: &mut Frame, area: Rect, name: &str, theme: &Theme) {
    let popup = centered_rect(50, 20, area);
    f.render_widget(Clear, popup);
    let lines = vec![
        Line::from(Span::styled(
            "Letters, digits, '-', '_' and '.'",
            Style::default().fg(theme.muted),
        )),
        Line::from(vec![
            Span::styled("> ", Style::default().fg(theme.accent)),
            Span::styled(name, Style::default().fg(theme.text_primary)),
            Span::styled("_", Style::default().fg(theme.accent)),
        ]),
    ];
    let block = popup_block(" Save as [Enter]save [Esc]cancel ".to_string(), theme);
    f.render_widget(Paragraph::new(lines).block(block), popup);
}
