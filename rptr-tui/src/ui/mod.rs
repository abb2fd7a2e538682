//! Top-level UI layout: header, candles, overlay series, trade tape, status bar.

pub mod candle_chart;
pub mod overlay_chart;
pub mod overlays;
pub mod status_bar;
pub mod trade_tape;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use rptr_runner::Provenance;

use crate::app::{AppState, Focus, Overlay, OverlaySeries};
use crate::theme::Theme;

use self::candle_chart::CandleChartPanel;
use self::overlay_chart::OverlayChartPanel;
use self::trade_tape::TradeTapePanel;

pub fn draw(f: &mut Frame, app: &AppState) {
    let theme = Theme::default();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, chunks[0], app, &theme);
    draw_body(f, chunks[1], app, &theme);
    status_bar::render(f, chunks[2], app, &theme);

    match &app.overlay {
        Overlay::Help => overlays::render_help(f, chunks[1], &theme),
        Overlay::Library => overlays::render_library(f, chunks[1], app, &theme),
        Overlay::Strategy => overlays::render_strategy(f, chunks[1], app, &theme),
        Overlay::SaveAs(name) => overlays::render_save_prompt(f, chunks[1], name, &theme),
        Overlay::ConfirmDelete(name) => {
            overlays::render_confirm_delete(f, chunks[1], name, &theme)
        }
        Overlay::None => {}
    }
}

fn draw_header(f: &mut Frame, area: Rect, app: &AppState, theme: &Theme) {
    let accent = Style::default().fg(theme.accent);
    let muted = Style::default().fg(theme.muted);
    let mut spans = vec![Span::styled(" rptr ", accent)];

    match &app.loaded {
        Some(loaded) => {
            let source = match &loaded.provenance {
                Provenance::Files { orders, .. } => orders.display().to_string(),
                Provenance::Saved { name, saved } => format!("{name} (saved {saved})"),
            };
            spans.push(Span::styled(source, muted));
            spans.push(Span::raw(" | "));
            let summary = match loaded.context.summary() {
                Ok(s) => Span::styled(s.headline(), accent),
                Err(e) => Span::styled(e.to_string(), Style::default().fg(theme.warning)),
            };
            spans.push(summary);
        }
        None => spans.push(Span::styled("no backtest loaded", muted)),
    }
    if let Some((_, label)) = &app.pending {
        spans.push(Span::styled(
            format!("  loading {label}..."),
            Style::default().fg(theme.warning),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_body(f: &mut Frame, area: Rect, app: &AppState, theme: &Theme) {
    let Some(ctx) = app.context() else {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                "  No backtest loaded.",
                Style::default().fg(theme.text_secondary),
            )),
            Line::from(Span::styled(
                "  Press L to open the library, r to reload, ? for help.",
                Style::default().fg(theme.muted),
            )),
        ];
        f.render_widget(Paragraph::new(lines), area);
        return;
    };

    let panes = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(50),
            Constraint::Percentage(20),
            Constraint::Percentage(30),
        ])
        .split(area);

    let viewport = app.chart.viewport;
    let range = viewport.bar_range(ctx.bars().len());
    let width = viewport.width();

    f.render_widget(
        CandleChartPanel::new(ctx, range.clone(), width, theme)
            .highlight(app.selected_trade_bar())
            .cursor(app.chart.cursor)
            .readout(app.readout_bar())
            .focused(app.focus == Focus::Chart),
        panes[0],
    );

    let overlays = ctx.overlays();
    let points = match app.chart.series {
        OverlaySeries::Equity => &overlays.equity,
        OverlaySeries::Drawdown => &overlays.drawdown,
    };
    f.render_widget(
        OverlayChartPanel::new(points, range, app.chart.series, theme),
        panes[1],
    );

    f.render_widget(
        TradeTapePanel::new(
            ctx.trade_rows(),
            app.selected_trade,
            app.focus == Focus::Trades,
            theme,
        ),
        panes[2],
    );
}

/// Compute a centered rect for overlays.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Buffer contents as text, one line per row.
#[cfg(test)]
pub(crate) fn buffer_text(buf: &ratatui::buffer::Buffer) -> String {
    buf.content
        .chunks(buf.area.width.max(1) as usize)
        .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{loaded, test_app};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn draw_text(app: &AppState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        buffer_text(terminal.backend().buffer())
    }

    #[test]
    fn empty_app_shows_hint() {
        let (app, _rx, _tx) = test_app();
        let text = draw_text(&app);
        assert!(text.contains("No backtest loaded."));
        assert!(text.contains("no backtest loaded"));
    }

    #[test]
    fn loaded_app_draws_all_panes() {
        let (mut app, _rx, _tx) = test_app();
        app.loaded = Some(loaded(300, 7));
        app.reset_view();
        let text = draw_text(&app);
        assert!(text.contains("CAGR:"));
        assert!(text.contains("Price"));
        assert!(text.contains("Equity"));
        assert!(text.contains("Orders ("));
    }

    #[test]
    fn overlays_draw_on_top() {
        let (mut app, _rx, _tx) = test_app();
        app.overlay = Overlay::Help;
        assert!(draw_text(&app).contains("Keys"));
        app.overlay = Overlay::SaveAs("my-run".into());
        assert!(draw_text(&app).contains("my-run"));
        app.overlay = Overlay::ConfirmDelete("old-run".into());
        let text = draw_text(&app);
        assert!(text.contains("Confirm Delete"));
        assert!(text.contains("'old-run'"));
    }
}
