//! Bottom status bar: key hints and the last status message.

use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::{AppState, Focus, StatusLevel};
use crate::theme::Theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState, theme: &Theme) {
    let hints = match app.focus {
        Focus::Chart => " h/l:pan +/-:zoom 0:reset [/]:crosshair o:overlay Tab:orders L:library ?:help",
        Focus::Trades => " j/k:select Enter:jump o:overlay Tab:chart L:library ?:help",
    };
    let mut spans = vec![
        Span::styled(hints, Style::default().fg(theme.muted)),
        Span::raw(" | "),
    ];

    if let Some((msg, level)) = &app.status_message {
        let color = match level {
            StatusLevel::Info => theme.accent,
            StatusLevel::Warning => theme.warning,
            StatusLevel::Error => theme.negative,
        };
        spans.push(Span::styled(msg.as_str(), Style::default().fg(color)));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
