//! Keyboard input dispatch: overlays → global keys → focused pane.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::app::{AppState, Focus, Overlay};

const ZOOM_IN: f64 = 0.8;
const ZOOM_OUT: f64 = 1.25;

pub fn handle_key(app: &mut AppState, key: KeyEvent) {
    // Only handle key press events (Windows sends both Press and Release).
    if key.kind != KeyEventKind::Press {
        return;
    }

    // 1. Overlays consume input first.
    match &app.overlay {
        Overlay::Help => {
            app.overlay = Overlay::None;
            return;
        }
        Overlay::Library => {
            handle_library_overlay(app, key);
            return;
        }
        Overlay::Strategy => {
            handle_strategy_overlay(app, key);
            return;
        }
        Overlay::SaveAs(_) => {
            handle_save_overlay(app, key);
            return;
        }
        Overlay::ConfirmDelete(_) => {
            handle_confirm_delete(app, key);
            return;
        }
        Overlay::None => {}
    }

    // 2. Global keys.
    match key.code {
        KeyCode::Char('q') => {
            app.running = false;
            return;
        }
        KeyCode::Char('?') => {
            app.overlay = Overlay::Help;
            return;
        }
        KeyCode::Char('L') => {
            app.open_library();
            return;
        }
        KeyCode::Char('v') => {
            app.overlay = Overlay::Strategy;
            return;
        }
        KeyCode::Char('s') => {
            if app.loaded.is_some() {
                app.overlay = Overlay::SaveAs(String::new());
            } else {
                app.set_warning("Nothing loaded to save");
            }
            return;
        }
        KeyCode::Char('o') => {
            app.chart.series = app.chart.series.toggle();
            return;
        }
        KeyCode::Char('r') => {
            app.reload();
            return;
        }
        KeyCode::Tab | KeyCode::BackTab => {
            app.focus = app.focus.toggle();
            return;
        }
        _ => {}
    }

    // 3. Pane-specific keys.
    match app.focus {
        Focus::Chart => handle_chart_key(app, key),
        Focus::Trades => handle_trades_key(app, key),
    }
}

fn handle_chart_key(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Char('h') | KeyCode::Left => app.pan(-1.0),
        KeyCode::Char('l') | KeyCode::Right => app.pan(1.0),
        KeyCode::PageUp => app.pan(-10.0),
        KeyCode::PageDown => app.pan(10.0),
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Char('k') | KeyCode::Up => {
            app.zoom(ZOOM_IN)
        }
        KeyCode::Char('-') | KeyCode::Char('j') | KeyCode::Down => app.zoom(ZOOM_OUT),
        KeyCode::Char('0') | KeyCode::Home => app.reset_view(),
        KeyCode::Char('[') => app.move_cursor(-1),
        KeyCode::Char(']') => app.move_cursor(1),
        KeyCode::Esc => app.clear_cursor(),
        _ => {}
    }
}

fn handle_trades_key(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.move_trade(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_trade(-1),
        KeyCode::PageDown => app.move_trade(10),
        KeyCode::PageUp => app.move_trade(-10),
        KeyCode::Char('g') | KeyCode::Home => app.selected_trade = 0,
        KeyCode::Char('G') | KeyCode::End => app.move_trade(isize::MAX),
        KeyCode::Enter => app.jump_to_selected_trade(),
        _ => {}
    }
}

fn handle_library_overlay(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('L') => {
            app.overlay = Overlay::None;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if app.library.cursor + 1 < app.library.entries.len() {
                app.library.cursor += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.library.cursor = app.library.cursor.saturating_sub(1);
        }
        KeyCode::Enter => app.load_library_selection(),
        KeyCode::Char('d') | KeyCode::Delete => app.request_delete_selection(),
        _ => {}
    }
}

fn handle_strategy_overlay(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('v') => {
            app.overlay = Overlay::None;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.strategy_scroll = app.strategy_scroll.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.strategy_scroll = app.strategy_scroll.saturating_sub(1);
        }
        _ => {}
    }
}

fn handle_confirm_delete(app: &mut AppState, key: KeyEvent) {
    let Overlay::ConfirmDelete(name) = &app.overlay else {
        return;
    };
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => {
            let name = name.clone();
            app.delete_saved(&name);
        }
        _ => app.overlay = Overlay::Library,
    }
}

fn handle_save_overlay(app: &mut AppState, key: KeyEvent) {
    let Overlay::SaveAs(name) = &mut app.overlay else {
        return;
    };
    match key.code {
        KeyCode::Esc => app.overlay = Overlay::None,
        KeyCode::Enter => {
            let name = std::mem::take(name);
            app.overlay = Overlay::None;
            app.save_as(&name);
        }
        KeyCode::Backspace => {
            name.pop();
        }
        KeyCode::Char(c) => name.push(c),
        _ => {}
    }
}
