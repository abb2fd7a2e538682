//! Replayer TUI: terminal viewer for a backtest.
//!
//! Layout:
//! - Price: candlesticks over the visible range, with trade markers whose
//!   detail follows the zoom level
//! - Equity / Drawdown: the aligned overlay series over the same range
//! - Orders: the formatted trade table; Enter scrolls the chart to an order
//! - Library, strategy source, save prompt and help as overlays
//!
//! Usage: `rptr-tui [CONFIG]` (defaults to ./rptr.toml when present).

mod app;
mod input;
mod persistence;
mod theme;
mod ui;
mod worker;

use std::io::{self, stdout};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use rptr_runner::{BacktestStore, SelectionTracker, ViewerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::{AppState, Overlay};
use crate::persistence::LastSelection;
use crate::worker::WorkerCommand;

const LOG_FILE: &str = "rptr-tui.log";

fn main() -> Result<()> {
    // Install a panic hook that restores the terminal before printing the panic.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen);
        default_hook(info);
    }));

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = ViewerConfig::discover(config_path.as_deref()).context("loading config")?;

    let store = BacktestStore::open(&config.store.dir);
    if store.is_ok() {
        init_logging(&config.store.dir);
    }

    let state_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rptr")
        .join("state.json");
    let persisted = persistence::load(&state_path);

    // Worker
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (resp_tx, resp_rx) = mpsc::channel();
    let tracker = Arc::new(SelectionTracker::new());
    let worker_handle = worker::spawn_worker(cmd_rx, resp_tx, Arc::clone(&tracker))
        .context("spawning worker thread")?;

    let mut app = AppState::new(config, None, tracker, cmd_tx.clone(), resp_rx);
    match store {
        Ok(store) => app.store = Some(store),
        Err(e) => app.set_error(format!("Backtest store unavailable: {e}")),
    }
    app.chart.series = persisted.overlay_series;
    if !persisted.help_dismissed {
        app.overlay = Overlay::Help;
    }

    let first = persisted
        .last_selection
        .unwrap_or_else(|| LastSelection::Files {
            bars: app.config.data.bars.clone(),
            orders: app.config.data.orders.clone(),
            strategy: app.config.data.strategy.clone(),
        });
    app.select(first);

    // Terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut app);

    if let Err(e) = persistence::save(&state_path, &persistence::extract(&app)) {
        warn!(error = %e, "failed to save viewer state");
    }

    let _ = cmd_tx.send(WorkerCommand::Shutdown);
    let _ = worker_handle.join();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    info!("viewer closed");

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
) -> Result<()> {
    loop {
        // 1. Render
        terminal.draw(|f| ui::draw(f, app))?;

        // 2. Drain worker responses (non-blocking)
        while let Ok(resp) = app.worker_rx.try_recv() {
            app.apply_response(resp);
        }

        // 3. Poll for input events (50ms timeout for ~20 FPS tick)
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                input::handle_key(app, key);
            }
        }

        if !app.running {
            break;
        }
    }
    Ok(())
}

/// Log to a file in the store directory; the alternate screen owns stdout/stderr.
fn init_logging(dir: &Path) {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE));
    if let Ok(file) = file {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
}
