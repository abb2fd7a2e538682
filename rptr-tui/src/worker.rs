//! Background worker thread: loading and saving run here.
//!
//! Communication with the UI thread is via `mpsc` channels. Loads carry the
//! selection token they were started with; a load whose token has already
//! been superseded is skipped, and the UI thread drops any stale completion
//! that still arrives.

use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rptr_core::domain::{Bar, OrderEvent};
use rptr_core::ViewSettings;
use rptr_runner::{
    load_inputs, BacktestStore, LibraryEntry, LoadedBacktest, SelectionSource, SelectionToken,
    SelectionTracker,
};
use tracing::{debug, warn};

/// Commands sent from the UI to the worker.
#[derive(Debug)]
pub enum WorkerCommand {
    Load {
        token: SelectionToken,
        source: SelectionSource,
        settings: ViewSettings,
    },
    Save {
        store: BacktestStore,
        name: String,
        bars: Vec<Bar>,
        orders: Vec<OrderEvent>,
        strategy: Option<String>,
    },
    Shutdown,
}

/// Responses sent from the worker back to the UI.
#[derive(Debug)]
pub enum WorkerResponse {
    Loaded {
        token: SelectionToken,
        backtest: Box<LoadedBacktest>,
    },
    LoadFailed {
        token: SelectionToken,
        label: String,
        error: String,
    },
    Saved {
        name: String,
        entry: LibraryEntry,
    },
    SaveFailed {
        name: String,
        error: String,
    },
}

pub fn spawn_worker(
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
    tracker: Arc<SelectionTracker>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("rptr-worker".into())
        .spawn(move || worker_loop(rx, tx, tracker))
}

fn worker_loop(
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
    tracker: Arc<SelectionTracker>,
) {
    loop {
        match rx.recv() {
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
            Ok(cmd) => {
                if let Some(resp) = handle_command(cmd, &tracker) {
                    if tx.send(resp).is_err() {
                        break;
                    }
                }
            }
        }
    }
    debug!("worker stopped");
}

fn handle_command(cmd: WorkerCommand, tracker: &SelectionTracker) -> Option<WorkerResponse> {
    match cmd {
        WorkerCommand::Load {
            token,
            source,
            settings,
        } => {
            if !tracker.is_current(token) {
                debug!(generation = token.generation(), "skipping superseded load");
                return None;
            }
            Some(match load_inputs(&source, &settings) {
                Ok(backtest) => WorkerResponse::Loaded {
                    token,
                    backtest: Box::new(backtest),
                },
                Err(e) => {
                    warn!(source = %source.label(), error = %e, "load failed");
                    WorkerResponse::LoadFailed {
                        token,
                        label: source.label(),
                        error: e.to_string(),
                    }
                }
            })
        }
        WorkerCommand::Save {
            store,
            name,
            bars,
            orders,
            strategy,
        } => Some(
            match store.save_backtest(&name, &bars, &orders, strategy.as_deref()) {
                Ok(entry) => WorkerResponse::Saved { name, entry },
                Err(e) => WorkerResponse::SaveFailed {
                    name,
                    error: e.to_string(),
                },
            },
        ),
        WorkerCommand::Shutdown => None,
    }
}
