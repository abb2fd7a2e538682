//! Viewer state persistence: JSON save/load across restarts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app::{AppState, OverlaySeries};

/// What was on screen last time, so the viewer reopens it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LastSelection {
    Files {
        bars: PathBuf,
        orders: PathBuf,
        strategy: Option<PathBuf>,
    },
    Saved {
        name: String,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub last_selection: Option<LastSelection>,
    pub overlay_series: OverlaySeries,
    pub help_dismissed: bool,
}

/// Load persisted state from disk. Returns defaults if file is missing or corrupt.
pub fn load(path: &Path) -> PersistedState {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
        Err(_) => PersistedState::default(),
    }
}

/// Save persisted state to disk. Creates parent directories if needed.
pub fn save(path: &Path, state: &PersistedState) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn extract(app: &AppState) -> PersistedState {
    PersistedState {
        last_selection: app.last_selection.clone(),
        overlay_series: app.chart.series,
        help_dismissed: true,
    }
}
