//! Export of derived data: CSV for the aligned overlays and trade table,
//! JSON for markers and the summary.

use anyhow::{Context, Result};
use rptr_core::trade_table::{TradeRow, COLUMNS};
use rptr_core::BacktestContext;
use serde::Serialize;

// ─── CSV export ─────────────────────────────────────────────────────

/// One row per bar: `time,open,high,low,close,equity,drawdown`.
pub fn export_overlays_csv(ctx: &BacktestContext) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["time", "open", "high", "low", "close", "equity", "drawdown"])?;

    let overlays = ctx.overlays();
    for ((bar, equity), drawdown) in ctx
        .bars()
        .iter()
        .zip(&overlays.equity)
        .zip(&overlays.drawdown)
    {
        wtr.write_record([
            bar.time.to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            equity.value.to_string(),
            drawdown.value.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// The trade table as displayed, with the column headers shown in the viewer.
pub fn export_trades_csv(rows: &[TradeRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(COLUMNS)?;
    for row in rows {
        wtr.write_record(row.texts())?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── JSON export ────────────────────────────────────────────────────

#[derive(Serialize)]
struct MarkerExport<'a> {
    full: &'a [rptr_core::markers::Marker],
    lite: &'a [rptr_core::markers::Marker],
}

/// Full and lite marker sets as JSON.
pub fn export_markers_json(ctx: &BacktestContext) -> Result<String> {
    let markers = &ctx.overlays().markers;
    serde_json::to_string_pretty(&MarkerExport {
        full: &markers.full,
        lite: &markers.lite,
    })
    .context("failed to serialize markers")
}

/// The summary as JSON, or `{"error": ...}` when it is undefined.
pub fn export_summary_json(ctx: &BacktestContext) -> Result<String> {
    let value = match ctx.summary() {
        Ok(summary) => serde_json::to_value(summary).context("failed to serialize summary")?,
        Err(e) => serde_json::json!({ "error": e.to_string() }),
    };
    serde_json::to_string_pretty(&value).context("failed to serialize summary")
}
