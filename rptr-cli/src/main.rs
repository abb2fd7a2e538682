//! Replayer CLI: inspect, export, and manage backtests without the viewer.
//!
//! Commands:
//! - `summary`: CAGR, max drawdown and holding period for a backtest
//! - `trades`: the formatted trade table
//! - `markers`: the markers the chart would draw for a visible range
//! - `export`: overlays, trades, markers and summary as CSV/JSON files
//! - `save` / `show`: store a backtest under a name and read it back
//! - `library list` / `library delete`: manage saved backtests
//! - `sample`: write a deterministic sample backtest to disk

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use rptr_core::lod::{visible_width, MarkerDetail};
use rptr_core::trade_table::COLUMNS;
use rptr_core::{BacktestContext, CoreError};
use rptr_runner::export::{
    export_markers_json, export_overlays_csv, export_summary_json, export_trades_csv,
};
use rptr_runner::ingest::{write_bars_csv, write_orders_csv};
use rptr_runner::{
    load_inputs, sample, BacktestStore, LoadedBacktest, Provenance, SelectionSource, ViewerConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rptr", about = "Replayer CLI: backtest overlays, metrics and library")]
struct Cli {
    /// Config file. Defaults to ./rptr.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Which backtest to operate on: files (defaults from config) or a saved name.
#[derive(Args)]
struct InputArgs {
    /// Bar CSV (time,open,high,low,close).
    #[arg(long)]
    bars: Option<PathBuf>,

    /// Order CSV (time,type,id,price,quantity,av_price,position,pnl,balance,drawdown).
    #[arg(long)]
    orders: Option<PathBuf>,

    /// Strategy source file shown alongside the backtest.
    #[arg(long)]
    strategy: Option<PathBuf>,

    /// Load a saved backtest instead of files.
    #[arg(long, conflicts_with_all = ["bars", "orders", "strategy"])]
    saved: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print summary metrics.
    Summary {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Print the trade table.
    Trades {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Print the markers drawn for a visible logical range.
    Markers {
        #[command(flatten)]
        input: InputArgs,

        /// First visible logical bar position.
        #[arg(long, default_value_t = 0.0)]
        from: f64,

        /// Last visible logical bar position. Defaults to the whole series.
        #[arg(long)]
        to: Option<f64>,
    },
    /// Write overlays.csv, trades.csv, markers.json and summary.json.
    Export {
        #[command(flatten)]
        input: InputArgs,

        /// Output directory.
        #[arg(long, default_value = "export")]
        out: PathBuf,
    },
    /// Save a backtest to the store under a name.
    Save {
        /// Name to save under.
        name: String,

        #[command(flatten)]
        input: InputArgs,
    },
    /// Show a saved backtest's summary and strategy.
    Show {
        /// Saved name.
        name: String,
    },
    /// Saved backtest library.
    Library {
        #[command(subcommand)]
        action: LibraryAction,
    },
    /// Write a deterministic sample backtest (data.csv, orders.csv, strategy.py).
    Sample {
        /// Output directory.
        #[arg(long, default_value = "data")]
        out: PathBuf,

        /// Number of daily bars.
        #[arg(long, default_value_t = 500)]
        bars: usize,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

#[derive(Subcommand)]
enum LibraryAction {
    /// List saved backtests with their metrics.
    List,
    /// Delete a saved backtest and its library entry.
    Delete {
        /// Saved name.
        name: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ViewerConfig::discover(cli.config.as_deref()).context("loading config")?;

    match cli.command {
        Commands::Summary { input } => run_summary(&config, &input),
        Commands::Trades { input } => run_trades(&config, &input),
        Commands::Markers { input, from, to } => run_markers(&config, &input, from, to),
        Commands::Export { input, out } => run_export(&config, &input, &out),
        Commands::Save { name, input } => run_save(&config, &name, &input),
        Commands::Show { name } => run_show(&config, &name),
        Commands::Library { action } => match action {
            LibraryAction::List => run_library_list(&config),
            LibraryAction::Delete { name } => run_library_delete(&config, &name),
        },
        Commands::Sample { out, bars, seed } => run_sample(&out, bars, seed),
    }
}

fn open_store(config: &ViewerConfig) -> Result<BacktestStore> {
    BacktestStore::open(&config.store.dir)
        .with_context(|| format!("opening store {}", config.store.dir.display()))
}

fn resolve_source(config: &ViewerConfig, input: &InputArgs) -> Result<SelectionSource> {
    if let Some(name) = &input.saved {
        return Ok(SelectionSource::Saved {
            store: open_store(config)?,
            name: name.clone(),
        });
    }
    Ok(SelectionSource::Files {
        bars: input.bars.clone().unwrap_or_else(|| config.data.bars.clone()),
        orders: input
            .orders
            .clone()
            .unwrap_or_else(|| config.data.orders.clone()),
        strategy: input.strategy.clone().or_else(|| config.data.strategy.clone()),
    })
}

fn load(config: &ViewerConfig, input: &InputArgs) -> Result<LoadedBacktest> {
    let source = resolve_source(config, input)?;
    load_inputs(&source, &config.view_settings())
        .with_context(|| format!("loading {}", source.label()))
}

fn run_summary(config: &ViewerConfig, input: &InputArgs) -> Result<()> {
    let loaded = load(config, input)?;
    print_summary(&loaded);
    Ok(())
}

fn run_trades(config: &ViewerConfig, input: &InputArgs) -> Result<()> {
    let loaded = load(config, input)?;
    let rows = loaded.context.trade_rows();
    if rows.is_empty() {
        println!("No trades.");
        return Ok(());
    }

    let mut widths = COLUMNS.map(str::len);
    for row in rows {
        for (w, text) in widths.iter_mut().zip(row.texts()) {
            *w = (*w).max(text.chars().count());
        }
    }

    println!("{}", table_line(COLUMNS, &widths));
    println!("{}", "-".repeat(widths.iter().sum::<usize>() + 2 * (COLUMNS.len() - 1)));
    for row in rows {
        println!("{}", table_line(row.texts(), &widths));
    }
    Ok(())
}

fn table_line(cells: [&str; 9], widths: &[usize; 9]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(c, &w)| format!("{c:>w$}"))
        .collect::<Vec<_>>()
        .join("  ")
}

fn run_markers(config: &ViewerConfig, input: &InputArgs, from: f64, to: Option<f64>) -> Result<()> {
    let loaded = load(config, input)?;
    let ctx = &loaded.context;
    let to = to.unwrap_or(ctx.bars().len() as f64);
    let width = visible_width(from, to);
    let detail = ctx.marker_detail(width);

    println!("Visible width: {width} bars → {detail:?} markers");
    if detail == MarkerDetail::None {
        return Ok(());
    }
    for m in ctx.visible_markers(width) {
        let side = format!("{:?}", m.side);
        let shape = format!("{:?}", m.shape);
        println!(
            "{}  {side:<9} {shape:<10} {}  {}",
            m.time,
            m.color,
            m.text.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn run_export(config: &ViewerConfig, input: &InputArgs, out: &Path) -> Result<()> {
    let loaded = load(config, input)?;
    let ctx = &loaded.context;
    std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;

    let files = [
        ("overlays.csv", export_overlays_csv(ctx)?),
        ("trades.csv", export_trades_csv(ctx.trade_rows())?),
        ("markers.json", export_markers_json(ctx)?),
        ("summary.json", export_summary_json(ctx)?),
    ];
    for (name, content) in &files {
        let path = out.join(name);
        std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
    }
    println!("Exported {} files to {}", files.len(), out.display());
    Ok(())
}

fn run_save(config: &ViewerConfig, name: &str, input: &InputArgs) -> Result<()> {
    if input.saved.is_some() {
        bail!("save reads from files; --saved is not allowed here");
    }
    let loaded = load(config, input)?;
    let store = open_store(config)?;
    let entry = store.save_backtest(
        name,
        loaded.context.bars(),
        loaded.context.events(),
        loaded.strategy.as_deref(),
    )?;
    info!(name, saved = %entry.saved, "saved");
    println!("Saved '{name}' ({})", entry.saved);
    Ok(())
}

fn run_show(config: &ViewerConfig, name: &str) -> Result<()> {
    let input = InputArgs {
        bars: None,
        orders: None,
        strategy: None,
        saved: Some(name.to_string()),
    };
    let loaded = load(config, &input)?;
    print_summary(&loaded);
    if let Some(strategy) = &loaded.strategy {
        println!("--- Strategy ---");
        println!("{strategy}");
    }
    Ok(())
}

fn run_library_list(config: &ViewerConfig) -> Result<()> {
    let library = open_store(config)?.list_library()?;
    if library.is_empty() {
        println!("Library is empty: {}", config.store.dir.display());
        return Ok(());
    }

    let pct = |v: Option<f64>| v.map(|v| format!("{v}%")).unwrap_or_else(|| "-".into());
    println!(
        "{:<24} {:>8} {:>8} {:>7} {:<23} {:<10}",
        "Name", "CAGR", "MaxDD", "Days", "Range", "Saved"
    );
    println!("{}", "-".repeat(85));
    for (name, e) in &library {
        let range = match (e.start, e.end) {
            (Some(s), Some(t)) => format!("{} - {}", s.date_string(), t.date_string()),
            _ => "-".into(),
        };
        println!(
            "{:<24} {:>8} {:>8} {:>7} {:<23} {:<10}",
            name,
            pct(e.cagr_pct),
            pct(e.max_dd_pct),
            e.period_days.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            range,
            e.saved
        );
    }
    Ok(())
}

fn run_library_delete(config: &ViewerConfig, name: &str) -> Result<()> {
    if open_store(config)?.delete_backtest(name)? {
        println!("Deleted '{name}'");
    } else {
        println!("No saved backtest named '{name}'");
    }
    Ok(())
}

fn run_sample(out: &Path, bars: usize, seed: u64) -> Result<()> {
    std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
    let s = sample::generate(bars, seed);
    write_bars_csv(&out.join("data.csv"), &s.bars)?;
    write_orders_csv(&out.join("orders.csv"), &s.orders)?;
    std::fs::write(out.join("strategy.py"), &s.strategy).context("writing strategy.py")?;
    println!(
        "Wrote {} bars and {} orders to {}",
        s.bars.len(),
        s.orders.len(),
        out.display()
    );
    Ok(())
}

fn print_summary(loaded: &LoadedBacktest) {
    let ctx: &BacktestContext = &loaded.context;
    println!();
    println!("=== Backtest ===");
    match &loaded.provenance {
        Provenance::Files { bars, orders } => {
            println!("Bars:           {}", bars.display());
            println!("Orders:         {}", orders.display());
        }
        Provenance::Saved { name, saved } => {
            println!("Saved as:       {name} ({saved})");
        }
    }
    println!(
        "Bars/Orders:    {} / {}",
        ctx.bars().len(),
        ctx.events().len()
    );
    println!("Input hash:     {}", &loaded.input_hash[..16.min(loaded.input_hash.len())]);
    println!();
    println!("--- Performance ---");
    match ctx.summary() {
        Ok(s) => {
            println!("{}", s.headline());
            println!("Capital:        {}", s.capital);
            println!("NAV:            {}", s.nav);
        }
        Err(CoreError::EmptyEventStream) => println!("No orders: metrics unavailable"),
        Err(e) => println!("Metrics unavailable: {e}"),
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn saved_conflicts_with_file_inputs() {
        let parsed = Cli::try_parse_from(["rptr", "summary", "--saved", "a", "--bars", "b.csv"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["rptr", "library", "list", "--config", "x.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(
            cli.command,
            Commands::Library {
                action: LibraryAction::List
            }
        ));
    }

    #[test]
    fn file_inputs_fall_back_to_config() {
        let config = ViewerConfig::default();
        let input = InputArgs {
            bars: Some(PathBuf::from("x.csv")),
            orders: None,
            strategy: None,
            saved: None,
        };
        match resolve_source(&config, &input).unwrap() {
            SelectionSource::Files {
                bars,
                orders,
                strategy,
            } => {
                assert_eq!(bars, PathBuf::from("x.csv"));
                assert_eq!(orders, config.data.orders);
                assert_eq!(strategy, None);
            }
            other => panic!("expected files, got {other:?}"),
        }
    }
}
