//! CSV ingest for the two input streams.
//!
//! Bars: `time,open,high,low,close[,volume]`.
//! Orders: `time,type,id,price,quantity,av_price,position,pnl,balance,drawdown`.
//! Columns are matched by header name, so order and extra columns do not
//! matter. Order numeric fields are kept as raw text until parsed into
//! `Numeric`, so a `-` in the pnl column survives as a malformed value
//! instead of failing the whole file.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use rptr_core::domain::{Bar, Numeric, OrderEvent, OrderType, Timestamp, TimestampError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{source_name} row {row}: {source}")]
    Row {
        source_name: String,
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("{source_name} row {row}: {source}")]
    Time {
        source_name: String,
        row: usize,
        #[source]
        source: TimestampError,
    },

    #[error("write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BarRecord {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    volume: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OrderRecord {
    time: String,
    #[serde(rename = "type")]
    order_type: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    price: String,
    #[serde(default)]
    quantity: String,
    #[serde(default)]
    av_price: String,
    #[serde(default)]
    position: String,
    #[serde(default)]
    pnl: String,
    #[serde(default)]
    balance: String,
    #[serde(default)]
    drawdown: String,
}

impl OrderRecord {
    fn from_event(event: &OrderEvent) -> Self {
        Self {
            time: event.time.to_string(),
            order_type: event.order_type.to_string(),
            id: event.id.clone(),
            price: event.price.raw().to_string(),
            quantity: event.quantity.raw().to_string(),
            av_price: event.av_price.raw().to_string(),
            position: event.position.raw().to_string(),
            pnl: event.pnl.raw().to_string(),
            balance: event.balance.raw().to_string(),
            drawdown: event.drawdown.raw().to_string(),
        }
    }
}

fn parse_time(raw: &str, source_name: &str, row: usize) -> Result<Timestamp, IngestError> {
    Timestamp::parse(raw).map_err(|source| IngestError::Time {
        source_name: source_name.to_string(),
        row,
        source,
    })
}

/// Read bars from any CSV reader. `source_name` only labels errors.
pub fn read_bars<R: Read>(reader: R, source_name: &str) -> Result<Vec<Bar>, IngestError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    for (i, result) in rdr.deserialize::<BarRecord>().enumerate() {
        let row = i + 1;
        let record = result.map_err(|source| IngestError::Row {
            source_name: source_name.to_string(),
            row,
            source,
        })?;
        bars.push(Bar {
            time: parse_time(&record.time, source_name, row)?,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
        });
    }
    let void = bars.iter().filter(|b| b.is_void()).count();
    if void > 0 {
        warn!(input = source_name, void, "bars with NaN prices");
    }
    debug!(input = source_name, rows = bars.len(), "read bars");
    Ok(bars)
}

/// Read order events from any CSV reader. `source_name` only labels errors.
pub fn read_orders<R: Read>(reader: R, source_name: &str) -> Result<Vec<OrderEvent>, IngestError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut events = Vec::new();
    let mut malformed = 0usize;
    for (i, result) in rdr.deserialize::<OrderRecord>().enumerate() {
        let row = i + 1;
        let record = result.map_err(|source| IngestError::Row {
            source_name: source_name.to_string(),
            row,
            source,
        })?;
        let event = OrderEvent {
            time: parse_time(&record.time, source_name, row)?,
            order_type: OrderType::from(record.order_type),
            id: record.id,
            price: Numeric::parse(&record.price),
            quantity: Numeric::parse(&record.quantity),
            av_price: Numeric::parse(&record.av_price),
            position: Numeric::parse(&record.position),
            pnl: Numeric::parse(&record.pnl),
            balance: Numeric::parse(&record.balance),
            drawdown: Numeric::parse(&record.drawdown),
        };
        malformed += [
            &event.price,
            &event.quantity,
            &event.av_price,
            &event.position,
            &event.pnl,
            &event.balance,
            &event.drawdown,
        ]
        .iter()
        .filter(|n| n.value().is_none())
        .count();
        events.push(event);
    }
    if events.windows(2).any(|w| w[1].time < w[0].time) {
        warn!(input = source_name, "order events are not in time order");
    }
    debug!(input = source_name, rows = events.len(), malformed, "read orders");
    Ok(events)
}

fn open(path: &Path) -> Result<std::fs::File, IngestError> {
    std::fs::File::open(path).map_err(|source| IngestError::Open {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_bars_csv(path: &Path) -> Result<Vec<Bar>, IngestError> {
    let reader = open(path)?;
    let bars = read_bars(reader, &path.display().to_string())?;
    info!(path = %path.display(), bars = bars.len(), "loaded bars");
    Ok(bars)
}

pub fn load_orders_csv(path: &Path) -> Result<Vec<OrderEvent>, IngestError> {
    let reader = open(path)?;
    let events = read_orders(reader, &path.display().to_string())?;
    info!(path = %path.display(), orders = events.len(), "loaded orders");
    Ok(events)
}

/// Write bars in the layout `read_bars` accepts.
pub fn write_bars<W: Write>(writer: W, bars: &[Bar]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for bar in bars {
        wtr.serialize(BarRecord {
            time: bar.time.to_string(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: None,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write order events in the layout `read_orders` accepts.
pub fn write_orders<W: Write>(writer: W, events: &[OrderEvent]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for event in events {
        wtr.serialize(OrderRecord::from_event(event))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_bars_csv(path: &Path, bars: &[Bar]) -> Result<(), IngestError> {
    let file = create(path)?;
    write_bars(file, bars).map_err(|source| IngestError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_orders_csv(path: &Path, events: &[OrderEvent]) -> Result<(), IngestError> {
    let file = create(path)?;
    write_orders(file, events).map_err(|source| IngestError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn create(path: &Path) -> Result<std::fs::File, IngestError> {
    std::fs::File::create(path).map_err(|e| IngestError::Write {
        path: path.to_path_buf(),
        source: csv::Error::from(e),
    })
}
