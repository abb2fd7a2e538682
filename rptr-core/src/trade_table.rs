//! Trade table rows: display-ready cells for each order event.
//!
//! Each numeric cell keeps its source text alongside the formatted value so a
//! renderer can show the exact figure on hover.

use serde::{Deserialize, Serialize};

use crate::domain::{Numeric, OrderEvent, Timestamp};
use crate::format::{format_amount_cell, format_price_cell, format_quantity_cell};

pub const COLUMNS: [&str; 9] = [
    "Date",
    "Type",
    "Price",
    "Quantity",
    "Av. Price",
    "Position",
    "PnL",
    "Balance",
    "Drawdown",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub text: String,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRow {
    /// Order time, used for jump-to-bar.
    pub time: Timestamp,
    pub date: String,
    pub order_type: String,
    pub id: String,
    pub is_buy: bool,
    pub price: Cell,
    pub quantity: Cell,
    pub av_price: Cell,
    pub position: Cell,
    pub pnl: Cell,
    pub balance: Cell,
    pub drawdown: Cell,
}

impl TradeRow {
    pub fn from_event(event: &OrderEvent, sig_digits: usize) -> Self {
        Self {
            time: event.time,
            date: event.time.minute_string(),
            order_type: event.order_type.to_string(),
            id: event.id.clone(),
            is_buy: event.order_type.is_buy(),
            price: cell(&event.price, format_price_cell(&event.price, sig_digits)),
            quantity: cell(
                &event.quantity,
                format_quantity_cell(&event.quantity, sig_digits),
            ),
            av_price: cell(
                &event.av_price,
                format_price_cell(&event.av_price, sig_digits),
            ),
            position: cell(
                &event.position,
                format_quantity_cell(&event.position, sig_digits),
            ),
            pnl: cell(&event.pnl, format_amount_cell(&event.pnl)),
            balance: cell(&event.balance, format_amount_cell(&event.balance)),
            drawdown: cell(&event.drawdown, event.drawdown.raw().trim().to_string()),
        }
    }

    /// Cells in `COLUMNS` order. The type column shows the order id, or the
    /// type label for orders without one.
    pub fn texts(&self) -> [&str; 9] {
        let kind = if self.id.is_empty() {
            self.order_type.as_str()
        } else {
            self.id.as_str()
        };
        [
            self.date.as_str(),
            kind,
            self.price.text.as_str(),
            self.quantity.text.as_str(),
            self.av_price.text.as_str(),
            self.position.text.as_str(),
            self.pnl.text.as_str(),
            self.balance.text.as_str(),
            self.drawdown.text.as_str(),
        ]
    }
}

fn cell(field: &Numeric, text: String) -> Cell {
    Cell {
        text,
        raw: field.raw().to_string(),
    }
}

pub fn build_rows(events: &[OrderEvent], sig_digits: usize) -> Vec<TradeRow> {
    events
        .iter()
        .map(|e| TradeRow::from_event(e, sig_digits))
        .collect()
}
