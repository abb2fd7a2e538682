//! Order events: one simulated fill plus the account snapshot it produced.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::time::Timestamp;
use crate::error::CoreError;

/// Direction of a fill. Anything that is not `BUY` is drawn as a sell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderType {
    Buy,
    Sell,
    Other(String),
}

impl OrderType {
    pub fn is_buy(&self) -> bool {
        matches!(self, OrderType::Buy)
    }

    /// Human-readable action label used in marker text.
    pub fn action_label(&self) -> &str {
        match self {
            OrderType::Buy => "Buy",
            _ => "Sell",
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OrderType::Buy => "BUY",
            OrderType::Sell => "SELL",
            OrderType::Other(s) => s,
        }
    }
}

impl FromStr for OrderType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "BUY" => OrderType::Buy,
            "SELL" => OrderType::Sell,
            other => OrderType::Other(other.to_string()),
        })
    }
}

impl From<String> for OrderType {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(t) => t,
            Err(never) => match never {},
        }
    }
}

impl From<OrderType> for String {
    fn from(t: OrderType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric field parsed from text. Both variants keep the source text,
/// which is what tooltips, exports and the saved form show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "NumericRepr", into = "String")]
pub enum Numeric {
    Value { value: f64, raw: String },
    Malformed(String),
}

/// Saved documents hold the source text; hand-written ones may use numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumericRepr {
    Number(f64),
    Text(String),
}

impl Numeric {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Numeric::Value {
                value,
                raw: raw.to_string(),
            },
            _ => Numeric::Malformed(raw.to_string()),
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Numeric::Value { value, .. } => Some(*value),
            Numeric::Malformed(_) => None,
        }
    }

    /// The value, or a `MalformedField` error naming the field.
    pub fn require(&self, field: &'static str) -> Result<f64, CoreError> {
        match self {
            Numeric::Value { value, .. } => Ok(*value),
            Numeric::Malformed(raw) => Err(CoreError::MalformedField {
                field,
                raw: raw.clone(),
            }),
        }
    }

    /// Source text for tooltips.
    pub fn raw(&self) -> &str {
        match self {
            Numeric::Value { raw, .. } | Numeric::Malformed(raw) => raw.as_str(),
        }
    }
}

impl From<f64> for Numeric {
    fn from(v: f64) -> Self {
        if v.is_finite() {
            Numeric::Value {
                value: v,
                raw: v.to_string(),
            }
        } else {
            Numeric::Malformed(v.to_string())
        }
    }
}

impl From<NumericRepr> for Numeric {
    fn from(repr: NumericRepr) -> Self {
        match repr {
            NumericRepr::Number(v) => v.into(),
            NumericRepr::Text(s) => Numeric::parse(&s),
        }
    }
}

impl From<Numeric> for String {
    fn from(n: Numeric) -> Self {
        match n {
            Numeric::Value { raw, .. } | Numeric::Malformed(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub time: Timestamp,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub id: String,
    pub price: Numeric,
    pub quantity: Numeric,
    pub av_price: Numeric,
    pub position: Numeric,
    pub pnl: Numeric,
    pub balance: Numeric,
    pub drawdown: Numeric,
}

impl OrderEvent {
    /// A fill with the given price and quantity; all snapshot fields zeroed.
    pub fn fill(time: Timestamp, order_type: OrderType, price: f64, quantity: f64) -> Self {
        Self {
            time,
            order_type,
            id: String::new(),
            price: price.into(),
            quantity: quantity.into(),
            av_price: price.into(),
            position: 0.0.into(),
            pnl: 0.0.into(),
            balance: 0.0.into(),
            drawdown: 0.0.into(),
        }
    }

    pub fn with_snapshot(mut self, balance: f64, drawdown: f64) -> Self {
        self.balance = balance.into();
        self.drawdown = drawdown.into();
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}
