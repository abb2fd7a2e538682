//! Bar: one OHLC sample of the price series.

use serde::{Deserialize, Serialize};

use super::time::Timestamp;
use crate::error::CoreError;

/// Void prices are saved as `null` and read back as NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: Timestamp,
    #[serde(with = "void_price")]
    pub open: f64,
    #[serde(with = "void_price")]
    pub high: f64,
    #[serde(with = "void_price")]
    pub low: f64,
    #[serde(with = "void_price")]
    pub close: f64,
}

mod void_price {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(price: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if price.is_finite() {
            serializer.serialize_f64(*price)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

impl Bar {
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }

    /// Returns true if any OHLC field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }
}

/// Check that bar timestamps are strictly ascending (which also rules out duplicates).
pub fn check_ascending(bars: &[Bar]) -> Result<(), CoreError> {
    for (i, pair) in bars.windows(2).enumerate() {
        if pair[1].time <= pair[0].time {
            return Err(CoreError::PreconditionViolation {
                index: i + 1,
                previous: pair[0].time,
                current: pair[1].time,
            });
        }
    }
    Ok(())
}
