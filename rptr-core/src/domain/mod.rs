//! Domain types for backtest rendering

pub mod bar;
pub mod order;
pub mod time;

pub use bar::{check_ascending, Bar};
pub use order::{Numeric, OrderEvent, OrderType};
pub use time::{Timestamp, TimestampError};
