//! Error taxonomy for the alignment-and-metrics engine.

use thiserror::Error;

use crate::domain::Timestamp;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Bar timestamps are not strictly ascending.
    #[error("bar {index} at {current} does not follow {previous} (bars must be strictly ascending)")]
    PreconditionViolation {
        index: usize,
        previous: Timestamp,
        current: Timestamp,
    },

    #[error("metrics requested for an empty order stream")]
    EmptyEventStream,

    #[error("{metric} is undefined: {reason}")]
    UndefinedMetric {
        metric: &'static str,
        reason: String,
    },

    /// Recovered locally by the formatting layer; surfaced only where a
    /// computation cannot proceed without the value.
    #[error("field '{field}' is not numeric: '{raw}'")]
    MalformedField { field: &'static str, raw: String },
}
