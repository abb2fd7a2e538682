//! Timestamp → bar position lookup.
//!
//! Built once per loaded bar timeline; O(1) lookups afterwards. Used to
//! translate an order's time into the chart position to scroll to.

use std::collections::HashMap;

use crate::domain::{check_ascending, Bar, Timestamp};
use crate::error::CoreError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeIndex {
    positions: HashMap<Timestamp, usize>,
}

impl TimeIndex {
    /// Build the index, rejecting unsorted or duplicated timestamps.
    pub fn build(bars: &[Bar]) -> Result<Self, CoreError> {
        check_ascending(bars)?;
        let positions = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.time, i))
            .collect();
        Ok(Self { positions })
    }

    pub fn lookup(&self, time: Timestamp) -> Option<usize> {
        self.positions.get(&time).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
