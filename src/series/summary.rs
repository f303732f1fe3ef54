//! Latest-observation and trailing-window summaries.

use crate::domain::{Observation, ObservationTable};
use crate::error::TableError;

/// Default size of the trailing history window.
pub const DEFAULT_TRAILING_ROWS: usize = 7;

/// The observation with the greatest date.
///
/// Ties (only possible in a malformed table) resolve to the row that arrived last.
pub fn latest(table: &ObservationTable) -> Result<&Observation, TableError> {
    table
        .sorted()
        .last()
        .copied()
        .ok_or(TableError::EmptyTable)
}

/// Up to `k` most recent observations, newest first.
pub fn trailing(table: &ObservationTable, k: usize) -> Vec<&Observation> {
    let sorted = table.sorted();
    let start = sorted.len().saturating_sub(k);
    sorted[start..].iter().rev().copied().collect()
}
