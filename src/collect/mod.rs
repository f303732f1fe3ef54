//! Daily collection step: append today's observation unless its date is already present.

use tracing::info;

use crate::domain::{Observation, ObservationTable};
use crate::error::TableError;

pub mod source;

pub use source::{DummySource, RateSource};

/// What `collect` did with the new observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectStatus {
    /// The observation was appended.
    Appended,
    /// A row with the same date already existed; the table is unchanged.
    SkippedDuplicate,
}

/// Result of one collector run.
#[derive(Debug, Clone, PartialEq)]
pub struct Collected {
    pub table: ObservationTable,
    pub status: CollectStatus,
}

/// Append `observation` to `table` unless a row with the same date exists.
///
/// Partial or non-finite observations are rejected before the duplicate check,
/// so a bad row can never reach the persisted table.
pub fn collect(mut table: ObservationTable, observation: Observation) -> Result<Collected, TableError> {
    table.validate(&observation)?;

    if table.contains_date(observation.date) {
        info!(date = %observation.date, "observation already recorded; skipping");
        return Ok(Collected {
            table,
            status: CollectStatus::SkippedDuplicate,
        });
    }

    info!(date = %observation.date, rows = table.len() + 1, "appending observation");
    table.push(observation);
    Ok(Collected {
        table,
        status: CollectStatus::Appended,
    })
}
