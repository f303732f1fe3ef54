//! Shared presenter pass used by both the CLI and the TUI.
//!
//! load result -> validate -> resample + latest + trailing -> `Presentation`
//!
//! The front-ends only decide how to draw the outcome. A failed load and a
//! table with no rows are kept apart here, even though both end up as a
//! "no data" screen.

use serde::Serialize;

use crate::domain::{BucketedSeries, Granularity, Observation, ObservationTable};
use crate::error::TableError;
use crate::series::{latest, resample, trailing};

/// Everything one rendering pass needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub series: Vec<String>,
    pub latest: Observation,
    pub trailing: Vec<Observation>,
    pub bucketed: BucketedSeries,
}

/// Why a pass has nothing to show.
#[derive(Debug, Clone, PartialEq)]
pub enum NoData {
    /// Fetching or decoding the table failed.
    Unavailable(TableError),
    /// The table decoded fine but has no rows.
    Empty,
}

/// Outcome of one presenter pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Presentation {
    Ready(Dashboard),
    NoData(NoData),
}

/// Derive all artifacts of a pass from a loaded table.
pub fn build_dashboard(
    table: &ObservationTable,
    granularity: Granularity,
    trailing_rows: usize,
) -> Result<Dashboard, TableError> {
    let latest = latest(table)?.clone();
    let bucketed = resample(table, granularity)?;
    let trailing = trailing(table, trailing_rows).into_iter().cloned().collect();

    Ok(Dashboard {
        series: table.series().to_vec(),
        latest,
        trailing,
        bucketed,
    })
}

/// Run a pass over the result of a load.
pub fn present(
    loaded: Result<ObservationTable, TableError>,
    granularity: Granularity,
    trailing_rows: usize,
) -> Presentation {
    let table = match loaded {
        Ok(table) => table,
        Err(err) => return Presentation::NoData(NoData::Unavailable(err)),
    };

    match build_dashboard(&table, granularity, trailing_rows) {
        Ok(dashboard) => Presentation::Ready(dashboard),
        Err(TableError::EmptyTable) => Presentation::NoData(NoData::Empty),
        Err(err) => Presentation::NoData(NoData::Unavailable(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample_table() -> ObservationTable {
        ObservationTable::from_rows(
            ["BOJ", "MUFG"],
            vec![
                Observation::new(d(2024, 1, 15), [("BOJ", 0.6), ("MUFG", 2.5)]),
                Observation::new(d(2024, 1, 1), [("BOJ", 0.5), ("MUFG", 2.475)]),
                Observation::new(d(2024, 1, 8), [("BOJ", 0.5), ("MUFG", 2.475)]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn ready_pass_has_all_artifacts() {
        let Presentation::Ready(dash) = present(Ok(sample_table()), Granularity::Weekly, 7) else {
            panic!("expected a ready dashboard");
        };
        assert_eq!(dash.latest.date, d(2024, 1, 15));
        assert_eq!(dash.trailing.len(), 3);
        assert_eq!(dash.trailing[0].date, d(2024, 1, 15));
        assert_eq!(dash.bucketed.len(), 3);
        assert_eq!(dash.series, vec!["BOJ".to_string(), "MUFG".to_string()]);
    }

    #[test]
    fn empty_table_and_failed_load_stay_distinct() {
        let empty = ObservationTable::new(["BOJ"]).unwrap();
        assert_eq!(present(Ok(empty), Granularity::Daily, 7), Presentation::NoData(NoData::Empty));

        let failure = TableError::load_failure("rates.csv", "not found");
        assert_eq!(
            present(Err(failure.clone()), Granularity::Daily, 7),
            Presentation::NoData(NoData::Unavailable(failure))
        );
    }

    #[test]
    fn malformed_table_is_unavailable() {
        let err = TableError::schema(Some(4), "Missing value for `BOJ`.");
        assert!(matches!(
            present(Err(err), Granularity::Raw, 7),
            Presentation::NoData(NoData::Unavailable(TableError::SchemaViolation { .. }))
        ));
    }

    #[test]
    fn build_dashboard_reports_empty_table() {
        let empty = ObservationTable::new(["BOJ"]).unwrap();
        assert_eq!(
            build_dashboard(&empty, Granularity::Monthly, 7).unwrap_err(),
            TableError::EmptyTable
        );
    }
}
