//! Calendar-bucket resampling.
//!
//! Rules:
//! - rows are sorted by date first, so input order never matters
//! - each bucket is represented by its last observation in date order
//! - buckets with no observations are omitted, never synthesized
//! - `raw` keeps every row, including accidental same-date duplicates

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{Bucket, BucketKey, BucketedSeries, Granularity, Observation, ObservationTable};
use crate::error::TableError;

/// Resample `table` into buckets of the given granularity.
pub fn resample(table: &ObservationTable, granularity: Granularity) -> Result<BucketedSeries, TableError> {
    if table.is_empty() {
        return Err(TableError::EmptyTable);
    }

    let sorted = table.sorted();

    let buckets = match granularity {
        Granularity::Raw => sorted
            .into_iter()
            .map(|obs| Bucket {
                key: BucketKey::Day(obs.date),
                observation: obs.clone(),
            })
            .collect(),
        _ => last_per_bucket(&sorted, granularity),
    };

    debug!(
        granularity = granularity.display_name(),
        rows = table.len(),
        buckets = buckets.len(),
        "resampled rate table"
    );

    Ok(BucketedSeries {
        granularity,
        series: table.series().to_vec(),
        buckets,
    })
}

/// Reduce date-sorted rows to one per bucket. Later rows overwrite earlier
/// ones, so the bucket keeps its max-date observation (and, for same-date
/// duplicates, the one that arrived last).
fn last_per_bucket(sorted: &[&Observation], granularity: Granularity) -> Vec<Bucket> {
    let mut by_key: BTreeMap<BucketKey, &Observation> = BTreeMap::new();
    for obs in sorted {
        by_key.insert(BucketKey::for_date(granularity, obs.date), *obs);
    }

    by_key
        .into_iter()
        .map(|(key, obs)| Bucket {
            key,
            observation: obs.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn obs(date: NaiveDate, r: f64) -> Observation {
        Observation::new(date, [("r", r)])
    }

    fn table(rows: Vec<Observation>) -> ObservationTable {
        ObservationTable::from_rows(["r"], rows).unwrap()
    }

    fn values(series: &BucketedSeries) -> Vec<f64> {
        series
            .buckets
            .iter()
            .map(|b| b.observation.rate("r").unwrap())
            .collect()
    }

    #[test]
    fn weekly_scenario_three_buckets() {
        let t = table(vec![
            obs(d(2024, 1, 1), 0.50),
            obs(d(2024, 1, 8), 0.50),
            obs(d(2024, 1, 15), 0.60),
        ]);
        let out = resample(&t, Granularity::Weekly).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(values(&out), vec![0.50, 0.50, 0.60]);

        let ends: Vec<_> = out.buckets.iter().map(|b| b.key.period_end().unwrap()).collect();
        assert_eq!(ends, vec![d(2024, 1, 7), d(2024, 1, 14), d(2024, 1, 21)]);
    }

    #[test]
    fn last_observation_in_bucket_wins() {
        let t = table(vec![
            obs(d(2024, 3, 20), 0.9),
            obs(d(2024, 3, 5), 0.1),
            obs(d(2024, 4, 2), 0.3),
        ]);
        let monthly = resample(&t, Granularity::Monthly).unwrap();
        assert_eq!(monthly.len(), 2);
        assert_eq!(monthly.buckets[0].observation.date, d(2024, 3, 20));
        assert_eq!(values(&monthly), vec![0.9, 0.3]);

        let yearly = resample(&t, Granularity::Yearly).unwrap();
        assert_eq!(yearly.len(), 1);
        assert_eq!(yearly.buckets[0].observation.date, d(2024, 4, 2));
    }

    #[test]
    fn result_independent_of_row_order() {
        let rows = vec![
            obs(d(2023, 12, 29), 0.1),
            obs(d(2024, 1, 2), 0.2),
            obs(d(2024, 1, 3), 0.25),
            obs(d(2024, 2, 14), 0.3),
            obs(d(2025, 7, 1), 0.4),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();
        let mut rotated = rows.clone();
        rotated.rotate_left(2);

        for g in Granularity::ALL {
            let base = resample(&table(rows.clone()), g).unwrap();
            assert_eq!(base, resample(&table(reversed.clone()), g).unwrap(), "{g:?}");
            assert_eq!(base, resample(&table(rotated.clone()), g).unwrap(), "{g:?}");
        }
    }

    #[test]
    fn buckets_ascend_and_gaps_are_omitted() {
        let t = table(vec![obs(d(2024, 12, 1), 0.2), obs(d(2020, 1, 1), 0.1)]);
        let yearly = resample(&t, Granularity::Yearly).unwrap();
        let keys: Vec<_> = yearly.buckets.iter().map(|b| b.key).collect();
        assert_eq!(keys, vec![BucketKey::Year(2020), BucketKey::Year(2024)]);
    }

    #[test]
    fn single_row_gives_single_bucket() {
        let t = table(vec![obs(d(2024, 5, 5), 0.5)]);
        for g in Granularity::ALL {
            assert_eq!(resample(&t, g).unwrap().len(), 1, "{g:?}");
        }
    }

    #[test]
    fn daily_collapses_duplicate_dates_but_raw_keeps_them() {
        let t = table(vec![
            obs(d(2024, 1, 1), 0.5),
            obs(d(2024, 1, 2), 0.6),
            obs(d(2024, 1, 1), 0.7),
        ]);
        let daily = resample(&t, Granularity::Daily).unwrap();
        assert_eq!(values(&daily), vec![0.7, 0.6]);

        let raw = resample(&t, Granularity::Raw).unwrap();
        assert_eq!(values(&raw), vec![0.5, 0.7, 0.6]);
    }

    #[test]
    fn empty_table_is_an_error() {
        let t = ObservationTable::new(["r"]).unwrap();
        for g in Granularity::ALL {
            assert_eq!(resample(&t, g).unwrap_err(), TableError::EmptyTable);
        }
    }
}
