//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - built by the collector and appended to the persisted table
//! - loaded and validated by the presenter
//! - exported to JSON/CSV after resampling

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use chrono::{Datelike, Months, NaiveDate, Weekday};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::TableError;

/// One day's recorded set of rate values (percent, `%` implied).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub rates: BTreeMap<String, f64>,
}

impl Observation {
    pub fn new<I, S>(date: NaiveDate, rates: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            date,
            rates: rates.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn rate(&self, series: &str) -> Option<f64> {
        self.rates.get(series).copied()
    }
}

/// The accumulated table of observations.
///
/// `series` fixes the set (and display order) of rate series; every row must
/// carry a finite value for each of them. Rows are kept in arrival order;
/// date order is derived on demand via [`ObservationTable::sorted`].
///
/// Uniqueness on `date` is upheld by the collector, not by this type: a table
/// decoded from an external feed may contain duplicates and downstream code
/// must cope with that.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationTable {
    series: Vec<String>,
    rows: Vec<Observation>,
}

impl ObservationTable {
    /// An empty table with the given series schema.
    pub fn new<I, S>(series: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let series: Vec<String> = series.into_iter().map(Into::into).collect();
        validate_series(&series)?;
        Ok(Self {
            series,
            rows: Vec::new(),
        })
    }

    /// Build a table and validate every row against the schema.
    pub fn from_rows<I, S>(series: I, rows: Vec<Observation>) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new(series)?;
        for row in &rows {
            table.validate(row)?;
        }
        table.rows = rows;
        Ok(table)
    }

    pub fn series(&self) -> &[String] {
        &self.series
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.rows.iter().any(|r| r.date == date)
    }

    /// Check that `row` supplies exactly the known series with finite values.
    pub fn validate(&self, row: &Observation) -> Result<(), TableError> {
        for name in &self.series {
            match row.rates.get(name) {
                None => {
                    return Err(TableError::schema(
                        None,
                        format!("Observation for {} is missing series `{name}`.", row.date),
                    ));
                }
                Some(v) if !v.is_finite() => {
                    return Err(TableError::schema(
                        None,
                        format!("Observation for {} has a non-finite `{name}` value.", row.date),
                    ));
                }
                Some(_) => {}
            }
        }
        if let Some(extra) = row.rates.keys().find(|k| !self.series.contains(k)) {
            return Err(TableError::schema(
                None,
                format!("Observation for {} has unknown series `{extra}`.", row.date),
            ));
        }
        Ok(())
    }

    /// Rows in ascending date order. The sort is stable, so rows sharing a
    /// date keep their arrival order.
    pub fn sorted(&self) -> Vec<&Observation> {
        let mut out: Vec<&Observation> = self.rows.iter().collect();
        out.sort_by_key(|r| r.date);
        out
    }

    /// Dates that appear on more than one row.
    pub fn duplicate_dates(&self) -> Vec<NaiveDate> {
        let mut seen = HashSet::new();
        let mut dups: Vec<NaiveDate> = self
            .rows
            .iter()
            .filter(|r| !seen.insert(r.date))
            .map(|r| r.date)
            .collect();
        dups.sort();
        dups.dedup();
        dups
    }

    /// Append without the duplicate-date check. Callers validate first.
    pub(crate) fn push(&mut self, row: Observation) {
        self.rows.push(row);
    }
}

fn validate_series(series: &[String]) -> Result<(), TableError> {
    if series.is_empty() {
        return Err(TableError::schema(None, "No rate series columns."));
    }
    let mut seen = HashSet::new();
    for name in series {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(TableError::schema(None, "Empty rate series name."));
        }
        if trimmed.eq_ignore_ascii_case("date") {
            return Err(TableError::schema(None, "`date` cannot be used as a rate series name."));
        }
        if !seen.insert(trimmed) {
            return Err(TableError::schema(None, format!("Duplicate rate series `{trimmed}`.")));
        }
    }
    Ok(())
}

/// Bucket size used when resampling the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Every observation as-is.
    Raw,
    /// Calendar day.
    Daily,
    /// ISO week (Monday..Sunday).
    Weekly,
    /// Calendar month.
    Monthly,
    /// Calendar year.
    Yearly,
}

impl Granularity {
    pub const ALL: [Granularity; 5] = [
        Granularity::Raw,
        Granularity::Daily,
        Granularity::Weekly,
        Granularity::Monthly,
        Granularity::Yearly,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Granularity::Raw => "raw",
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
            Granularity::Yearly => "yearly",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|g| *g == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|g| *g == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Calendar bucket an observation falls into.
///
/// Within one resampled series every key has the same variant, so the derived
/// ordering is plain chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketKey {
    Day(NaiveDate),
    Week { iso_year: i32, week: u32 },
    Month { year: i32, month: u32 },
    Year(i32),
}

impl BucketKey {
    /// Bucket containing `date`. `Raw` and `Daily` both key by the date itself.
    pub fn for_date(granularity: Granularity, date: NaiveDate) -> Self {
        match granularity {
            Granularity::Raw | Granularity::Daily => BucketKey::Day(date),
            Granularity::Weekly => {
                let iso = date.iso_week();
                BucketKey::Week {
                    iso_year: iso.year(),
                    week: iso.week(),
                }
            }
            Granularity::Monthly => BucketKey::Month {
                year: date.year(),
                month: date.month(),
            },
            Granularity::Yearly => BucketKey::Year(date.year()),
        }
    }

    /// Last calendar day covered by the bucket (Sunday for weeks).
    pub fn period_end(&self) -> Option<NaiveDate> {
        match *self {
            BucketKey::Day(d) => Some(d),
            BucketKey::Week { iso_year, week } => NaiveDate::from_isoywd_opt(iso_year, week, Weekday::Sun),
            BucketKey::Month { year, month } => NaiveDate::from_ymd_opt(year, month, 1)
                .and_then(|d| d.checked_add_months(Months::new(1)))
                .and_then(|d| d.pred_opt()),
            BucketKey::Year(year) => NaiveDate::from_ymd_opt(year, 12, 31),
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKey::Day(d) => write!(f, "{d}"),
            BucketKey::Week { iso_year, week } => write!(f, "{iso_year}-W{week:02}"),
            BucketKey::Month { year, month } => write!(f, "{year}-{month:02}"),
            BucketKey::Year(year) => write!(f, "{year}"),
        }
    }
}

/// One bucket of a resampled series and the observation chosen for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub key: BucketKey,
    pub observation: Observation,
}

/// Resampled view of a table: buckets in ascending key order, empty buckets omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketedSeries {
    pub granularity: Granularity,
    pub series: Vec<String>,
    pub buckets: Vec<Bucket>,
}

impl BucketedSeries {
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Options for a single presenter pass.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    pub granularity: Granularity,
    pub trailing_rows: usize,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub export_csv: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}

/// Options for a single collector run.
#[derive(Debug, Clone)]
pub struct CollectConfig {
    pub table_path: PathBuf,
    pub date: NaiveDate,
    pub seed: Option<u64>,
}
