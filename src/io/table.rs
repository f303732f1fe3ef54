//! CSV codec for the persisted rate table.
//!
//! Layout: a header naming `Date` plus one column per rate series, then one
//! row per observation. Values are plain decimals (percent implied).
//!
//! Decoding is strict: a single bad row fails the whole table, since a
//! partially populated observation must never reach the derived views.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;

use crate::domain::{Observation, ObservationTable};
use crate::error::{AppError, TableError};

/// Header used for the date column when writing.
pub const DATE_COLUMN: &str = "Date";

/// Decode a table from CSV. `origin` names the source in error messages.
pub fn read_table<R: Read>(reader: R, origin: &str) -> Result<ObservationTable, TableError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| TableError::load_failure(origin, format!("Failed to read CSV headers: {e}")))?
        .clone();

    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(TableError::load_failure(origin, "Empty result (no header row)."));
    }

    let header_map = build_header_map(&headers);
    let date_idx = *header_map
        .get("date")
        .ok_or_else(|| TableError::schema(Some(1), "Missing required column: `date`"))?;

    let series: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != date_idx)
        .map(|(idx, name)| (idx, clean_header_name(name).to_string()))
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header, and lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| TableError::schema(Some(line), format!("CSV parse error: {e}")))?;
        if record.len() != headers.len() {
            return Err(TableError::schema(
                Some(line),
                format!("Expected {} fields, found {}.", headers.len(), record.len()),
            ));
        }
        rows.push(parse_row(&record, date_idx, &series).map_err(|msg| TableError::schema(Some(line), msg))?);
    }

    ObservationTable::from_rows(series.into_iter().map(|(_, name)| name), rows)
}

/// Decode a table from a local CSV file.
pub fn read_table_file(path: &Path) -> Result<ObservationTable, TableError> {
    let origin = path.display().to_string();
    let file = File::open(path).map_err(|e| TableError::load_failure(&origin, format!("Failed to open: {e}")))?;
    read_table(file, &origin)
}

/// Encode a table as CSV, rows in stored order.
pub fn write_table<W: Write>(writer: W, table: &ObservationTable) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);

    let mut header = vec![DATE_COLUMN.to_string()];
    header.extend(table.series().iter().cloned());
    out.write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write table header: {e}")))?;

    for row in table.rows() {
        let mut record = vec![row.date.format("%Y-%m-%d").to_string()];
        for name in table.series() {
            let value = row
                .rate(name)
                .ok_or_else(|| AppError::new(2, format!("Row {} is missing `{name}`.", row.date)))?;
            record.push(value.to_string());
        }
        out.write_record(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write table row: {e}")))?;
    }

    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush table: {e}")))?;
    Ok(())
}

/// Encode a table to a CSV file, replacing any previous content.
///
/// The table is written to a sibling temp file and renamed over `path`, so a
/// failed write leaves the previous table untouched.
pub fn write_table_file(path: &Path, table: &ObservationTable) -> Result<(), AppError> {
    let tmp = temp_sibling(path);
    let written = File::create(&tmp)
        .map_err(|e| AppError::new(2, format!("Failed to create table '{}': {e}", tmp.display())))
        .and_then(|mut file| {
            write_table(&mut file, table)?;
            file.sync_all()
                .map_err(|e| AppError::new(2, format!("Failed to sync table '{}': {e}", tmp.display())))
        })
        .and_then(|()| {
            fs::rename(&tmp, path)
                .map_err(|e| AppError::new(2, format!("Failed to replace table '{}': {e}", path.display())))
        });

    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    written
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table.csv".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (clean_header_name(name).to_ascii_lowercase(), idx))
        .collect()
}

fn clean_header_name(name: &str) -> &str {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}')
}

fn parse_row(record: &StringRecord, date_idx: usize, series: &[(usize, String)]) -> Result<Observation, String> {
    let raw_date = record
        .get(date_idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "Missing required value: `date`".to_string())?;
    let date = parse_date(raw_date)?;

    let mut rates = Vec::with_capacity(series.len());
    for (idx, name) in series {
        let raw = record
            .get(*idx)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("Missing value for `{name}`."))?;
        let value = raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("Invalid numeric value '{raw}' for `{name}`."))?;
        rates.push((name.clone(), value));
    }

    Ok(Observation::new(date, rates))
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const DATE_FMTS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    // Exports that went through a dataframe sometimes carry a midnight timestamp.
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.date());
    }
    Err(format!("Invalid date '{s}'. Expected YYYY-MM-DD."))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\u{feff}Date,BOJ (Policy),MUFG (Variable)\n\
                          2024-01-02,0.5,2.475\n\
                          2024-01-01,0.25,2.475\n";

    #[test]
    fn reads_series_in_header_order() {
        let table = read_table(SAMPLE.as_bytes(), "sample").unwrap();
        assert_eq!(table.series(), ["BOJ (Policy)", "MUFG (Variable)"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1].rate("BOJ (Policy)"), Some(0.25));
    }

    #[test]
    fn header_only_is_an_empty_table() {
        let table = read_table("Date,BOJ\n".as_bytes(), "sample").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.series(), ["BOJ"]);
    }

    #[test]
    fn empty_input_is_a_load_failure() {
        let err = read_table("".as_bytes(), "sample").unwrap_err();
        assert!(matches!(err, TableError::LoadFailure { .. }));
    }

    #[test]
    fn missing_value_fails_with_line_number() {
        let err = read_table("Date,BOJ,MUFG\n2024-01-01,0.5,2.4\n2024-01-02,,2.4\n".as_bytes(), "s").unwrap_err();
        assert_eq!(
            err,
            TableError::schema(Some(3), "Missing value for `BOJ`.")
        );
    }

    #[test]
    fn non_numeric_value_fails() {
        let err = read_table("Date,BOJ\n2024-01-01,abc\n".as_bytes(), "s").unwrap_err();
        assert!(matches!(err, TableError::SchemaViolation { line: Some(2), .. }));
    }

    #[test]
    fn short_row_fails() {
        let err = read_table("Date,BOJ,MUFG\n2024-01-01,0.5\n".as_bytes(), "s").unwrap_err();
        assert!(matches!(err, TableError::SchemaViolation { line: Some(2), .. }));
    }

    #[test]
    fn missing_date_column_fails() {
        let err = read_table("Day,BOJ\n2024-01-01,0.5\n".as_bytes(), "s").unwrap_err();
        assert!(matches!(err, TableError::SchemaViolation { line: Some(1), .. }));
    }

    #[test]
    fn accepts_slash_dates_and_timestamps() {
        let table = read_table("date,BOJ\n2024/01/05,0.5\n2024-01-06 00:00:00,0.5\n".as_bytes(), "s").unwrap();
        let dates: Vec<_> = table.rows().iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 6).unwrap()
            ]
        );
    }

    #[test]
    fn write_then_read_preserves_rows() {
        let table = read_table(SAMPLE.as_bytes(), "sample").unwrap();
        let mut buf = Vec::new();
        write_table(&mut buf, &table).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("Date,BOJ (Policy),MUFG (Variable)\n2024-01-02,0.5,2.475\n"));
        assert_eq!(read_table(buf.as_slice(), "buf").unwrap(), table);
    }

    #[test]
    fn file_round_trip() {
        let path = std::env::temp_dir().join(format!("rate_watch_table_{}.csv", std::process::id()));
        let table = read_table(SAMPLE.as_bytes(), "sample").unwrap();
        write_table_file(&path, &table).unwrap();
        let back = read_table_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(back, table);
    }

    #[test]
    fn rewrite_leaves_no_temp_file_behind() {
        let path = std::env::temp_dir().join(format!("rate_watch_rewrite_{}.csv", std::process::id()));
        let table = read_table(SAMPLE.as_bytes(), "sample").unwrap();
        write_table_file(&path, &table).unwrap();
        write_table_file(&path, &table).unwrap();
        let tmp_exists = temp_sibling(&path).exists();
        let back = read_table_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(!tmp_exists);
        assert_eq!(back, table);
    }

    #[test]
    fn failed_rewrite_keeps_previous_table() {
        let path = std::env::temp_dir().join(format!("rate_watch_keep_{}.csv", std::process::id()));
        std::fs::write(&path, SAMPLE).unwrap();

        // A directory squatting on the temp path makes the write fail up front.
        let tmp = temp_sibling(&path);
        std::fs::create_dir_all(&tmp).unwrap();

        let table = ObservationTable::new(["BOJ (Policy)"]).unwrap();
        let result = write_table_file(&path, &table);
        let contents = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_dir_all(&tmp);
        let _ = std::fs::remove_file(&path);

        assert!(result.is_err());
        assert_eq!(contents, SAMPLE);
    }

    #[test]
    fn missing_file_is_a_load_failure() {
        let path = std::env::temp_dir().join("rate_watch_definitely_missing.csv");
        let err = read_table_file(&path).unwrap_err();
        assert!(matches!(err, TableError::LoadFailure { .. }));
    }
}
