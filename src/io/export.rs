//! Exports of a presenter pass.
//!
//! - bucketed series as CSV, easy to consume in spreadsheets
//! - the whole dashboard as pretty JSON

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::app::pipeline::Dashboard;
use crate::domain::BucketedSeries;
use crate::error::AppError;

/// Write the bucketed series as CSV: `bucket,period_end,date,<series...>`.
pub fn write_bucketed_csv<W: Write>(writer: W, series: &BucketedSeries) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);

    let mut header = vec!["bucket".to_string(), "period_end".to_string(), "date".to_string()];
    header.extend(series.series.iter().cloned());
    out.write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for bucket in &series.buckets {
        let obs = &bucket.observation;
        let mut record = vec![
            bucket.key.to_string(),
            bucket.key.period_end().map(|d| d.to_string()).unwrap_or_default(),
            obs.date.to_string(),
        ];
        record.extend(
            series
                .series
                .iter()
                .map(|name| obs.rate(name).map(|v| v.to_string()).unwrap_or_default()),
        );
        out.write_record(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

pub fn write_bucketed_csv_file(path: &Path, series: &BucketedSeries) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_bucketed_csv(file, series)
}

/// Write a dashboard as pretty JSON.
pub fn write_dashboard_json(path: &Path, dashboard: &Dashboard) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create dashboard JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, dashboard)
        .map_err(|e| AppError::new(2, format!("Failed to write dashboard JSON: {e}")))?;

    Ok(())
}
