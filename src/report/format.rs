//! Formatted terminal output for a presenter pass.
//!
//! We keep formatting code in one place so:
//! - the resampling/summary code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::{Dashboard, NoData};
use crate::domain::Observation;
use crate::io::DataSource;

const LABEL_WIDTH: usize = 22;
const VALUE_WIDTH: usize = 10;

/// Latest rates, recent history, and the resampled series.
pub fn format_dashboard(dashboard: &Dashboard) -> String {
    let mut out = String::new();

    out.push_str("=== ratewatch - interest rate watch ===\n");
    out.push_str(&format_latest(dashboard));
    out.push('\n');

    out.push_str(&format!("Recent history (last {} rows):\n", dashboard.trailing.len()));
    out.push_str(&format_rows("date", &dashboard.series, dashboard.trailing.iter().map(|o| (o.date.to_string(), o))));
    out.push('\n');

    out.push_str(&format!(
        "Resampled ({}, {} buckets):\n",
        dashboard.bucketed.granularity.display_name(),
        dashboard.bucketed.len()
    ));
    out.push_str(&format_rows(
        "bucket",
        &dashboard.series,
        dashboard
            .bucketed
            .buckets
            .iter()
            .map(|b| (b.key.to_string(), &b.observation)),
    ));

    out
}

/// "Current rates (as of YYYY/MM/DD)" block.
pub fn format_latest(dashboard: &Dashboard) -> String {
    let mut out = format!("Current rates (as of {}):\n", dashboard.latest.date.format("%Y/%m/%d"));
    for name in &dashboard.series {
        out.push_str(&format!(
            "  {:<width$} {}\n",
            truncate(name, LABEL_WIDTH),
            fmt_rate(dashboard.latest.rate(name)),
            width = LABEL_WIDTH
        ));
    }
    out
}

/// The message shown when a pass has nothing to render.
pub fn format_no_data(no_data: &NoData, source: &DataSource) -> String {
    let mut out = String::from("No rate data could be loaded.\n");
    match no_data {
        NoData::Unavailable(err) => out.push_str(&format!("Reason: {err}\n")),
        NoData::Empty => out.push_str(&format!("Reason: {source} has a header but no rows.\n")),
    }
    out.push_str("Check that:\n");
    out.push_str(&format!(
        "  1. the source is correct ({source}); published sheets must use the CSV export URL\n"
    ));
    out.push_str("  2. the table is not empty and its first row is a header like `Date,BOJ (Policy),...`\n");
    out
}

fn format_rows<'a>(
    key_header: &str,
    series: &[String],
    rows: impl Iterator<Item = (String, &'a Observation)>,
) -> String {
    let mut out = String::new();

    let mut header = format!("{key_header:<12}");
    let mut rule = format!("{:-<12}", "");
    for name in series {
        header.push_str(&format!(" {:>width$}", truncate(name, VALUE_WIDTH + 6), width = VALUE_WIDTH + 6));
        rule.push_str(&format!(" {:->width$}", "", width = VALUE_WIDTH + 6));
    }
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(rule.trim_end());
    out.push('\n');

    for (key, obs) in rows {
        let mut line = format!("{key:<12}");
        for name in series {
            line.push_str(&format!(" {:>width$}", fmt_rate(obs.rate(name)), width = VALUE_WIDTH + 6));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

fn fmt_rate(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.3}%"),
        None => "-".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
