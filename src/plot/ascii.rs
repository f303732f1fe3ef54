//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Each rate series is drawn as a step line (value holds until the next
//! bucket) using its own marker character; a legend follows the grid.

use chrono::{Datelike, NaiveDate};

use crate::domain::{Bucket, BucketedSeries};

const MARKERS: [char; 6] = ['*', '+', 'x', 'o', '#', '@'];

/// Render the bucketed series as a step chart.
pub fn render_ascii_chart(series: &BucketedSeries, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let lines: Vec<Vec<(i64, f64)>> = series
        .series
        .iter()
        .map(|name| {
            series
                .buckets
                .iter()
                .filter_map(|b| b.observation.rate(name).map(|v| (bucket_day(b), v)))
                .collect()
        })
        .collect();

    let (x_min, x_max) = x_range(&lines).unwrap_or((0, 1));
    let (y_min, y_max) = y_range(&lines).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    for (idx, points) in lines.iter().enumerate() {
        let marker = MARKERS[idx % MARKERS.len()];
        draw_steps(&mut grid, points, marker, (x_min, x_max), (y_min, y_max));
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Chart: {} | {} .. {} | rate=[{y_min:.3}, {y_max:.3}]%\n",
        series.granularity.display_name(),
        day_label(x_min),
        day_label(x_max),
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    let legend: Vec<String> = series
        .series
        .iter()
        .enumerate()
        .map(|(idx, name)| format!("{} {name}", MARKERS[idx % MARKERS.len()]))
        .collect();
    out.push_str(&format!("  {}\n", legend.join("   ")));

    out
}

/// X position of a bucket: the end of its period, in days since CE.
fn bucket_day(bucket: &Bucket) -> i64 {
    let date = bucket.key.period_end().unwrap_or(bucket.observation.date);
    i64::from(date.num_days_from_ce())
}

fn day_label(day: i64) -> String {
    i32::try_from(day)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn x_range(lines: &[Vec<(i64, f64)>]) -> Option<(i64, i64)> {
    let xs = lines.iter().flatten().map(|&(x, _)| x);
    let min = xs.clone().min()?;
    let max = xs.max()?;
    Some((min, max))
}

fn y_range(lines: &[Vec<(i64, f64)>]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &(_, y) in lines.iter().flatten() {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    if min_y.is_finite() && max_y.is_finite() {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    // Flat series still need a visible band around the line.
    let pad = if span < 1e-9 { 0.05 } else { span * frac };
    (min - pad, max + pad)
}

fn map_x(x: i64, x_range: (i64, i64), width: usize) -> usize {
    let (x_min, x_max) = x_range;
    if x_max <= x_min {
        return (width - 1) / 2;
    }
    let u = ((x - x_min) as f64 / (x_max - x_min) as f64).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_range: (f64, f64), height: usize) -> usize {
    let (y_min, y_max) = y_range;
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_steps(grid: &mut [Vec<char>], points: &[(i64, f64)], marker: char, x_range: (i64, i64), y_range: (f64, f64)) {
    let height = grid.len();
    let width = grid[0].len();

    let cells: Vec<(usize, usize)> = points
        .iter()
        .map(|&(x, y)| (map_x(x, x_range, width), map_y(y, y_range, height)))
        .collect();

    // Step-after: hold the previous value until the next bucket, then jump.
    for pair in cells.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        for x in x0.min(x1)..=x0.max(x1) {
            put_if_blank(grid, x, y0, marker);
        }
        for y in y0.min(y1)..=y0.max(y1) {
            put_if_blank(grid, x1, y, marker);
        }
    }

    // Bucket points always win over other series' lines.
    for &(x, y) in &cells {
        grid[y][x] = marker;
    }
}

fn put_if_blank(grid: &mut [Vec<char>], x: usize, y: usize, ch: char) {
    if let Some(cell) = grid.get_mut(y).and_then(|row| row.get_mut(x)) {
        if *cell == ' ' {
            *cell = ch;
        }
    }
}
