//! Ratatui-based dashboard.
//!
//! Shows the latest rates, a step chart of the resampled series, and the
//! recent history table. Load results are cached; `r` forces a reload.

use std::io;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, Wrap},
};

use crate::app::pipeline::{Dashboard, Presentation, present};
use crate::domain::Granularity;
use crate::error::AppError;
use crate::io::Loader;

pub mod cache;
mod plotters_chart;

use cache::{DEFAULT_CACHE_TTL, TableCache};
use plotters_chart::{PALETTE, RatePlottersChart};

/// Start the TUI.
pub fn run(loader: Loader, granularity: Granularity, trailing_rows: usize) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(loader, granularity, trailing_rows);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    cache: TableCache<Loader>,
    granularity: Granularity,
    trailing_rows: usize,
    status: String,
    presentation: Presentation,
}

impl App {
    fn new(loader: Loader, granularity: Granularity, trailing_rows: usize) -> Self {
        let mut cache = TableCache::new(loader, DEFAULT_CACHE_TTL);
        let presentation = present(cache.get(), granularity, trailing_rows);
        let mut app = Self {
            cache,
            granularity,
            trailing_rows,
            status: String::new(),
            presentation,
        };
        app.status = app.load_status();
        app
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        let mut last_draw = Instant::now();
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
                last_draw = Instant::now();
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))? {
                // Keep the footer's load age ticking.
                needs_redraw = last_draw.elapsed() >= Duration::from_secs(1);
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the app should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Right | KeyCode::Char('g') => {
                self.granularity = self.granularity.next();
                self.repaint();
                self.status = format!("granularity: {}", self.granularity.display_name());
            }
            KeyCode::Left | KeyCode::Char('G') => {
                self.granularity = self.granularity.prev();
                self.repaint();
                self.status = format!("granularity: {}", self.granularity.display_name());
            }
            KeyCode::Up | KeyCode::Char('+') => {
                self.trailing_rows = self.trailing_rows.saturating_add(1);
                self.repaint();
                self.status = format!("history rows: {}", self.trailing_rows);
            }
            KeyCode::Down | KeyCode::Char('-') => {
                self.trailing_rows = self.trailing_rows.saturating_sub(1);
                self.repaint();
                self.status = format!("history rows: {}", self.trailing_rows);
            }
            KeyCode::Char('r') => {
                self.cache.invalidate();
                self.repaint();
                self.status = format!("Reloaded. {}", self.load_status());
            }
            _ => {}
        }
        false
    }

    /// Re-run the presenter pass against the (possibly cached) table.
    fn repaint(&mut self) {
        self.presentation = present(self.cache.get(), self.granularity, self.trailing_rows);
    }

    fn load_status(&self) -> String {
        load_status(&self.presentation)
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        match &self.presentation {
            Presentation::Ready(dash) => self.draw_body(frame, chunks[1], dash),
            Presentation::NoData(no_data) => {
                let msg = crate::report::format_no_data(no_data, self.cache.loader().source());
                let p = Paragraph::new(msg)
                    .style(Style::default().fg(Color::Yellow))
                    .wrap(Wrap { trim: false })
                    .block(Block::default().title("No data").borders(Borders::ALL));
                frame.render_widget(p, chunks[1]);
            }
        }
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();

        match &self.presentation {
            Presentation::Ready(dash) => {
                lines.push(Line::from(vec![
                    Span::styled("ratewatch", Style::default().fg(Color::Cyan)),
                    Span::raw(format!(" current rates (as of {})", dash.latest.date.format("%Y/%m/%d"))),
                ]));
                let mut spans = Vec::new();
                for (idx, name) in dash.series.iter().enumerate() {
                    let value = dash
                        .latest
                        .rate(name)
                        .map(|v| format!("{v:.3}%"))
                        .unwrap_or_else(|| "-".to_string());
                    spans.push(Span::styled(format!("{name}: "), Style::default().fg(palette_color(idx))));
                    spans.push(Span::styled(value, Style::default().add_modifier(Modifier::BOLD)));
                    spans.push(Span::raw("   "));
                }
                lines.push(Line::from(spans));
            }
            Presentation::NoData(_) => {
                lines.push(Line::from(vec![
                    Span::styled("ratewatch", Style::default().fg(Color::Cyan)),
                    Span::raw(" no data"),
                ]));
            }
        }

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect, dash: &Dashboard) {
        let table_height = (dash.trailing.len() as u16).saturating_add(3);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(table_height)])
            .split(area);

        self.draw_chart(frame, chunks[0], dash);
        self.draw_history(frame, chunks[1], dash);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect, dash: &Dashboard) {
        let mut title = vec![Span::raw(format!("Rate history ({}) ", self.granularity.display_name()))];
        for (idx, name) in dash.series.iter().enumerate() {
            title.push(Span::styled(format!("■ {name} "), Style::default().fg(palette_color(idx))));
        }

        let block = Block::default().title(Line::from(title)).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let (lines, x_bounds, y_bounds) = chart_series(dash);
        let widget = RatePlottersChart {
            lines: &lines,
            x_bounds,
            y_bounds,
            fmt_x: fmt_axis_date,
            fmt_y: fmt_axis_rate,
        };
        frame.render_widget(widget, inner);
    }

    fn draw_history(&self, frame: &mut ratatui::Frame<'_>, area: Rect, dash: &Dashboard) {
        let header = Row::new(std::iter::once("date".to_string()).chain(dash.series.iter().cloned()))
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

        let rows = dash.trailing.iter().map(|obs| {
            let cells = std::iter::once(obs.date.to_string()).chain(
                dash.series
                    .iter()
                    .map(|name| obs.rate(name).map(|v| format!("{v:.3}%")).unwrap_or_default()),
            );
            Row::new(cells)
        });

        let widths: Vec<Constraint> = std::iter::once(Constraint::Length(12))
            .chain(dash.series.iter().map(|_| Constraint::Min(8)))
            .collect();

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().title("Recent history").borders(Borders::ALL));
        frame.render_widget(table, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "←/→ granularity  ↑/↓ history rows  r reload  q quit";
        let mut spans = vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ];
        if let Some(at) = self.cache.loaded_at() {
            spans.push(Span::raw(" | "));
            spans.push(Span::styled(fmt_age(at.elapsed()), Style::default().fg(Color::Gray)));
        }
        let line = Line::from(spans);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn palette_color(idx: usize) -> Color {
    let (r, g, b) = PALETTE[idx % PALETTE.len()];
    Color::Rgb(r, g, b)
}

/// Step-after lines per series plus padded bounds, x in days since CE.
fn chart_series(dash: &Dashboard) -> (Vec<Vec<(f64, f64)>>, [f64; 2], [f64; 2]) {
    use chrono::Datelike;

    let lines: Vec<Vec<(f64, f64)>> = dash
        .series
        .iter()
        .map(|name| {
            let points: Vec<(f64, f64)> = dash
                .bucketed
                .buckets
                .iter()
                .filter_map(|b| {
                    let date = b.key.period_end().unwrap_or(b.observation.date);
                    b.observation
                        .rate(name)
                        .map(|v| (f64::from(date.num_days_from_ce()), v))
                })
                .collect();
            step_points(&points)
        })
        .collect();

    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(x, y) in lines.iter().flatten() {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }

    if !x_min.is_finite() || !x_max.is_finite() {
        x_min = 0.0;
        x_max = 1.0;
    }
    if x_max <= x_min {
        x_min -= 1.0;
        x_max += 1.0;
    }
    if !y_min.is_finite() || !y_max.is_finite() {
        y_min = 0.0;
        y_max = 1.0;
    }

    let span = y_max - y_min;
    let pad = if span < 1e-9 { 0.05 } else { span * 0.05 };

    (lines, [x_min, x_max], [y_min - pad, y_max + pad])
}

/// Expand points into a step-after polyline: each value holds until the next x.
fn step_points(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut out = Vec::with_capacity(points.len() * 2);
    for (i, &(x, y)) in points.iter().enumerate() {
        if i > 0 {
            let prev_y = points[i - 1].1;
            out.push((x, prev_y));
        }
        out.push((x, y));
    }
    out
}

fn load_status(presentation: &Presentation) -> String {
    match presentation {
        Presentation::Ready(dash) => format!(
            "{} {} buckets through {}",
            dash.bucketed.len(),
            dash.bucketed.granularity.display_name(),
            dash.latest.date
        ),
        Presentation::NoData(_) => "No data available.".to_string(),
    }
}

/// "loaded 42s ago" / "loaded 3m ago" for the footer.
fn fmt_age(age: Duration) -> String {
    let secs = age.as_secs();
    if secs < 60 {
        format!("loaded {secs}s ago")
    } else {
        format!("loaded {}m ago", secs / 60)
    }
}

fn fmt_axis_date(v: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(v.round() as i32)
        .map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_default()
}

fn fmt_axis_rate(v: f64) -> String {
    format!("{v:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::build_dashboard;
    use crate::domain::{Observation, ObservationTable};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn load_status_counts_buckets_not_rows() {
        let table = ObservationTable::from_rows(
            ["a"],
            vec![
                Observation::new(d(2024, 1, 3), [("a", 0.5)]),
                Observation::new(d(2024, 1, 20), [("a", 0.6)]),
                Observation::new(d(2024, 2, 1), [("a", 0.7)]),
            ],
        )
        .unwrap();
        let dash = build_dashboard(&table, Granularity::Monthly, 7).unwrap();
        assert_eq!(
            load_status(&Presentation::Ready(dash)),
            "2 monthly buckets through 2024-02-01"
        );
    }

    #[test]
    fn load_age_switches_to_minutes() {
        assert_eq!(fmt_age(Duration::from_secs(0)), "loaded 0s ago");
        assert_eq!(fmt_age(Duration::from_secs(59)), "loaded 59s ago");
        assert_eq!(fmt_age(Duration::from_secs(600)), "loaded 10m ago");
    }

    #[test]
    fn step_points_hold_previous_value() {
        let out = step_points(&[(0.0, 1.0), (2.0, 3.0), (5.0, 2.0)]);
        assert_eq!(
            out,
            vec![(0.0, 1.0), (2.0, 1.0), (2.0, 3.0), (5.0, 3.0), (5.0, 2.0)]
        );
        assert!(step_points(&[]).is_empty());
    }

    #[test]
    fn chart_bounds_cover_all_series() {
        let table = ObservationTable::from_rows(
            ["a", "b"],
            vec![
                Observation::new(d(2024, 1, 1), [("a", 0.5), ("b", 2.0)]),
                Observation::new(d(2024, 1, 9), [("a", 0.6), ("b", 2.5)]),
            ],
        )
        .unwrap();
        let dash = build_dashboard(&table, Granularity::Daily, 7).unwrap();
        let (lines, x_bounds, y_bounds) = chart_series(&dash);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 3);
        assert_eq!(x_bounds[1] - x_bounds[0], 8.0);
        assert!(y_bounds[0] < 0.5 && y_bounds[1] > 2.5);
        assert_eq!(fmt_axis_date(x_bounds[0]), "2024-01");
    }

    #[test]
    fn single_bucket_gets_a_non_degenerate_x_range() {
        let table = ObservationTable::from_rows(
            ["a"],
            vec![Observation::new(d(2024, 1, 1), [("a", 0.5)])],
        )
        .unwrap();
        let dash = build_dashboard(&table, Granularity::Yearly, 7).unwrap();
        let (_, x_bounds, y_bounds) = chart_series(&dash);
        assert!(x_bounds[1] > x_bounds[0]);
        assert!(y_bounds[1] > y_bounds[0]);
    }
}
