//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and `.env` defaults
//! - installs logging
//! - runs the collector or a presenter pass
//! - prints reports/charts and writes optional exports

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{CollectArgs, Command, ShowArgs, SourceArgs};
use crate::collect::{CollectStatus, Collected, DummySource, RateSource, collect};
use crate::domain::{CollectConfig, ObservationTable, ViewConfig};
use crate::error::{AppError, TableError};
use crate::io::{DataSource, Loader, TableLoader, read_table_file, write_table_file};

pub mod pipeline;

use pipeline::{NoData, Presentation};

/// Table file used when neither a flag nor the environment names one.
pub const DEFAULT_TABLE_FILE: &str = "interest_rate_history.csv";

const ENV_SOURCE: &str = "RATEWATCH_SOURCE";
const ENV_TABLE: &str = "RATEWATCH_TABLE";

/// Entry point for the `ratewatch` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    // The dashboard owns the terminal; log lines would corrupt the alternate screen.
    if !matches!(cli.command, Command::Tui(_)) {
        init_tracing(cli.verbose);
    }

    match cli.command {
        Command::Collect(args) => handle_collect(args),
        Command::Show(args) => handle_show(args),
        Command::Tui(args) => handle_tui(args),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_collect(args: CollectArgs) -> Result<(), AppError> {
    let config = collect_config_from_args(&args);
    let collected = run_collect(&config)?;
    match collected.status {
        CollectStatus::Appended => println!(
            "Recorded {} in {} ({} rows).",
            config.date,
            config.table_path.display(),
            collected.table.len()
        ),
        CollectStatus::SkippedDuplicate => println!("{} is already recorded; skipped.", config.date),
    }
    Ok(())
}

/// One collector run: fetch, append unless the date is recorded, persist.
///
/// A missing table file starts a new table with the feed's series. The file
/// is only rewritten when a row was appended.
pub fn run_collect(config: &CollectConfig) -> Result<Collected, AppError> {
    let mut source = DummySource::new(config.seed);
    let observation = source.fetch(config.date)?;

    let table = if config.table_path.exists() {
        read_table_file(&config.table_path)?
    } else {
        info!(path = %config.table_path.display(), "no existing table; starting a new one");
        ObservationTable::new(DummySource::series())?
    };

    let collected = collect(table, observation)?;
    if collected.status == CollectStatus::Appended {
        write_table_file(&config.table_path, &collected.table)?;
    }
    Ok(collected)
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let config = view_config_from_args(&args);
    let loader = loader_from_args(&args.source)?;

    let presentation = pipeline::present(loader.load(), config.granularity, config.trailing_rows);
    let dashboard = match presentation {
        Presentation::Ready(dashboard) => dashboard,
        Presentation::NoData(no_data) => return Err(no_data_error(no_data, loader.source())),
    };

    println!("{}", crate::report::format_dashboard(&dashboard));

    if config.plot {
        let plot = crate::plot::render_ascii_chart(&dashboard.bucketed, config.plot_width, config.plot_height);
        println!("{plot}");
    }

    if let Some(path) = &config.export_csv {
        crate::io::export::write_bucketed_csv_file(path, &dashboard.bucketed)?;
    }
    if let Some(path) = &config.export_json {
        crate::io::export::write_dashboard_json(path, &dashboard)?;
    }

    Ok(())
}

/// The no-data report as the run's error: exit code from the table error,
/// message with the reason and the hints (printed once, by `main`).
fn no_data_error(no_data: NoData, source: &DataSource) -> AppError {
    let message = crate::report::format_no_data(&no_data, source);
    let err: AppError = match no_data {
        NoData::Unavailable(err) => err.into(),
        NoData::Empty => TableError::EmptyTable.into(),
    };
    AppError::new(err.exit_code(), message.trim_end())
}

fn handle_tui(args: SourceArgs) -> Result<(), AppError> {
    let loader = loader_from_args(&args)?;
    crate::tui::run(loader, args.granularity, args.trailing)
}

pub fn view_config_from_args(args: &ShowArgs) -> ViewConfig {
    ViewConfig {
        granularity: args.source.granularity,
        trailing_rows: args.source.trailing,
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_csv: args.export_csv.clone(),
        export_json: args.export_json.clone(),
    }
}

pub fn collect_config_from_args(args: &CollectArgs) -> CollectConfig {
    CollectConfig {
        table_path: args
            .table
            .clone()
            .unwrap_or_else(|| PathBuf::from(env_or_default(ENV_TABLE))),
        date: args.date.unwrap_or_else(|| chrono::Local::now().date_naive()),
        seed: args.seed,
    }
}

fn loader_from_args(args: &SourceArgs) -> Result<Loader, AppError> {
    let raw = args.source.clone().unwrap_or_else(|| env_or_default(ENV_SOURCE));
    let source = DataSource::parse(&raw)?;
    Ok(Loader::new(source, Duration::from_secs(args.timeout.max(1))))
}

fn env_or_default(key: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TABLE_FILE.to_string())
}

/// Rewrite argv so `ratewatch` defaults to `ratewatch show`.
///
/// Rules:
/// - `ratewatch`                      -> `ratewatch show`
/// - `ratewatch -g weekly ...`        -> `ratewatch show -g weekly ...`
/// - `ratewatch --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("show".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "collect" | "show" | "tui");
    if is_subcommand {
        return argv;
    }

    // Global flags may precede an explicit subcommand (`ratewatch -v collect`).
    let first_non_global = argv[1..]
        .iter()
        .find(|a| !matches!(a.as_str(), "-v" | "--verbose"));
    if first_non_global.is_some_and(|a| matches!(a.as_str(), "collect" | "show" | "tui" | "help")) {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "show".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_show() {
        assert_eq!(rewrite_args(argv(&["ratewatch"])), argv(&["ratewatch", "show"]));
        assert_eq!(rewrite_args(argv(&["ratewatch", "-v"])), argv(&["ratewatch", "show", "-v"]));
        assert_eq!(
            rewrite_args(argv(&["ratewatch", "-v", "-g", "weekly"])),
            argv(&["ratewatch", "show", "-v", "-g", "weekly"])
        );
        assert_eq!(
            rewrite_args(argv(&["ratewatch", "-g", "weekly"])),
            argv(&["ratewatch", "show", "-g", "weekly"])
        );
    }

    #[test]
    fn subcommands_and_help_are_untouched() {
        let cases: [&[&str]; 5] = [
            &["ratewatch", "collect"],
            &["ratewatch", "--help"],
            &["ratewatch", "tui", "-g", "yearly"],
            &["ratewatch", "-v", "collect"],
            &["ratewatch", "--verbose", "tui"],
        ];
        for args in cases {
            assert_eq!(rewrite_args(argv(args)), argv(args));
        }
    }

    #[test]
    fn show_args_map_to_view_config() {
        let cli = crate::cli::Cli::parse_from(argv(&[
            "ratewatch", "show", "-g", "monthly", "-k", "3", "--no-plot", "--export-csv", "out.csv",
        ]));
        let Command::Show(args) = cli.command else {
            panic!("expected show");
        };
        assert_eq!(args.source.timeout, crate::io::DEFAULT_FETCH_TIMEOUT.as_secs());
        let config = view_config_from_args(&args);
        assert_eq!(config.granularity, crate::domain::Granularity::Monthly);
        assert_eq!(config.trailing_rows, 3);
        assert!(!config.plot);
        assert_eq!(config.export_csv, Some(PathBuf::from("out.csv")));
    }

    #[test]
    fn collect_args_keep_explicit_table_and_date() {
        let cli = crate::cli::Cli::parse_from(argv(&[
            "ratewatch", "collect", "--table", "rates.csv", "--date", "2024-03-01", "--seed", "9",
        ]));
        let Command::Collect(args) = cli.command else {
            panic!("expected collect");
        };
        let config = collect_config_from_args(&args);
        assert_eq!(config.table_path, PathBuf::from("rates.csv"));
        assert_eq!(config.date, chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn global_flag_before_subcommand_parses() {
        let cli = crate::cli::Cli::try_parse_from(rewrite_args(argv(&["ratewatch", "-v", "collect"]))).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Collect(_)));
    }

    #[test]
    fn collect_run_persists_once_per_date() {
        let dir = std::env::temp_dir().join(format!("rate_watch_collect_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let config = CollectConfig {
            table_path: dir.join("history.csv"),
            date: chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            seed: Some(7),
        };

        let first = run_collect(&config).unwrap();
        assert_eq!(first.status, CollectStatus::Appended);
        let after_first = std::fs::read(&config.table_path).unwrap();

        let second = run_collect(&config).unwrap();
        let after_second = std::fs::read(&config.table_path).unwrap();
        let stored = read_table_file(&config.table_path).unwrap();
        let _ = std::fs::remove_dir_all(&dir);

        assert_eq!(second.status, CollectStatus::SkippedDuplicate);
        assert_eq!(after_first, after_second);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored.series(), DummySource::series().as_slice());
    }

    #[test]
    fn no_data_error_reports_reason_once() {
        let source = DataSource::File(PathBuf::from("rates.csv"));

        let empty = no_data_error(NoData::Empty, &source);
        assert_eq!(empty.exit_code(), 3);
        assert_eq!(empty.to_string().matches("Reason:").count(), 1);

        let failed = no_data_error(
            NoData::Unavailable(TableError::load_failure("rates.csv", "Failed to open")),
            &source,
        );
        assert_eq!(failed.exit_code(), 4);
        assert_eq!(failed.to_string().matches("Failed to open").count(), 1);
    }
}
