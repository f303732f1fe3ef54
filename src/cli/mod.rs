//! Command-line parsing for the rate watcher.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the table/resampling code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::Granularity;
use crate::io::DEFAULT_FETCH_TIMEOUT;
use crate::series::summary::DEFAULT_TRAILING_ROWS;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ratewatch", version, about = "Daily interest-rate watch (policy + bank posted rates)")]
pub struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record today's rates, skipping the run if the date is already present.
    Collect(CollectArgs),
    /// Load the table and print latest rates, recent history, and the resampled series.
    Show(ShowArgs),
    /// Launch the interactive dashboard.
    ///
    /// Uses the same presenter pass as `ratewatch show`, rendered with Ratatui.
    Tui(SourceArgs),
}

/// Options for a collector run.
#[derive(Debug, Parser, Clone)]
pub struct CollectArgs {
    /// Table CSV to append to (default: $RATEWATCH_TABLE or interest_rate_history.csv).
    #[arg(short = 't', long, value_name = "CSV")]
    pub table: Option<PathBuf>,

    /// Observation date (YYYY-MM-DD); defaults to today in local time.
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Seed for the stand-in rate feed.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Where to load the table from and how to view it.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Table path or published CSV URL (default: $RATEWATCH_SOURCE or interest_rate_history.csv).
    #[arg(short = 's', long, value_name = "PATH|URL")]
    pub source: Option<String>,

    /// Resampling granularity.
    #[arg(short = 'g', long, value_enum, default_value_t = Granularity::Daily)]
    pub granularity: Granularity,

    /// Number of recent rows in the history table.
    #[arg(short = 'k', long, default_value_t = DEFAULT_TRAILING_ROWS)]
    pub trailing: usize,

    /// Remote fetch timeout (seconds).
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT.as_secs())]
    pub timeout: u64,
}

/// Options for a printed presenter pass.
#[derive(Debug, Parser, Clone)]
pub struct ShowArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Skip the ASCII chart of the resampled series.
    #[arg(long)]
    pub no_plot: bool,

    /// Chart width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Chart height (rows).
    #[arg(long, default_value_t = 16)]
    pub height: usize,

    /// Export the resampled series to CSV.
    #[arg(long = "export-csv", value_name = "CSV")]
    pub export_csv: Option<PathBuf>,

    /// Export the full dashboard (latest, history, buckets) to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}
