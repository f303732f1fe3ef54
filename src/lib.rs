//! `rate-watch` library crate.
//!
//! The binary (`ratewatch`) is a thin wrapper around this library so that:
//!
//! - the collector and presenter logic is testable without spawning processes
//! - the table, resampling, and summary code can back other front ends
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod collect;
pub mod domain;
pub mod error;
pub mod io;
pub mod plot;
pub mod report;
pub mod series;
pub mod tui;
