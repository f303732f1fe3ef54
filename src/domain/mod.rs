//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - rate observations and the accumulated table (`Observation`, `ObservationTable`)
//! - resampling selectors and outputs (`Granularity`, `BucketKey`, `BucketedSeries`)
//! - run configuration (`ViewConfig`, `CollectConfig`)

pub mod types;

pub use types::*;
