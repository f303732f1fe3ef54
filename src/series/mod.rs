//! Derived views over an observation table.
//!
//! - calendar-bucket resampling (`resample`)
//! - latest observation and trailing window (`summary`)

pub mod resample;
pub mod summary;

pub use resample::resample;
pub use summary::{latest, trailing};
