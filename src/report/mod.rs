//! Plain-text rendering of a presenter pass.

pub mod format;

pub use format::*;
