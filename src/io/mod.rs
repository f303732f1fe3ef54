//! Input/output helpers.
//!
//! - persisted table CSV codec (`table`)
//! - table loading from a file or URL (`load`)
//! - exports of a presenter pass (`export`)

pub mod export;
pub mod load;
pub mod table;

pub use export::*;
pub use load::*;
pub use table::*;
