//! `tabula-stats` — statistical tests for grouped clinical data.
//!
//! Pure computation crate: receives numeric group slices or contingency
//! tables, returns p-values. No table, rendering, or IO dependencies.

pub mod categorical;
pub mod continuous;
pub mod describe;
pub mod error;

pub use categorical::ContingencyTable;
pub use error::StatError;
