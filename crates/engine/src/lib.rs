//! `tabula-engine` — lazy table blueprint engine for clinical summary tables.
//!
//! Pure engine crate: receives an in-memory data frame plus a declarative
//! table spec, produces a sparsely-populated [`Blueprint`] whose cells hold
//! computation recipes resolved on demand. No rendering or CLI dependencies.

pub mod blueprint;
pub mod cell;
pub mod classify;
pub mod dimension;
pub mod dispatch;
pub mod error;
pub mod eval;
pub mod frame;
pub mod grid;
pub mod options;
pub mod registry;

pub use blueprint::Blueprint;
pub use cell::{Cell, DataSelector, Subset};
pub use classify::VarKind;
pub use dimension::{analyze, DimensionPlan, RowKind};
pub use error::EngineError;
pub use eval::{CellDiagnostic, EvalCache};
pub use frame::{Column, DataFrame, Datum};
pub use options::{TableOptions, TableSpec};
pub use registry::Registry;
