//! The cell model: one addressable table position.
//!
//! A cell is either a fixed string, a deferred computation recipe, or a
//! structural separator. Recipes are first-class closures built at
//! population time; they capture the summary function, test spec, or
//! category level they need and see only the resolved data subset.

use std::fmt;
use std::rc::Rc;

use crate::frame::Datum;

/// Computation recipe: resolved subset + decimal precision -> display
/// string. An `Err` is caught by the evaluator, never propagated.
pub type CellFn = Rc<dyn Fn(&Subset, u8) -> Result<String, String>>;

#[derive(Clone)]
pub enum Cell {
    /// Fixed display string (headers, labels).
    Literal(String),
    /// Deferred computation, evaluated on demand with per-table caching.
    Computation(ComputeCell),
    /// Structural marker (stratum break filler), no computation.
    Separator,
}

impl Cell {
    pub fn literal(s: impl Into<String>) -> Self {
        Cell::Literal(s.into())
    }
}

#[derive(Clone)]
pub struct ComputeCell {
    pub selector: DataSelector,
    pub compute: CellFn,
    /// Column names this recipe reads, reported in diagnostics.
    pub deps: Vec<String>,
    pub key: CacheKey,
}

/// Identifies a data subset: values of `variable` on rows matching every
/// equality filter. `split_by` additionally partitions the subset per level
/// of another column (p-value cells compare the parts).
#[derive(Debug, Clone, PartialEq)]
pub struct DataSelector {
    pub variable: Option<String>,
    pub filters: Vec<(String, String)>,
    pub split_by: Option<String>,
}

impl DataSelector {
    pub fn variable(name: impl Into<String>) -> Self {
        Self { variable: Some(name.into()), filters: Vec::new(), split_by: None }
    }

    pub fn filtered(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn split_by(mut self, column: impl Into<String>) -> Self {
        self.split_by = Some(column.into());
        self
    }
}

/// A resolved data subset. `groups` is filled only for split selectors.
#[derive(Debug, Clone, Default)]
pub struct Subset {
    pub values: Vec<Datum>,
    pub groups: Vec<(String, Vec<Datum>)>,
}

/// Deterministic signature of a computation's inputs. Two cells with equal
/// keys always resolve to the same string within one table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub variable: String,
    /// Filter scope, including group and stratum levels.
    pub scope: Vec<(String, String)>,
    /// Computation kind, e.g. `summary:mean_sd`, `count:F`, `pvalue:ttest`.
    pub kind: String,
}

// The closure field has no useful Debug form; show everything else.
impl fmt::Debug for ComputeCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputeCell")
            .field("selector", &self.selector)
            .field("deps", &self.deps)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            Cell::Computation(c) => c.fmt(f),
            Cell::Separator => write!(f, "Separator"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_builder() {
        let sel = DataSelector::variable("age")
            .filtered("treatment", "A")
            .filtered("site", "1");
        assert_eq!(sel.variable.as_deref(), Some("age"));
        assert_eq!(sel.filters.len(), 2);
        assert!(sel.split_by.is_none());

        let split = DataSelector::variable("age").split_by("treatment");
        assert_eq!(split.split_by.as_deref(), Some("treatment"));
    }

    #[test]
    fn cache_keys_compare_by_value() {
        let a = CacheKey {
            variable: "age".into(),
            scope: vec![("treatment".into(), "A".into())],
            kind: "summary:mean_sd".into(),
        };
        let b = a.clone();
        assert_eq!(a, b);
    }
}
