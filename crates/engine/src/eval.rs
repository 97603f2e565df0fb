//! Cell evaluation with per-table caching.
//!
//! Evaluation dispatches purely on the cell tag. Computation results are
//! cached by their input signature, so re-rendering a table (in any format)
//! never recomputes an already-resolved cell. A failing recipe is isolated
//! to a visible marker plus a diagnostic record; it never aborts a render.

use rustc_hash::FxHashMap;

use crate::cell::{CacheKey, Cell, ComputeCell, DataSelector, Subset};
use crate::frame::DataFrame;

/// What a failed computation displays in the table.
pub const ERROR_MARKER: &str = "[error]";

#[derive(Debug, Clone, Default)]
pub struct EvalCache {
    entries: FxHashMap<CacheKey, String>,
    /// Instrumentation: lookups served from the cache.
    pub hits: usize,
    /// Instrumentation: lookups that ran the recipe.
    pub misses: usize,
}

impl EvalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&String> {
        self.entries.get(key)
    }
}

/// One failed cell computation, reported alongside the render.
#[derive(Debug, Clone, PartialEq)]
pub struct CellDiagnostic {
    pub variable: String,
    pub deps: Vec<String>,
    pub message: String,
}

/// Resolve a selector to its data subset. Split selectors additionally
/// partition by the split column's levels.
pub fn resolve_selector(selector: &DataSelector, frame: &DataFrame) -> Subset {
    let values = match &selector.variable {
        Some(var) => frame.values_where(var, &selector.filters),
        None => Vec::new(),
    };
    let groups = match (&selector.split_by, &selector.variable) {
        (Some(split), Some(var)) => frame
            .levels(split)
            .into_iter()
            .map(|level| {
                let mut filters = selector.filters.clone();
                filters.push((split.clone(), level.clone()));
                (level, frame.values_where(var, &filters))
            })
            .collect(),
        _ => Vec::new(),
    };
    Subset { values, groups }
}

pub fn evaluate(
    cell: &Cell,
    frame: &DataFrame,
    cache: &mut EvalCache,
    diagnostics: &mut Vec<CellDiagnostic>,
    decimals: u8,
) -> String {
    match cell {
        Cell::Literal(s) => s.clone(),
        Cell::Separator => String::new(),
        Cell::Computation(c) => evaluate_computation(c, frame, cache, diagnostics, decimals),
    }
}

fn evaluate_computation(
    c: &ComputeCell,
    frame: &DataFrame,
    cache: &mut EvalCache,
    diagnostics: &mut Vec<CellDiagnostic>,
    decimals: u8,
) -> String {
    if let Some(hit) = cache.entries.get(&c.key) {
        cache.hits += 1;
        return hit.clone();
    }
    cache.misses += 1;

    let subset = resolve_selector(&c.selector, frame);
    let value = match (c.compute)(&subset, decimals) {
        Ok(s) => s,
        Err(message) => {
            diagnostics.push(CellDiagnostic {
                variable: c.selector.variable.clone().unwrap_or_default(),
                deps: c.deps.clone(),
                message,
            });
            ERROR_MARKER.to_string()
        }
    };
    // failed cells cache their marker, so the diagnostic fires once
    cache.entries.insert(c.key.clone(), value.clone());
    value
}
