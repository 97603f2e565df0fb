//! The blueprint: a sparsely-populated table whose cells hold recipes.
//!
//! Population walks the dimension plan and writes one cell per structural
//! position: summary/count/p-value computations in the grid, label literals
//! beside it, separator filler on stratum header rows. Nothing is computed
//! until a render asks for a value; results are cached per table.

use std::cell::RefCell;
use std::rc::Rc;

use crate::cell::{CacheKey, Cell, CellFn, ComputeCell, DataSelector};
use crate::classify::VarKind;
use crate::dimension::{self, ColPlan, DimensionPlan, FootnotePlan, RowKind, RowPlan};
use crate::dispatch::{self, TestSpec};
use crate::error::EngineError;
use crate::eval::{self, CellDiagnostic, EvalCache};
use crate::frame::{DataFrame, Datum};
use crate::grid::SparseGrid;
use crate::options::{TableOptions, TableSpec};
use crate::registry::Registry;

#[derive(Debug)]
pub struct Blueprint {
    rows: u32,
    cols: u32,
    pub title: Option<String>,
    /// Label cells beside the grid; grid dimensions cover value positions
    /// only, so structural arithmetic matches the dimension plan.
    row_labels: Vec<Cell>,
    col_labels: Vec<Cell>,
    pub row_kinds: Vec<RowKind>,
    pub row_variables: Vec<Option<String>>,
    grid: SparseGrid,
    pub footnotes: FootnotePlan,
    // Interior mutability: renders share one cache across formats without
    // mutating the table structure.
    cache: RefCell<EvalCache>,
    diagnostics: RefCell<Vec<CellDiagnostic>>,
}

impl Blueprint {
    /// Validate dimensions and allocate an empty grid. Dimensions are
    /// immutable afterwards.
    pub fn new(rows: u32, cols: u32) -> Result<Self, EngineError> {
        if rows == 0 || cols == 0 {
            return Err(EngineError::Configuration(format!(
                "dimensions must be positive, got {rows}x{cols}"
            )));
        }
        let cells = rows as u64 * cols as u64;
        if cells > dimension::MAX_GRID_CELLS {
            return Err(EngineError::Configuration(format!(
                "requested {rows}x{cols} = {cells} cells, exceeding the {} cell ceiling",
                dimension::MAX_GRID_CELLS
            )));
        }
        Ok(Self {
            rows,
            cols,
            title: None,
            row_labels: Vec::new(),
            col_labels: Vec::new(),
            row_kinds: Vec::new(),
            row_variables: Vec::new(),
            grid: SparseGrid::new(rows, cols),
            footnotes: FootnotePlan::default(),
            cache: RefCell::new(EvalCache::new()),
            diagnostics: RefCell::new(Vec::new()),
        })
    }

    /// Analyze, allocate, and populate in one step.
    pub fn build(
        spec: &TableSpec,
        options: &TableOptions,
        frame: &DataFrame,
        registry: &Registry,
    ) -> Result<Self, EngineError> {
        let plan = dimension::analyze(spec, options, frame)?;
        let mut blueprint = Self::new(plan.row_count(), plan.col_count())?;
        blueprint.populate(&plan, frame, options, registry)?;
        Ok(blueprint)
    }

    /// Walk the plan and write every cell. Idempotent for identical inputs;
    /// validation failures leave the grid empty.
    pub fn populate(
        &mut self,
        plan: &DimensionPlan,
        frame: &DataFrame,
        options: &TableOptions,
        registry: &Registry,
    ) -> Result<(), EngineError> {
        if plan.row_count() != self.rows || plan.col_count() != self.cols {
            return Err(EngineError::Configuration(format!(
                "plan dimensions {}x{} do not match blueprint {}x{}",
                plan.row_count(),
                plan.col_count(),
                self.rows,
                self.cols
            )));
        }

        self.grid.clear();
        self.cache.replace(EvalCache::new());
        self.diagnostics.borrow_mut().clear();

        // Resolve capabilities up front so a bad name fails before any cell
        // is written.
        let summary = registry.summary(&options.numeric_summary).ok_or_else(|| {
            EngineError::Configuration(format!(
                "unknown numeric summary '{}'",
                options.numeric_summary
            ))
        })?;

        let has_pvalue = plan.cols.iter().any(|c| matches!(c, ColPlan::PValue));
        let needs = |kind: VarKind| {
            plan.rows
                .iter()
                .any(|r| matches!(r, RowPlan::VariableHeader { kind: k, .. } if *k == kind))
        };
        let continuous_spec: Option<Rc<TestSpec>> = if has_pvalue && needs(VarKind::Continuous) {
            Some(Rc::new(dispatch::build_test(
                &options.continuous_test,
                VarKind::Continuous,
                registry,
            )?))
        } else {
            None
        };
        let categorical_spec: Option<Rc<TestSpec>> = if has_pvalue && needs(VarKind::Categorical) {
            Some(Rc::new(dispatch::build_test(
                &options.categorical_test,
                VarKind::Categorical,
                registry,
            )?))
        } else {
            None
        };

        self.row_labels = plan.rows.iter().map(|r| Cell::literal(r.label())).collect();
        self.col_labels = plan.cols.iter().map(|c| Cell::literal(c.label())).collect();
        self.row_kinds = plan.rows.iter().map(|r| r.kind()).collect();
        self.row_variables = plan
            .rows
            .iter()
            .map(|r| r.variable().map(|v| v.to_string()))
            .collect();
        self.footnotes = plan.footnotes.clone();

        let stratum_filters = |stratum: &Option<String>| -> Vec<(String, String)> {
            match (&plan.stratify_by, stratum) {
                (Some(col), Some(level)) => vec![(col.clone(), level.clone())],
                _ => Vec::new(),
            }
        };
        let column_filters = |col: &ColPlan| -> Vec<(String, String)> {
            match (col, &plan.group) {
                (ColPlan::Group { level }, Some(group)) => {
                    vec![(group.clone(), level.clone())]
                }
                _ => Vec::new(),
            }
        };

        for (ri, row) in plan.rows.iter().enumerate() {
            let r = ri as u32 + 1;
            for (ci, col) in plan.cols.iter().enumerate() {
                let c = ci as u32 + 1;
                let cell = match row {
                    RowPlan::StratumHeader { .. } => Some(Cell::Separator),
                    RowPlan::VariableHeader { variable, kind, stratum } => match col {
                        ColPlan::PValue => {
                            let spec = match kind {
                                VarKind::Continuous => continuous_spec.clone(),
                                VarKind::Categorical => categorical_spec.clone(),
                            };
                            spec.zip(plan.group.as_ref()).map(|(spec, group)| {
                                pvalue_cell(variable, group, &stratum_filters(stratum), spec)
                            })
                        }
                        _ if *kind == VarKind::Continuous => {
                            let mut filters = stratum_filters(stratum);
                            filters.extend(column_filters(col));
                            Some(summary_cell(
                                variable,
                                filters,
                                summary.clone(),
                                &options.numeric_summary,
                            ))
                        }
                        _ => None,
                    },
                    RowPlan::Category { variable, level, stratum } => {
                        if col.is_value() {
                            let mut filters = stratum_filters(stratum);
                            filters.extend(column_filters(col));
                            Some(count_cell(variable, level, filters))
                        } else {
                            None
                        }
                    }
                    RowPlan::Missing { variable, stratum } => {
                        if col.is_value() {
                            let mut filters = stratum_filters(stratum);
                            filters.extend(column_filters(col));
                            Some(missing_cell(variable, filters))
                        } else {
                            None
                        }
                    }
                };
                if let Some(cell) = cell {
                    self.grid.set(r, c, Some(cell))?;
                }
            }
        }
        Ok(())
    }

    pub fn row_count(&self) -> u32 {
        self.rows
    }

    pub fn col_count(&self) -> u32 {
        self.cols
    }

    pub fn grid(&self) -> &SparseGrid {
        &self.grid
    }

    /// Populated addresses, for determinism checks and renderers.
    pub fn populated_len(&self) -> usize {
        self.grid.len()
    }

    /// Evaluate one grid position through the shared cache. `None` for
    /// unpopulated addresses.
    pub fn value_at(
        &self,
        row: u32,
        col: u32,
        frame: &DataFrame,
        decimals: u8,
    ) -> Result<Option<String>, EngineError> {
        let Some(cell) = self.grid.get(row, col)? else {
            return Ok(None);
        };
        Ok(Some(eval::evaluate(
            cell,
            frame,
            &mut self.cache.borrow_mut(),
            &mut self.diagnostics.borrow_mut(),
            decimals,
        )))
    }

    /// Row label, resolved through the evaluator like any other cell.
    pub fn row_label(&self, row: u32, frame: &DataFrame) -> Result<String, EngineError> {
        let cell = self.label_cell(&self.row_labels, row)?;
        Ok(self.eval_label(cell, frame))
    }

    pub fn col_label(&self, col: u32, frame: &DataFrame) -> Result<String, EngineError> {
        let cell = self.label_cell(&self.col_labels, col)?;
        Ok(self.eval_label(cell, frame))
    }

    pub fn is_separator_row(&self, row: u32) -> bool {
        self.row_kinds
            .get(row as usize - 1)
            .is_some_and(|k| *k == RowKind::Stratum)
    }

    pub fn diagnostics(&self) -> Vec<CellDiagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// (hits, misses) of the evaluation cache.
    pub fn cache_stats(&self) -> (usize, usize) {
        let cache = self.cache.borrow();
        (cache.hits, cache.misses)
    }

    fn label_cell<'a>(&self, labels: &'a [Cell], index: u32) -> Result<&'a Cell, EngineError> {
        if index < 1 || index as usize > labels.len() {
            return Err(EngineError::Index {
                row: index,
                col: 0,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(&labels[index as usize - 1])
    }

    fn eval_label(&self, cell: &Cell, frame: &DataFrame) -> String {
        eval::evaluate(
            cell,
            frame,
            &mut self.cache.borrow_mut(),
            &mut self.diagnostics.borrow_mut(),
            0,
        )
    }
}

fn summary_cell(
    variable: &str,
    filters: Vec<(String, String)>,
    summary: crate::registry::SummaryFn,
    summary_name: &str,
) -> Cell {
    let mut deps = vec![variable.to_string()];
    deps.extend(filters.iter().map(|(col, _)| col.clone()));
    let selector = DataSelector {
        variable: Some(variable.to_string()),
        filters: filters.clone(),
        split_by: None,
    };
    let compute: CellFn = Rc::new(move |subset, decimals| {
        let xs: Vec<f64> = subset.values.iter().filter_map(Datum::as_number).collect();
        Ok(summary(&xs, decimals))
    });
    Cell::Computation(ComputeCell {
        selector,
        compute,
        deps,
        key: CacheKey {
            variable: variable.to_string(),
            scope: filters,
            kind: format!("summary:{summary_name}"),
        },
    })
}

fn count_cell(variable: &str, level: &str, filters: Vec<(String, String)>) -> Cell {
    let mut deps = vec![variable.to_string()];
    deps.extend(filters.iter().map(|(col, _)| col.clone()));
    let selector = DataSelector {
        variable: Some(variable.to_string()),
        filters: filters.clone(),
        split_by: None,
    };
    let level_owned = level.to_string();
    let compute: CellFn = Rc::new(move |subset, decimals| {
        let denom = subset.values.iter().filter(|d| !d.is_missing()).count();
        if denom == 0 {
            return Ok("0".into());
        }
        let n = subset
            .values
            .iter()
            .filter(|d| !d.is_missing() && d.display() == level_owned)
            .count();
        let pct = 100.0 * n as f64 / denom as f64;
        Ok(format!("{} ({:.*}%)", n, decimals as usize, pct))
    });
    Cell::Computation(ComputeCell {
        selector,
        compute,
        deps,
        key: CacheKey {
            variable: variable.to_string(),
            scope: filters,
            kind: format!("count:{level}"),
        },
    })
}

fn missing_cell(variable: &str, filters: Vec<(String, String)>) -> Cell {
    let mut deps = vec![variable.to_string()];
    deps.extend(filters.iter().map(|(col, _)| col.clone()));
    let selector = DataSelector {
        variable: Some(variable.to_string()),
        filters: filters.clone(),
        split_by: None,
    };
    let compute: CellFn = Rc::new(move |subset, _| {
        Ok(subset.values.iter().filter(|d| d.is_missing()).count().to_string())
    });
    Cell::Computation(ComputeCell {
        selector,
        compute,
        deps,
        key: CacheKey {
            variable: variable.to_string(),
            scope: filters,
            kind: "missing".into(),
        },
    })
}

fn pvalue_cell(
    variable: &str,
    group: &str,
    stratum_filters: &[(String, String)],
    spec: Rc<TestSpec>,
) -> Cell {
    let deps = vec![variable.to_string(), group.to_string()];
    let selector = DataSelector {
        variable: Some(variable.to_string()),
        filters: stratum_filters.to_vec(),
        split_by: Some(group.to_string()),
    };
    let kind = format!("pvalue:{}", spec.name);
    let compute: CellFn = Rc::new(move |subset, _| Ok(dispatch::run_test(&spec, subset)));
    Cell::Computation(ComputeCell {
        selector,
        compute,
        deps,
        key: CacheKey {
            variable: variable.to_string(),
            scope: stratum_filters.to_vec(),
            kind,
        },
    })
}
