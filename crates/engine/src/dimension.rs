//! Dimension analysis: derives the full row/column structure of a table
//! from the declarative spec, before any cell is computed.
//!
//! The plan is pure data and immutable once produced; population walks it
//! to decide what cell to write at each address.

use crate::classify::{classify, VarKind};
use crate::dispatch;
use crate::error::EngineError;
use crate::frame::DataFrame;
use crate::options::{TableOptions, TableSpec};
use crate::registry;

/// Safety ceiling on `row_count x col_count`. Requests past this are a
/// configuration mistake (runaway stratification, exploded level counts),
/// rejected before any population work.
pub const MAX_GRID_CELLS: u64 = 262_144;

/// Structural role of a row, kept beside the labels for the renderer
/// (indentation, stratum rules).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Stratum,
    Header,
    Category,
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowPlan {
    /// Section header repeated once per stratum level.
    StratumHeader { level: String },
    /// First row of a variable block; carries the summary cells for
    /// continuous variables and the p-value cell for all.
    VariableHeader { variable: String, kind: VarKind, stratum: Option<String> },
    /// One category level of a categorical variable.
    Category { variable: String, level: String, stratum: Option<String> },
    /// Missing-count row, present only when requested and non-empty.
    Missing { variable: String, stratum: Option<String> },
}

impl RowPlan {
    pub fn kind(&self) -> RowKind {
        match self {
            Self::StratumHeader { .. } => RowKind::Stratum,
            Self::VariableHeader { .. } => RowKind::Header,
            Self::Category { .. } => RowKind::Category,
            Self::Missing { .. } => RowKind::Missing,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::StratumHeader { level } => level.clone(),
            Self::VariableHeader { variable, .. } => variable.clone(),
            Self::Category { level, .. } => level.clone(),
            Self::Missing { .. } => "Missing".into(),
        }
    }

    pub fn variable(&self) -> Option<&str> {
        match self {
            Self::StratumHeader { .. } => None,
            Self::VariableHeader { variable, .. }
            | Self::Category { variable, .. }
            | Self::Missing { variable, .. } => Some(variable),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColPlan {
    /// One column per level of the grouping variable.
    Group { level: String },
    /// The single column of an ungrouped table.
    Overall,
    /// Pooled column across all groups.
    Total,
    PValue,
}

impl ColPlan {
    pub fn label(&self) -> String {
        match self {
            Self::Group { level } => level.clone(),
            Self::Overall => "Overall".into(),
            Self::Total => "Total".into(),
            Self::PValue => "p-value".into(),
        }
    }

    /// Columns that carry summary/count values (everything but p-value).
    pub fn is_value(&self) -> bool {
        !matches!(self, Self::PValue)
    }
}

/// Footnotes with assigned markers. Marker N is `notes[N - 1]`; assignment
/// order is variable notes, then column notes, then unmarked general notes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FootnotePlan {
    pub notes: Vec<String>,
    pub variable_markers: Vec<(String, usize)>,
    /// 1-based column index -> marker.
    pub column_markers: Vec<(u32, usize)>,
    pub general: Vec<String>,
}

impl FootnotePlan {
    pub fn marker_for_variable(&self, variable: &str) -> Option<usize> {
        self.variable_markers
            .iter()
            .find(|(v, _)| v == variable)
            .map(|(_, m)| *m)
    }

    pub fn marker_for_column(&self, col: u32) -> Option<usize> {
        self.column_markers.iter().find(|(c, _)| *c == col).map(|(_, m)| *m)
    }

    /// Marker for a note text, creating it on first use so variables that
    /// share a test share its footnote.
    fn intern(&mut self, text: String) -> usize {
        match self.notes.iter().position(|n| *n == text) {
            Some(i) => i + 1,
            None => {
                self.notes.push(text);
                self.notes.len()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct DimensionPlan {
    pub rows: Vec<RowPlan>,
    pub cols: Vec<ColPlan>,
    pub group: Option<String>,
    pub stratify_by: Option<String>,
    pub footnotes: FootnotePlan,
}

impl DimensionPlan {
    pub fn row_count(&self) -> u32 {
        self.rows.len() as u32
    }

    pub fn col_count(&self) -> u32 {
        self.cols.len() as u32
    }
}

/// Compute the full structural plan. Read-only frame access; fails fast on
/// bad grouping, absent columns, or an oversized table.
pub fn analyze(
    spec: &TableSpec,
    options: &TableOptions,
    frame: &DataFrame,
) -> Result<DimensionPlan, EngineError> {
    if spec.group.len() > 1 {
        return Err(EngineError::Configuration(format!(
            "grouping must name a single variable, got {}: {}",
            spec.group.len(),
            spec.group.join(", ")
        )));
    }
    if spec.variables.is_empty() {
        return Err(EngineError::Configuration("no analysis variables given".into()));
    }

    let group = spec.group.first().cloned();
    for name in spec
        .variables
        .iter()
        .chain(group.iter())
        .chain(options.stratify_by.iter())
    {
        if !frame.has_column(name) {
            return Err(EngineError::MissingVariable(name.clone()));
        }
    }

    let group_levels = match &group {
        Some(g) => {
            let levels = frame.levels(g);
            if levels.is_empty() {
                return Err(EngineError::Configuration(format!(
                    "grouping variable '{g}' has no observed levels"
                )));
            }
            levels
        }
        None => Vec::new(),
    };

    let kinds: Vec<(String, VarKind)> = spec
        .variables
        .iter()
        .map(|v| {
            // presence checked above
            let col = frame.column(v).unwrap();
            (v.clone(), classify(col, options.classify_threshold))
        })
        .collect();

    // Row plan for one stratum (or the whole table when unstratified).
    let base_rows = |stratum: Option<&str>| -> Vec<RowPlan> {
        let stratum = stratum.map(|s| s.to_string());
        let mut rows = Vec::new();
        for (variable, kind) in &kinds {
            rows.push(RowPlan::VariableHeader {
                variable: variable.clone(),
                kind: *kind,
                stratum: stratum.clone(),
            });
            if *kind == VarKind::Categorical {
                for level in frame.levels(variable) {
                    rows.push(RowPlan::Category {
                        variable: variable.clone(),
                        level,
                        stratum: stratum.clone(),
                    });
                }
            }
            let missing = frame.column(variable).unwrap().missing_count();
            if options.show_missing && missing > 0 {
                rows.push(RowPlan::Missing {
                    variable: variable.clone(),
                    stratum: stratum.clone(),
                });
            }
        }
        rows
    };

    let rows = match &options.stratify_by {
        Some(strat) => {
            let levels = frame.levels(strat);
            if levels.is_empty() {
                return Err(EngineError::Configuration(format!(
                    "stratification variable '{strat}' has no observed levels"
                )));
            }
            let mut rows = Vec::new();
            for level in levels {
                rows.push(RowPlan::StratumHeader { level: level.clone() });
                rows.extend(base_rows(Some(level.as_str())));
            }
            rows
        }
        None => base_rows(None),
    };

    let mut cols: Vec<ColPlan> = if group_levels.is_empty() {
        vec![ColPlan::Overall]
    } else {
        group_levels
            .iter()
            .map(|level| ColPlan::Group { level: level.clone() })
            .collect()
    };
    if options.show_totals {
        cols.push(ColPlan::Total);
    }
    // A p-value needs something to compare; single-column tables drop it.
    let has_pvalue = options.show_pvalue && group_levels.len() >= 2;
    if has_pvalue {
        cols.push(ColPlan::PValue);
    }

    let cell_count = rows.len() as u64 * cols.len() as u64;
    if cell_count > MAX_GRID_CELLS {
        return Err(EngineError::Configuration(format!(
            "table needs {} x {} = {} cells, exceeding the {} cell ceiling",
            rows.len(),
            cols.len(),
            cell_count,
            MAX_GRID_CELLS
        )));
    }

    let footnotes = assign_footnotes(&kinds, &cols, options, has_pvalue);

    Ok(DimensionPlan {
        rows,
        cols,
        group,
        stratify_by: options.stratify_by.clone(),
        footnotes,
    })
}

/// Sequential marker assignment in fixed precedence: variable footnotes
/// (the test behind each p-value), then column footnotes (summary format),
/// then unmarked general notes.
fn assign_footnotes(
    kinds: &[(String, VarKind)],
    cols: &[ColPlan],
    options: &TableOptions,
    has_pvalue: bool,
) -> FootnotePlan {
    let mut plan = FootnotePlan::default();

    if has_pvalue {
        for (variable, kind) in kinds {
            let test_name = match kind {
                VarKind::Continuous => &options.continuous_test,
                VarKind::Categorical => &options.categorical_test,
            };
            let marker = plan.intern(dispatch::test_label(test_name));
            plan.variable_markers.push((variable.clone(), marker));
        }
    }

    let summary_note = format!(
        "Continuous: {}; categorical: n (%).",
        registry::summary_label(&options.numeric_summary)
    );
    let marker = plan.intern(summary_note);
    for (i, col) in cols.iter().enumerate() {
        if col.is_value() {
            plan.column_markers.push((i as u32 + 1, marker));
        }
    }

    plan.general = options.footnotes.clone();
    plan
}
