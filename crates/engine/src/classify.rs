//! Variable classification: continuous vs. categorical.

use crate::frame::Column;

/// Distinct-value cutoff below which a numeric column is treated as
/// categorical (small integer codes, Likert scales, and the like).
pub const DEFAULT_DISTINCT_THRESHOLD: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    Continuous,
    Categorical,
}

impl std::fmt::Display for VarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Continuous => write!(f, "continuous"),
            Self::Categorical => write!(f, "categorical"),
        }
    }
}

/// Classify a column. Non-numeric columns are always categorical; numeric
/// columns are categorical only while their distinct non-missing count stays
/// at or under `threshold`. Degenerate input (empty, all missing) defaults
/// to categorical. Never fails.
pub fn classify(column: &Column, threshold: usize) -> VarKind {
    if !column.is_numeric() {
        return VarKind::Categorical;
    }
    let distinct = column.distinct_non_missing();
    if distinct == 0 || distinct <= threshold {
        VarKind::Categorical
    } else {
        VarKind::Continuous
    }
}
