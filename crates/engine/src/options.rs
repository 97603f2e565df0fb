//! Declarative table inputs: the normalized formula spec and the option set.

use serde::Deserialize;

/// Normalized formula spec: at most one grouping variable plus the ordered
/// analysis variables. Parsing a formula syntax into this shape is the
/// caller's job.
#[derive(Debug, Clone, Deserialize)]
pub struct TableSpec {
    #[serde(default)]
    pub group: Vec<String>,
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    /// Add a "Missing" row for variables with missing observations.
    pub show_missing: bool,
    /// Add a p-value column (requires a grouping with at least 2 levels).
    pub show_pvalue: bool,
    /// Add a pooled "Total" column.
    pub show_totals: bool,
    /// Secondary grouping: the whole table repeats once per level.
    pub stratify_by: Option<String>,
    /// Test name for continuous variables: ttest | welch | wilcoxon | anova,
    /// or a registered custom test.
    pub continuous_test: String,
    /// Test name for categorical variables: chisq | fisher,
    /// or a registered custom test.
    pub categorical_test: String,
    /// Summary name for continuous variables: mean_sd | median_iqr |
    /// mean_sd_n, or a registered custom summary.
    pub numeric_summary: String,
    /// Distinct-value cutoff for the continuous/categorical decision.
    pub classify_threshold: usize,
    /// General (unmarked) footnotes appended after assigned markers.
    pub footnotes: Vec<String>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            show_missing: false,
            show_pvalue: false,
            show_totals: false,
            stratify_by: None,
            continuous_test: "ttest".into(),
            categorical_test: "chisq".into(),
            numeric_summary: "mean_sd".into(),
            classify_threshold: crate::classify::DEFAULT_DISTINCT_THRESHOLD,
            footnotes: Vec::new(),
        }
    }
}
