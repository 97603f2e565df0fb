//! Statistical test dispatch.
//!
//! Maps a test name and variable kind to a p-value-producing runner, built
//! once per table and invoked per variable. Execution failures (too few
//! groups, degenerate data, enumeration budget) become the string `NA`,
//! never errors; p-values are rounded to 4 decimals before storage.

use tabula_stats::{categorical, continuous, ContingencyTable, StatError};

use crate::cell::Subset;
use crate::classify::VarKind;
use crate::error::EngineError;
use crate::frame::Datum;
use crate::registry::{CustomTestFn, Registry};

#[derive(Clone)]
pub enum TestRunner {
    Continuous(fn(&[Vec<f64>]) -> Result<f64, StatError>),
    Categorical(fn(&ContingencyTable) -> Result<f64, StatError>),
    Custom(CustomTestFn),
}

#[derive(Clone)]
pub struct TestSpec {
    pub name: String,
    /// Footnote text shown for variables tested with this spec.
    pub label: String,
    pub kind: VarKind,
    pub runner: TestRunner,
}

impl std::fmt::Debug for TestSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestSpec")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

pub fn is_builtin_test(name: &str) -> bool {
    matches!(name, "ttest" | "welch" | "wilcoxon" | "anova" | "chisq" | "fisher")
}

/// Footnote label for a test name. Custom tests are labeled by their
/// registered name.
pub fn test_label(name: &str) -> String {
    match name {
        "ttest" => "Two-sample t-test (equal variances).".into(),
        "welch" => "Welch two-sample t-test.".into(),
        "wilcoxon" => "Wilcoxon rank-sum test; Kruskal-Wallis for 3+ groups.".into(),
        "anova" => "One-way analysis of variance.".into(),
        "chisq" => {
            "Pearson chi-square test; Fisher exact test when any expected count is below 5.".into()
        }
        "fisher" => "Fisher exact test.".into(),
        other => other.into(),
    }
}

/// Resolve a test name for a variable kind. Built-ins that do not apply to
/// the kind (e.g. `chisq` on a continuous variable) are not recognized.
pub fn build_test(
    name: &str,
    kind: VarKind,
    registry: &Registry,
) -> Result<TestSpec, EngineError> {
    let runner = match (name, kind) {
        ("ttest", VarKind::Continuous) => TestRunner::Continuous(continuous::students_t),
        ("welch", VarKind::Continuous) => TestRunner::Continuous(continuous::welch_t),
        ("wilcoxon", VarKind::Continuous) => TestRunner::Continuous(continuous::rank_test),
        ("anova", VarKind::Continuous) => TestRunner::Continuous(continuous::oneway_anova),
        ("chisq", VarKind::Categorical) => TestRunner::Categorical(categorical::chisq_or_exact),
        ("fisher", VarKind::Categorical) => TestRunner::Categorical(categorical::fisher),
        _ => match registry.custom_test(name) {
            Some(f) => TestRunner::Custom(f),
            None => return Err(EngineError::UnknownTest(name.to_string())),
        },
    };
    Ok(TestSpec {
        name: name.to_string(),
        label: test_label(name),
        kind,
        runner,
    })
}

/// Run a test spec against a resolved, group-split subset. Always returns a
/// display string.
pub fn run_test(spec: &TestSpec, subset: &Subset) -> String {
    let result = match &spec.runner {
        TestRunner::Continuous(f) => f(&numeric_groups(subset)),
        TestRunner::Custom(f) => f(&numeric_groups(subset)),
        TestRunner::Categorical(f) => contingency(subset).and_then(|t| f(&t)),
    };
    match result {
        Ok(p) => format_p(p),
        Err(_) => "NA".into(),
    }
}

/// Round to 4 decimals before storage. Positive values that would display
/// as 0.0000 are reported as a bound instead.
pub fn format_p(p: f64) -> String {
    if !p.is_finite() {
        return "NA".into();
    }
    let rounded = (p * 10_000.0).round() / 10_000.0;
    if p > 0.0 && rounded == 0.0 {
        "<0.0001".into()
    } else {
        format!("{:.4}", rounded)
    }
}

fn numeric_groups(subset: &Subset) -> Vec<Vec<f64>> {
    subset
        .groups
        .iter()
        .map(|(_, data)| data.iter().filter_map(Datum::as_number).collect())
        .collect()
}

fn contingency(subset: &Subset) -> Result<ContingencyTable, StatError> {
    let mut pairs = Vec::new();
    for (label, data) in &subset.groups {
        for d in data {
            if !d.is_missing() {
                pairs.push((d.display(), label.clone()));
            }
        }
    }
    ContingencyTable::from_pairs(&pairs)
}
