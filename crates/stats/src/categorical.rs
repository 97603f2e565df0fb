//! Contingency-table tests for categorical variables.
//!
//! The chi-square entry point applies the classical validity rule: whenever
//! any expected cell count falls below 5 it substitutes the Fisher exact
//! result for the same table. Expected counts are row_total x col_total /
//! grand_total.

use std::collections::BTreeMap;

use statrs::distribution::{ChiSquared, ContinuousCDF};
use statrs::function::factorial::ln_factorial;

use crate::error::StatError;

/// Node budget for the exact-test enumeration. Tables whose margin-fixed
/// enumeration would exceed this yield an error (surfaced as NA upstream).
pub const FISHER_ENUM_BUDGET: u64 = 200_000;

/// Expected count below which the chi-square approximation is not trusted.
pub const MIN_EXPECTED_COUNT: f64 = 5.0;

/// Cross-tabulation of two label sequences. Rows and columns are the sorted
/// distinct levels of each sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct ContingencyTable {
    counts: Vec<Vec<u64>>,
}

impl ContingencyTable {
    /// Build from explicit counts. Rows must be non-empty and rectangular.
    pub fn new(counts: Vec<Vec<u64>>) -> Result<Self, StatError> {
        if counts.is_empty() || counts[0].is_empty() {
            return Err(StatError::Degenerate("empty contingency table".into()));
        }
        let width = counts[0].len();
        if counts.iter().any(|row| row.len() != width) {
            return Err(StatError::Degenerate("ragged contingency table".into()));
        }
        Ok(Self { counts })
    }

    /// Cross-tabulate paired (row_label, col_label) observations.
    /// Level order is lexicographic in both dimensions.
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, StatError> {
        let mut cells: BTreeMap<(String, String), u64> = BTreeMap::new();
        let mut row_levels: BTreeMap<String, usize> = BTreeMap::new();
        let mut col_levels: BTreeMap<String, usize> = BTreeMap::new();
        for (r, c) in pairs {
            *cells.entry((r.clone(), c.clone())).or_insert(0) += 1;
            row_levels.entry(r.clone()).or_insert(0);
            col_levels.entry(c.clone()).or_insert(0);
        }
        for (i, (_, slot)) in row_levels.iter_mut().enumerate() {
            *slot = i;
        }
        for (j, (_, slot)) in col_levels.iter_mut().enumerate() {
            *slot = j;
        }

        let mut counts = vec![vec![0u64; col_levels.len()]; row_levels.len()];
        for ((r, c), n) in &cells {
            counts[row_levels[r]][col_levels[c]] = *n;
        }
        Self::new(counts)
    }

    pub fn n_rows(&self) -> usize {
        self.counts.len()
    }

    pub fn n_cols(&self) -> usize {
        self.counts[0].len()
    }

    pub fn row_totals(&self) -> Vec<u64> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    pub fn col_totals(&self) -> Vec<u64> {
        (0..self.n_cols())
            .map(|j| self.counts.iter().map(|row| row[j]).sum())
            .collect()
    }

    pub fn grand_total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    /// Expected count under independence: row_total x col_total / grand.
    pub fn expected(&self, i: usize, j: usize) -> f64 {
        let grand = self.grand_total() as f64;
        self.row_totals()[i] as f64 * self.col_totals()[j] as f64 / grand
    }

    /// Smallest expected count across all cells.
    pub fn min_expected(&self) -> f64 {
        let rows = self.row_totals();
        let cols = self.col_totals();
        let grand = self.grand_total() as f64;
        let mut min = f64::INFINITY;
        for r in &rows {
            for c in &cols {
                min = min.min(*r as f64 * *c as f64 / grand);
            }
        }
        min
    }

    /// Drop all-zero rows and columns (levels unobserved in this subset).
    pub fn trimmed(&self) -> Self {
        let rows = self.row_totals();
        let cols = self.col_totals();
        let counts: Vec<Vec<u64>> = self
            .counts
            .iter()
            .zip(&rows)
            .filter(|(_, total)| **total > 0)
            .map(|(row, _)| {
                row.iter()
                    .zip(&cols)
                    .filter(|(_, total)| **total > 0)
                    .map(|(v, _)| *v)
                    .collect()
            })
            .collect();
        Self { counts }
    }
}

fn check_shape(t: &ContingencyTable) -> Result<(), StatError> {
    if t.counts.is_empty() || t.counts[0].is_empty() || t.n_rows() < 2 || t.n_cols() < 2 {
        return Err(StatError::TooFewGroups {
            needed: 2,
            found: if t.counts.is_empty() { 0 } else { t.n_rows().min(t.n_cols()) },
        });
    }
    Ok(())
}

/// Pearson chi-square test of independence. No validity fallback; use
/// [`chisq_or_exact`] for the production rule.
pub fn pearson_chisq(table: &ContingencyTable) -> Result<f64, StatError> {
    let t = table.trimmed();
    check_shape(&t)?;

    let mut stat = 0.0;
    for i in 0..t.n_rows() {
        for j in 0..t.n_cols() {
            let e = t.expected(i, j);
            let d = t.counts[i][j] as f64 - e;
            stat += d * d / e;
        }
    }
    let df = ((t.n_rows() - 1) * (t.n_cols() - 1)) as f64;
    let dist = ChiSquared::new(df)
        .map_err(|e| StatError::Degenerate(format!("chi-squared distribution: {e}")))?;
    Ok((1.0 - dist.cdf(stat)).clamp(0.0, 1.0))
}

/// Fisher exact test: enumeration of all tables with the observed margins,
/// summing the probabilities no larger than the observed table's
/// (two-sided). Bounded by [`FISHER_ENUM_BUDGET`].
pub fn fisher(table: &ContingencyTable) -> Result<f64, StatError> {
    let t = table.trimmed();
    check_shape(&t)?;

    let row_totals = t.row_totals();
    let col_totals = t.col_totals();
    let grand = t.grand_total();

    let ln_const: f64 = row_totals.iter().map(|&x| ln_factorial(x)).sum::<f64>()
        + col_totals.iter().map(|&x| ln_factorial(x)).sum::<f64>()
        - ln_factorial(grand);
    let ln_obs =
        ln_const - t.counts.iter().flatten().map(|&x| ln_factorial(x)).sum::<f64>();

    let mut walk = MarginWalk {
        row_totals: &row_totals,
        ln_const,
        // small relative slack so float noise never excludes the observed table
        ln_cutoff: ln_obs + 1e-7,
        p_sum: 0.0,
        nodes: 0,
    };
    let mut col_rem = col_totals.clone();
    walk.fill(0, 0, row_totals[0], &mut col_rem, 0.0, t.n_rows(), t.n_cols())?;
    Ok(walk.p_sum.clamp(0.0, 1.0))
}

/// Chi-square with the required validity fallback: any expected count below
/// [`MIN_EXPECTED_COUNT`] silently substitutes the exact test.
pub fn chisq_or_exact(table: &ContingencyTable) -> Result<f64, StatError> {
    let t = table.trimmed();
    check_shape(&t)?;
    if t.min_expected() < MIN_EXPECTED_COUNT {
        fisher(&t)
    } else {
        pearson_chisq(&t)
    }
}

struct MarginWalk<'a> {
    row_totals: &'a [u64],
    ln_const: f64,
    ln_cutoff: f64,
    p_sum: f64,
    nodes: u64,
}

impl MarginWalk<'_> {
    /// Fill cells row-major. The last column of each row and the entire last
    /// row are forced by the margins, so only the (R-1) x (C-1) block is free.
    fn fill(
        &mut self,
        row: usize,
        col: usize,
        row_rem: u64,
        col_rem: &mut Vec<u64>,
        ln_fact_sum: f64,
        n_rows: usize,
        n_cols: usize,
    ) -> Result<(), StatError> {
        self.nodes += 1;
        if self.nodes > FISHER_ENUM_BUDGET {
            return Err(StatError::BudgetExceeded { budget: FISHER_ENUM_BUDGET });
        }

        if row == n_rows - 1 {
            // Last row forced to whatever the columns still need.
            let ln_p = self.ln_const
                - (ln_fact_sum + col_rem.iter().map(|&v| ln_factorial(v)).sum::<f64>());
            if ln_p <= self.ln_cutoff {
                self.p_sum += ln_p.exp();
            }
            return Ok(());
        }

        if col == n_cols - 1 {
            // Last cell in the row forced to the row remainder.
            if row_rem <= col_rem[col] {
                col_rem[col] -= row_rem;
                self.fill(
                    row + 1,
                    0,
                    self.row_totals[row + 1],
                    col_rem,
                    ln_fact_sum + ln_factorial(row_rem),
                    n_rows,
                    n_cols,
                )?;
                col_rem[col] += row_rem;
            }
            return Ok(());
        }

        let max_v = row_rem.min(col_rem[col]);
        for v in 0..=max_v {
            col_rem[col] -= v;
            self.fill(
                row,
                col + 1,
                row_rem - v,
                col_rem,
                ln_fact_sum + ln_factorial(v),
                n_rows,
                n_cols,
            )?;
            col_rem[col] += v;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(counts: &[&[u64]]) -> ContingencyTable {
        ContingencyTable::new(counts.iter().map(|r| r.to_vec()).collect()).unwrap()
    }

    #[test]
    fn from_pairs_orders_levels() {
        let pairs: Vec<(String, String)> = vec![
            ("M".into(), "B".into()),
            ("F".into(), "A".into()),
            ("M".into(), "A".into()),
            ("F".into(), "A".into()),
        ];
        let t = ContingencyTable::from_pairs(&pairs).unwrap();
        // rows: F, M; cols: A, B
        assert_eq!(t, table(&[&[2, 0], &[1, 1]]));
    }

    #[test]
    fn chisq_known_value() {
        // all expected counts 15, chi2 = 6.6667, df 1 -> p = 0.00982
        let p = pearson_chisq(&table(&[&[10, 20], &[20, 10]])).unwrap();
        assert!((p - 0.00982).abs() < 1e-4, "p = {p}");
    }

    #[test]
    fn fisher_2x2_known_value() {
        let p = fisher(&table(&[&[3, 1], &[1, 3]])).unwrap();
        assert!((p - 0.4857).abs() < 1e-4, "p = {p}");
    }

    #[test]
    fn fisher_skewed_2x2() {
        // classic example: p = 0.002759
        let p = fisher(&table(&[&[1, 9], &[11, 3]])).unwrap();
        assert!((p - 0.002759).abs() < 1e-5, "p = {p}");
    }

    #[test]
    fn low_expected_count_falls_back_to_exact() {
        // grand total 8, every expected count < 5
        let t = table(&[&[2, 3], &[2, 1]]);
        assert!(t.min_expected() < MIN_EXPECTED_COUNT);
        let fallback = chisq_or_exact(&t).unwrap();
        let exact = fisher(&t).unwrap();
        assert_eq!(fallback, exact);
        assert!((exact - 1.0).abs() < 1e-9, "p = {exact}");
    }

    #[test]
    fn high_expected_count_uses_pearson() {
        let t = table(&[&[10, 20], &[20, 10]]);
        assert!(t.min_expected() >= MIN_EXPECTED_COUNT);
        assert_eq!(chisq_or_exact(&t).unwrap(), pearson_chisq(&t).unwrap());
    }

    #[test]
    fn zero_margins_are_trimmed() {
        // middle column unobserved -> behaves as the 2x2 without it
        let with_zero = table(&[&[3, 0, 1], &[1, 0, 3]]);
        let without = table(&[&[3, 1], &[1, 3]]);
        assert_eq!(fisher(&with_zero).unwrap(), fisher(&without).unwrap());
    }

    #[test]
    fn single_level_is_too_few() {
        let err = pearson_chisq(&table(&[&[5, 5]])).unwrap_err();
        assert!(matches!(err, StatError::TooFewGroups { .. }));
        // a table that collapses to one column after trimming
        let err = fisher(&table(&[&[4, 0], &[6, 0]])).unwrap_err();
        assert!(matches!(err, StatError::TooFewGroups { .. }));
    }

    #[test]
    fn fisher_3x2_in_unit_range() {
        let p = fisher(&table(&[&[1, 4], &[3, 2], &[4, 1]])).unwrap();
        assert!(p > 0.0 && p <= 1.0);
        // exact enumeration is symmetric in this balanced layout
        let p_flipped = fisher(&table(&[&[4, 1], &[3, 2], &[1, 4]])).unwrap();
        assert!((p - p_flipped).abs() < 1e-9);
    }
}
