//! Group-comparison tests for continuous variables.
//!
//! Every entry point takes the per-group samples and returns a two-sided
//! p-value. Callers strip missing values before calling; empty groups are
//! dropped here so a group level with no observations never distorts a test.

use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};

use crate::describe::{mean, midranks, sample_var, tie_correction_term};
use crate::error::StatError;

fn non_empty(groups: &[Vec<f64>]) -> Vec<&[f64]> {
    groups.iter().filter(|g| !g.is_empty()).map(|g| g.as_slice()).collect()
}

fn two_sided_t(t: f64, df: f64) -> Result<f64, StatError> {
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| StatError::Degenerate(format!("t distribution: {e}")))?;
    Ok((2.0 * dist.cdf(-t.abs())).clamp(0.0, 1.0))
}

/// Two-sample t-test with pooled (equal) variances.
pub fn students_t(groups: &[Vec<f64>]) -> Result<f64, StatError> {
    let gs = non_empty(groups);
    if gs.len() < 2 {
        return Err(StatError::TooFewGroups { needed: 2, found: gs.len() });
    }
    if gs.len() != 2 {
        return Err(StatError::GroupCount { expected: 2, found: gs.len() });
    }
    let (a, b) = (gs[0], gs[1]);
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let df = n1 + n2 - 2.0;
    if df < 1.0 {
        return Err(StatError::Degenerate("fewer than 3 observations".into()));
    }
    let ss = |g: &[f64]| if g.len() > 1 { (g.len() - 1) as f64 * sample_var(g) } else { 0.0 };
    let sp2 = (ss(a) + ss(b)) / df;
    let se = (sp2 * (1.0 / n1 + 1.0 / n2)).sqrt();
    if !se.is_finite() || se == 0.0 {
        return Err(StatError::Degenerate("zero pooled variance".into()));
    }
    two_sided_t((mean(a) - mean(b)) / se, df)
}

/// Welch two-sample t-test (unequal variances, Welch-Satterthwaite df).
pub fn welch_t(groups: &[Vec<f64>]) -> Result<f64, StatError> {
    let gs = non_empty(groups);
    if gs.len() < 2 {
        return Err(StatError::TooFewGroups { needed: 2, found: gs.len() });
    }
    if gs.len() != 2 {
        return Err(StatError::GroupCount { expected: 2, found: gs.len() });
    }
    let (a, b) = (gs[0], gs[1]);
    if a.len() < 2 || b.len() < 2 {
        return Err(StatError::Degenerate("each group needs at least 2 observations".into()));
    }
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (w1, w2) = (sample_var(a) / n1, sample_var(b) / n2);
    let se2 = w1 + w2;
    if !se2.is_finite() || se2 <= 0.0 {
        return Err(StatError::Degenerate("zero variance in both groups".into()));
    }
    let df = se2 * se2 / (w1 * w1 / (n1 - 1.0) + w2 * w2 / (n2 - 1.0));
    two_sided_t((mean(a) - mean(b)) / se2.sqrt(), df)
}

/// Rank-based comparison: Wilcoxon rank-sum for two groups,
/// Kruskal-Wallis for three or more. Normal/chi-square approximations
/// with midranks and tie correction.
pub fn rank_test(groups: &[Vec<f64>]) -> Result<f64, StatError> {
    let gs = non_empty(groups);
    if gs.len() < 2 {
        return Err(StatError::TooFewGroups { needed: 2, found: gs.len() });
    }
    if gs.len() == 2 {
        wilcoxon_rank_sum(gs[0], gs[1])
    } else {
        kruskal_wallis(&gs)
    }
}

fn wilcoxon_rank_sum(a: &[f64], b: &[f64]) -> Result<f64, StatError> {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let n = n1 + n2;

    let mut combined = Vec::with_capacity(a.len() + b.len());
    combined.extend_from_slice(a);
    combined.extend_from_slice(b);
    let ranks = midranks(&combined);

    let w: f64 = ranks[..a.len()].iter().sum();
    let mu = n1 * (n + 1.0) / 2.0;
    let ties = tie_correction_term(&combined);
    let var = n1 * n2 / 12.0 * ((n + 1.0) - ties / (n * (n - 1.0)));
    if var <= 0.0 {
        return Err(StatError::Degenerate("all values tied".into()));
    }

    // 0.5 continuity correction toward the null
    let z = ((w - mu).abs() - 0.5).max(0.0) / var.sqrt();
    let norm = Normal::new(0.0, 1.0)
        .map_err(|e| StatError::Degenerate(format!("normal distribution: {e}")))?;
    Ok((2.0 * (1.0 - norm.cdf(z))).clamp(0.0, 1.0))
}

fn kruskal_wallis(gs: &[&[f64]]) -> Result<f64, StatError> {
    let n: usize = gs.iter().map(|g| g.len()).sum();
    let nf = n as f64;

    let mut combined = Vec::with_capacity(n);
    for g in gs {
        combined.extend_from_slice(g);
    }
    let ranks = midranks(&combined);

    let mut h = 0.0;
    let mut offset = 0;
    for g in gs {
        let r_sum: f64 = ranks[offset..offset + g.len()].iter().sum();
        h += r_sum * r_sum / g.len() as f64;
        offset += g.len();
    }
    h = 12.0 / (nf * (nf + 1.0)) * h - 3.0 * (nf + 1.0);

    let correction = 1.0 - tie_correction_term(&combined) / (nf * nf * nf - nf);
    if correction <= 0.0 {
        return Err(StatError::Degenerate("all values tied".into()));
    }
    h /= correction;

    let df = (gs.len() - 1) as f64;
    let dist = ChiSquared::new(df)
        .map_err(|e| StatError::Degenerate(format!("chi-squared distribution: {e}")))?;
    Ok((1.0 - dist.cdf(h)).clamp(0.0, 1.0))
}

/// One-way ANOVA F-test across two or more groups.
pub fn oneway_anova(groups: &[Vec<f64>]) -> Result<f64, StatError> {
    let gs = non_empty(groups);
    if gs.len() < 2 {
        return Err(StatError::TooFewGroups { needed: 2, found: gs.len() });
    }
    let k = gs.len() as f64;
    let n: usize = gs.iter().map(|g| g.len()).sum();
    let nf = n as f64;
    let df2 = nf - k;
    if df2 < 1.0 {
        return Err(StatError::Degenerate("too few observations for ANOVA".into()));
    }

    let grand: f64 = gs.iter().flat_map(|g| g.iter()).sum::<f64>() / nf;
    let mut ssb = 0.0;
    let mut ssw = 0.0;
    for g in &gs {
        let m = mean(g);
        ssb += g.len() as f64 * (m - grand) * (m - grand);
        ssw += g.iter().map(|x| (x - m) * (x - m)).sum::<f64>();
    }
    let msw = ssw / df2;
    if msw <= 0.0 {
        return Err(StatError::Degenerate("zero within-group variance".into()));
    }
    let f_stat = (ssb / (k - 1.0)) / msw;

    let dist = FisherSnedecor::new(k - 1.0, df2)
        .map_err(|e| StatError::Degenerate(format!("F distribution: {e}")))?;
    Ok((1.0 - dist.cdf(f_stat)).clamp(0.0, 1.0))
}
