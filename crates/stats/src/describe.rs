//! Descriptive statistics over numeric slices.
//!
//! All functions ignore nothing: callers strip missing values first.
//! Quantiles use linear interpolation between order statistics, matching
//! the convention most statistical software defaults to.

/// Arithmetic mean. Returns NaN on an empty slice.
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample variance (n - 1 denominator). NaN with fewer than 2 values.
pub fn sample_var(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return f64::NAN;
    }
    let m = mean(xs);
    xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / (xs.len() - 1) as f64
}

/// Sample standard deviation.
pub fn sd(xs: &[f64]) -> f64 {
    sample_var(xs).sqrt()
}

/// Quantile of a sorted slice, p in [0, 1], linear interpolation.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let h = p * (sorted.len() - 1) as f64;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Median.
pub fn median(xs: &[f64]) -> f64 {
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    quantile_sorted(&sorted, 0.5)
}

/// First and third quartiles.
pub fn quartiles(xs: &[f64]) -> (f64, f64) {
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    (quantile_sorted(&sorted, 0.25), quantile_sorted(&sorted, 0.75))
}

/// Midranks of a sample: tied values share the average of the ranks they
/// would occupy. Ranks are 1-based.
pub fn midranks(xs: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| xs[a].partial_cmp(&xs[b]).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && xs[order[j + 1]] == xs[order[i]] {
            j += 1;
        }
        // Positions i..=j are tied; they occupy ranks i+1 ..= j+1.
        let avg = (i + 1 + j + 1) as f64 / 2.0;
        for k in i..=j {
            ranks[order[k]] = avg;
        }
        i = j + 1;
    }
    ranks
}

/// Sum of (t^3 - t) over tie groups, used by rank-test variance corrections.
pub fn tie_correction_term(xs: &[f64]) -> f64 {
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut term = 0.0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j + 1 < sorted.len() && sorted[j + 1] == sorted[i] {
            j += 1;
        }
        let t = (j - i + 1) as f64;
        term += t * t * t - t;
        i = j + 1;
    }
    term
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_sd() {
        let xs = [40.0, 50.0, 60.0, 70.0];
        assert_eq!(mean(&xs), 55.0);
        assert!((sample_var(&xs) - 500.0 / 3.0).abs() < 1e-9);
        assert!((sd(&xs) - (500.0f64 / 3.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn mean_of_empty_is_nan() {
        assert!(mean(&[]).is_nan());
        assert!(sample_var(&[1.0]).is_nan());
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    }

    #[test]
    fn quartiles_interpolate() {
        let (q1, q3) = quartiles(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(q1, 2.0);
        assert_eq!(q3, 4.0);
    }

    #[test]
    fn midranks_without_ties() {
        assert_eq!(midranks(&[30.0, 10.0, 20.0]), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn midranks_average_ties() {
        // 5.0 appears twice at rank positions 2 and 3 -> both get 2.5
        assert_eq!(midranks(&[5.0, 1.0, 5.0, 9.0]), vec![2.5, 1.0, 2.5, 4.0]);
    }

    #[test]
    fn tie_term_counts_groups() {
        // one tie group of size 3: 3^3 - 3 = 24
        assert_eq!(tie_correction_term(&[2.0, 2.0, 2.0, 1.0]), 24.0);
        assert_eq!(tie_correction_term(&[1.0, 2.0, 3.0]), 0.0);
    }
}
