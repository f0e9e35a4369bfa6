//! Statistical utility functions shared across modules
//!
//! Quantiles and ranks follow R's conventions so that normalization factors
//! agree with the edgeR reference implementation.

use std::cmp::Ordering;

fn cmp_f64(a: &f64, b: &f64) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

/// Sample quantile matching R's `quantile(x, p, type = 7)`
///
/// h = (n - 1) * p; result interpolates linearly between the order statistics
/// around h. Returns NaN for empty input.
pub fn quantile_type7(x: &[f64], p: f64) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    let mut sorted = x.to_vec();
    sorted.sort_by(cmp_f64);

    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Median (R's `median`)
pub fn median(x: &[f64]) -> f64 {
    quantile_type7(x, 0.5)
}

/// Ranks starting at 1 with ties averaged (R's `rank(ties.method = "average")`)
pub fn rank_average(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| cmp_f64(&x[a], &x[b]));

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && x[order[end]] == x[order[start]] {
            end += 1;
        }
        // positions start..end (0-based) share ranks start+1..=end
        let avg = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg;
        }
        start = end;
    }
    ranks
}

/// Geometric mean of positive values
pub fn geometric_mean(x: &[f64]) -> f64 {
    let log_sum: f64 = x.iter().map(|v| v.ln()).sum();
    (log_sum / x.len() as f64).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quantile_type7() {
        let x = [1.0, 2.0, 3.0, 4.0];
        // R: quantile(1:4, 0.75) = 3.25
        assert_relative_eq!(quantile_type7(&x, 0.75), 3.25);
        assert_relative_eq!(quantile_type7(&x, 0.0), 1.0);
        assert_relative_eq!(quantile_type7(&x, 1.0), 4.0);
        assert_relative_eq!(median(&[5.0, 1.0, 3.0]), 3.0);
        assert!(quantile_type7(&[], 0.5).is_nan());
    }

    #[test]
    fn test_rank_average_ties() {
        // R: rank(c(10, 20, 10, 30)) = 1.5 3.0 1.5 4.0
        assert_eq!(rank_average(&[10.0, 20.0, 10.0, 30.0]), vec![1.5, 3.0, 1.5, 4.0]);
        assert!(rank_average(&[]).is_empty());
    }

    #[test]
    fn test_geometric_mean() {
        assert_relative_eq!(geometric_mean(&[1.0, 4.0]), 2.0, epsilon = 1e-12);
    }
}
