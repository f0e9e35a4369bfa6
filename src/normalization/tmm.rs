//! Trimmed Mean of M-values (TMM) normalization factors
//!
//! edgeR equivalent: `calcNormFactors(y, method = "TMM")`.
//!
//! 1. Drop genes with zero counts in every sample
//! 2. Reference sample: upper quartile of count proportions closest to the
//!    mean upper quartile
//! 3. Per sample, M = log2 ratio and A = mean log2 proportion against the
//!    reference; trim 30% of M and 5% of A from each tail (jointly, by rank)
//! 4. Factor = 2^(precision-weighted mean of the kept M values)
//! 5. Rescale factors to a geometric mean of 1

use ndarray::{ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

use crate::error::{PreproError, Result};
use crate::stats::{geometric_mean, median, quantile_type7, rank_average};

/// TMM trimming parameters
#[derive(Debug, Clone)]
pub struct TmmConfig {
    /// Fraction of M values trimmed from each tail
    pub logratio_trim: f64,
    /// Fraction of A values trimmed from each tail
    pub sum_trim: f64,
    /// Use inverse asymptotic variance weights
    pub do_weighting: bool,
    /// Genes with A below this are ignored
    pub a_cutoff: f64,
}

impl Default for TmmConfig {
    fn default() -> Self {
        Self {
            logratio_trim: 0.3,
            sum_trim: 0.05,
            do_weighting: true,
            a_cutoff: -1e10,
        }
    }
}

/// TMM normalization factors, one per sample column
pub fn tmm_factors(counts: ArrayView2<f64>, config: &TmmConfig) -> Result<Vec<f64>> {
    if !(0.0..0.5).contains(&config.logratio_trim) || !(0.0..0.5).contains(&config.sum_trim) {
        return Err(PreproError::InvalidInput {
            reason: "TMM trim fractions must be in [0, 0.5)".to_string(),
        });
    }

    let n_samples = counts.ncols();
    let lib_sizes: Vec<f64> = counts.axis_iter(Axis(1)).map(|c| c.sum()).collect();

    let expressed: Vec<usize> = counts
        .axis_iter(Axis(0))
        .enumerate()
        .filter(|(_, row)| row.iter().any(|&x| x > 0.0))
        .map(|(i, _)| i)
        .collect();

    if n_samples < 2 || expressed.is_empty() {
        return Ok(vec![1.0; n_samples]);
    }
    let x = counts.select(Axis(0), &expressed);

    let upper_quartiles: Vec<f64> = x
        .axis_iter(Axis(1))
        .zip(&lib_sizes)
        .map(|(col, &lib)| {
            let props: Vec<f64> = col.iter().map(|&c| c / lib).collect();
            quantile_type7(&props, 0.75)
        })
        .collect();

    let ref_idx = if median(&upper_quartiles) < 1e-20 {
        argmax(x.axis_iter(Axis(1)).map(|col| col.iter().map(|c| c.sqrt()).sum::<f64>()))
    } else {
        let mean_uq = upper_quartiles.iter().sum::<f64>() / n_samples as f64;
        argmax(upper_quartiles.iter().map(|uq| -(uq - mean_uq).abs()))
    };
    log::debug!("TMM reference sample: column {}", ref_idx);

    let reference = x.column(ref_idx);
    let factors: Vec<f64> = (0..n_samples)
        .into_par_iter()
        .map(|j| {
            tmm_factor(
                x.column(j),
                reference,
                lib_sizes[j],
                lib_sizes[ref_idx],
                config,
            )
        })
        .collect();

    let scale = geometric_mean(&factors);
    Ok(factors.into_iter().map(|f| f / scale).collect())
}

/// Index of the first maximum
fn argmax<I: Iterator<Item = f64>>(values: I) -> usize {
    let mut best = (0, f64::NEG_INFINITY);
    for (i, v) in values.enumerate() {
        if v > best.1 {
            best = (i, v);
        }
    }
    best.0
}

/// Unscaled TMM factor of one sample against the reference sample
fn tmm_factor(
    obs: ArrayView1<f64>,
    reference: ArrayView1<f64>,
    lib_obs: f64,
    lib_ref: f64,
    config: &TmmConfig,
) -> f64 {
    let mut log_r = Vec::new();
    let mut abs_e = Vec::new();
    let mut variance = Vec::new();

    for (&o, &r) in obs.iter().zip(reference.iter()) {
        let p_obs = o / lib_obs;
        let p_ref = r / lib_ref;
        let m = (p_obs / p_ref).log2();
        let a = (p_obs.log2() + p_ref.log2()) / 2.0;
        if m.is_finite() && a.is_finite() && a > config.a_cutoff {
            log_r.push(m);
            abs_e.push(a);
            variance.push((lib_obs - o) / lib_obs / o + (lib_ref - r) / lib_ref / r);
        }
    }

    if log_r.iter().fold(f64::NEG_INFINITY, |acc, m| acc.max(m.abs())) < 1e-6 {
        return 1.0;
    }

    let n = log_r.len() as f64;
    let lo_l = (n * config.logratio_trim).floor() + 1.0;
    let hi_l = n + 1.0 - lo_l;
    let lo_s = (n * config.sum_trim).floor() + 1.0;
    let hi_s = n + 1.0 - lo_s;

    let rank_m = rank_average(&log_r);
    let rank_a = rank_average(&abs_e);

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    let mut kept = 0usize;
    for i in 0..log_r.len() {
        let keep = rank_m[i] >= lo_l && rank_m[i] <= hi_l && rank_a[i] >= lo_s && rank_a[i] <= hi_s;
        if !keep {
            continue;
        }
        kept += 1;
        if config.do_weighting {
            numerator += log_r[i] / variance[i];
            denominator += 1.0 / variance[i];
        } else {
            numerator += log_r[i];
            denominator += 1.0;
        }
    }

    let f = numerator / denominator;
    if kept == 0 || !f.is_finite() {
        return 1.0;
    }
    2f64.powf(f)
}
