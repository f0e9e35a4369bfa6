//! Length normalization and log counts-per-million

use ndarray::{Array2, ArrayView2, Axis};

use crate::error::{PreproError, Result};

/// Scale every count by `1000 / transcript_length` (reads per kilobase)
///
/// `lengths` must be row-aligned with `counts`.
pub fn length_normalize(counts: ArrayView2<f64>, lengths: &[f64]) -> Result<Array2<f64>> {
    let n_genes = counts.nrows();
    if lengths.len() != n_genes {
        return Err(PreproError::DimensionMismatch {
            expected: format!("{} gene lengths", n_genes),
            got: format!("{} gene lengths", lengths.len()),
        });
    }
    if let Some(bad) = lengths.iter().find(|&&l| !(l > 0.0) || !l.is_finite()) {
        return Err(PreproError::InvalidInput {
            reason: format!("gene length must be positive, got {}", bad),
        });
    }

    let mut result = counts.to_owned();
    for (mut row, &length) in result.axis_iter_mut(Axis(0)).zip(lengths) {
        row.mapv_inplace(|x| x * 1000.0 / length);
    }
    Ok(result)
}

/// Log2 counts-per-million with a library-size scaled prior count
///
/// edgeR equivalent: `cpm(y, log = TRUE, prior.count = prior_count)` where
/// `lib_sizes` are the effective library sizes (library size x norm factor).
/// The prior added to sample j is `prior_count * lib_j / mean(lib)`, and the
/// library size is inflated by twice that prior.
pub fn log_cpm(counts: ArrayView2<f64>, lib_sizes: &[f64], prior_count: f64) -> Result<Array2<f64>> {
    let n_samples = counts.ncols();
    if lib_sizes.len() != n_samples {
        return Err(PreproError::DimensionMismatch {
            expected: format!("{} library sizes", n_samples),
            got: format!("{} library sizes", lib_sizes.len()),
        });
    }
    if n_samples == 0 {
        return Ok(counts.to_owned());
    }

    let mean_lib = lib_sizes.iter().sum::<f64>() / n_samples as f64;

    let mut result = counts.to_owned();
    for (mut col, &lib) in result.axis_iter_mut(Axis(1)).zip(lib_sizes) {
        let prior = prior_count * lib / mean_lib;
        let adjusted_lib = lib + 2.0 * prior;
        col.mapv_inplace(|x| ((x + prior) / adjusted_lib * 1e6).log2());
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_length_normalize() {
        let counts = array![[15.0, 20.0], [0.0, 0.0], [10.0, 4.0]];
        let result = length_normalize(counts.view(), &[1000.0, 500.0, 2000.0]).unwrap();
        assert_eq!(result, array![[15.0, 20.0], [0.0, 0.0], [5.0, 2.0]]);
    }

    #[test]
    fn test_length_normalize_rejects_misaligned_lengths() {
        let counts = array![[1.0], [2.0]];
        assert!(length_normalize(counts.view(), &[1000.0]).is_err());
        assert!(length_normalize(counts.view(), &[1000.0, 0.0]).is_err());
    }

    #[test]
    fn test_log_cpm_equal_libraries() {
        // equal library sizes: prior is exactly prior_count
        let counts = array![[98.0, 0.0], [0.0, 98.0]];
        let result = log_cpm(counts.view(), &[98.0, 98.0], 2.0).unwrap();
        // (98 + 2) / (98 + 4) * 1e6
        let expected = (100.0_f64 / 102.0 * 1e6).log2();
        assert_relative_eq!(result[[0, 0]], expected, epsilon = 1e-10);
        assert_relative_eq!(result[[1, 1]], expected, epsilon = 1e-10);
        assert_relative_eq!(result[[0, 1]], (2.0_f64 / 102.0 * 1e6).log2(), epsilon = 1e-10);
    }
}
