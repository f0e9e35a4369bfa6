//! Normalization of reconciled counts into log-scale expression values
//!
//! The pipeline only depends on [`ExpressionNormalizer`]; [`EdgeRNormalizer`]
//! is the native backend (length scaling, TMM factors, log-CPM).

mod counts;
mod tmm;

pub use counts::{length_normalize, log_cpm};
pub use tmm::{tmm_factors, TmmConfig};

use crate::data::{CountMatrix, ExpressionMatrix};
use crate::error::{PreproError, Result};

/// Turns a reconciled count matrix into normalized expression values
pub trait ExpressionNormalizer {
    /// Short name used in logs and run summaries
    fn name(&self) -> &str;

    /// Normalize `counts`; `lengths` holds one transcript length per gene row
    fn normalize(&self, counts: &CountMatrix, lengths: &[f64]) -> Result<ExpressionMatrix>;
}

/// Native edgeR-style normalization
///
/// edgeR equivalent:
/// `cpm(calcNormFactors(DGEList(x * 1e3 / length), method = "TMM"), log = TRUE)`
#[derive(Debug, Clone)]
pub struct EdgeRNormalizer {
    pub tmm: TmmConfig,
    pub prior_count: f64,
}

impl Default for EdgeRNormalizer {
    fn default() -> Self {
        Self {
            tmm: TmmConfig::default(),
            prior_count: 2.0,
        }
    }
}

impl ExpressionNormalizer for EdgeRNormalizer {
    fn name(&self) -> &str {
        "edger-tmm"
    }

    fn normalize(&self, counts: &CountMatrix, lengths: &[f64]) -> Result<ExpressionMatrix> {
        if lengths.len() != counts.n_genes() {
            return Err(PreproError::Alignment {
                reason: format!(
                    "{} gene lengths supplied for {} genes",
                    lengths.len(),
                    counts.n_genes()
                ),
            });
        }

        if let Some(j) = counts.library_sizes().iter().position(|&lib| lib <= 0.0) {
            return Err(PreproError::Normalization {
                reason: format!("sample '{}' has an empty library", counts.sample_ids()[j]),
            });
        }

        let scaled = length_normalize(counts.counts(), lengths)?;
        let factors = tmm_factors(scaled.view(), &self.tmm)?;
        log::debug!("TMM normalization factors: {:?}", factors);

        let effective_libs: Vec<f64> = scaled
            .columns()
            .into_iter()
            .zip(&factors)
            .map(|(col, f)| col.sum() * f)
            .collect();
        let values = log_cpm(scaled.view(), &effective_libs, self.prior_count)?;

        if let Some(j) = (0..values.ncols()).find(|&j| values.column(j).iter().any(|v| !v.is_finite())) {
            return Err(PreproError::Normalization {
                reason: format!(
                    "non-finite expression values for sample '{}' (library size {})",
                    counts.sample_ids()[j],
                    effective_libs[j]
                ),
            });
        }

        ExpressionMatrix::new(values, counts.gene_ids().to_vec(), counts.sample_ids().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_unit_length_gene_scales_to_per_kilobase() {
        // 15 reads on a 1000 bp transcript stay 15 after length scaling
        let scaled = length_normalize(array![[15.0]].view(), &[1000.0]).unwrap();
        assert_eq!(scaled[[0, 0]], 15.0);
    }

    #[test]
    fn test_normalize_preserves_labels_and_is_finite() {
        let counts = CountMatrix::new(
            array![[15.0, 30.0], [100.0, 210.0], [0.0, 0.0], [40.0, 70.0]],
            ids(&["A1BG", "GAPDH", "ZERO", "TP53"]),
            ids(&["s1", "s2"]),
        )
        .unwrap();
        let result = EdgeRNormalizer::default()
            .normalize(&counts, &[1000.0, 2000.0, 500.0, 1500.0])
            .unwrap();

        assert_eq!(result.gene_ids(), counts.gene_ids());
        assert_eq!(result.sample_ids(), counts.sample_ids());
        assert!(result.values().iter().all(|v| v.is_finite()));
        // all-zero gene sits at the prior floor
        assert!(result.values()[[2, 0]] < result.values()[[0, 0]]);
    }

    #[test]
    fn test_proportional_samples_normalize_identically() {
        let counts = CountMatrix::new(
            array![[10.0, 20.0], [50.0, 100.0], [40.0, 80.0]],
            ids(&["g1", "g2", "g3"]),
            ids(&["s1", "s2"]),
        )
        .unwrap();
        let result = EdgeRNormalizer { prior_count: 0.0, ..Default::default() }
            .normalize(&counts, &[1000.0, 1000.0, 1000.0])
            .unwrap();
        for i in 0..3 {
            assert_relative_eq!(result.values()[[i, 0]], result.values()[[i, 1]], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let counts = CountMatrix::new(array![[1.0], [2.0]], ids(&["g1", "g2"]), ids(&["s1"])).unwrap();
        let err = EdgeRNormalizer::default().normalize(&counts, &[1000.0]);
        assert!(matches!(err, Err(PreproError::Alignment { .. })));
    }

    #[test]
    fn test_empty_library_is_a_normalization_error() {
        let counts = CountMatrix::new(array![[0.0, 5.0], [0.0, 9.0]], ids(&["g1", "g2"]), ids(&["s1", "s2"])).unwrap();
        match EdgeRNormalizer::default().normalize(&counts, &[1000.0, 1000.0]) {
            Err(PreproError::Normalization { reason }) => assert!(reason.contains("'s1'")),
            other => panic!("expected a normalization error, got {:?}", other.map(|_| ())),
        }
    }
}
