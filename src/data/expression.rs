//! Normalized expression values (log-scale, may be negative)

use ndarray::{Array2, ArrayView2};

use crate::error::{PreproError, Result};

/// Genes x samples matrix of normalized expression values
#[derive(Debug, Clone)]
pub struct ExpressionMatrix {
    values: Array2<f64>,
    gene_ids: Vec<String>,
    sample_ids: Vec<String>,
}

impl ExpressionMatrix {
    /// Wrap a normalized matrix, checking its labels fit its shape
    pub fn new(values: Array2<f64>, gene_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        let (n_genes, n_samples) = values.dim();
        if gene_ids.len() != n_genes || sample_ids.len() != n_samples {
            return Err(PreproError::DimensionMismatch {
                expected: format!("{} genes x {} samples", n_genes, n_samples),
                got: format!("{} gene IDs x {} sample IDs", gene_ids.len(), sample_ids.len()),
            });
        }
        Ok(Self {
            values,
            gene_ids,
            sample_ids,
        })
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn n_genes(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.values.ncols()
    }
}
