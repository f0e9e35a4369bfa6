//! Count matrix representation for raw RNA-seq read counts

use std::collections::HashSet;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use regex::Regex;

use crate::error::{PreproError, Result};

/// Selects which matrix columns hold samples (as opposed to stray metadata columns)
///
/// The pattern is anchored at the start of the column name, so `SJ.*ALL` selects
/// `SJBALL001` but not `xSJBALL001`.
#[derive(Debug, Clone)]
pub struct SampleSelector {
    pattern: String,
    regex: Regex,
}

impl SampleSelector {
    /// Compile a sample-column pattern
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{})", pattern))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as supplied by the caller
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check whether a column name is a sample column
    pub fn is_sample(&self, column: &str) -> bool {
        self.regex.is_match(column)
    }
}

/// A count matrix of raw read counts
/// Rows are genes, columns are samples
#[derive(Debug, Clone)]
pub struct CountMatrix {
    /// Raw count data (genes x samples)
    counts: Array2<f64>,
    /// Gene identifiers (symbols, accession ids or reference ids)
    gene_ids: Vec<String>,
    /// Sample identifiers
    sample_ids: Vec<String>,
}

impl CountMatrix {
    /// Create a new count matrix from raw data
    pub fn new(
        counts: Array2<f64>,
        gene_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let (n_genes, n_samples) = counts.dim();

        if gene_ids.len() != n_genes {
            return Err(PreproError::DimensionMismatch {
                expected: format!("{} gene IDs", n_genes),
                got: format!("{} gene IDs", gene_ids.len()),
            });
        }

        if sample_ids.len() != n_samples {
            return Err(PreproError::DimensionMismatch {
                expected: format!("{} sample IDs", n_samples),
                got: format!("{} sample IDs", sample_ids.len()),
            });
        }

        if counts.iter().any(|&x| x < 0.0 || !x.is_finite()) {
            return Err(PreproError::InvalidCountMatrix {
                reason: "Counts must be non-negative finite values".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for id in &gene_ids {
            if !seen.insert(id.as_str()) {
                log::warn!("Duplicate gene identifier '{}' in count matrix", id);
            }
        }

        Ok(Self {
            counts,
            gene_ids,
            sample_ids,
        })
    }

    /// All-zero matrix for the given genes and samples
    pub fn zeros(gene_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        let counts = Array2::zeros((gene_ids.len(), sample_ids.len()));
        Self::new(counts, gene_ids, sample_ids)
    }

    /// Get the number of genes
    pub fn n_genes(&self) -> usize {
        self.counts.nrows()
    }

    /// Get the number of samples
    pub fn n_samples(&self) -> usize {
        self.counts.ncols()
    }

    /// Get the raw counts as a view
    pub fn counts(&self) -> ArrayView2<'_, f64> {
        self.counts.view()
    }

    /// Get gene IDs
    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    /// Get sample IDs
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Get counts for a specific gene
    pub fn gene_counts(&self, gene_idx: usize) -> ArrayView1<'_, f64> {
        self.counts.row(gene_idx)
    }

    /// Get gene index by ID
    pub fn gene_index(&self, gene_id: &str) -> Option<usize> {
        self.gene_ids.iter().position(|id| id == gene_id)
    }

    /// Sum of counts per sample (library size)
    pub fn library_sizes(&self) -> Vec<f64> {
        self.counts
            .axis_iter(Axis(1))
            .map(|col| col.sum())
            .collect()
    }

    /// Keep only the sample columns accepted by `selector`, in their original order.
    /// An empty selection yields a matrix with zero sample columns.
    pub fn select_samples(&self, selector: &SampleSelector) -> Self {
        let keep: Vec<usize> = self
            .sample_ids
            .iter()
            .enumerate()
            .filter(|(_, id)| selector.is_sample(id))
            .map(|(j, _)| j)
            .collect();

        Self {
            counts: self.counts.select(Axis(1), &keep),
            gene_ids: self.gene_ids.clone(),
            sample_ids: keep.iter().map(|&j| self.sample_ids[j].clone()).collect(),
        }
    }
}
