//! Reconciliation of a raw count matrix onto the reference gene id space
//!
//! Every raw row is resolved to at most one reference id:
//! 1. the raw identifier is itself a reference id, otherwise
//! 2. its standardized name equals the standardized name of a reference gene;
//!    when several reference genes share that name, the first one (in table
//!    order) whose id is a valid reference id is taken.
//!
//! Rows resolving to the same id are summed, unresolved rows are dropped and
//! counted, and reference genes without any row are zero-filled.

use std::collections::{BTreeMap, HashMap, HashSet};

use ndarray::{Array1, Array2};
use serde::Serialize;

use super::standardize::{standardize_input_names, standardize_reference_names};
use crate::config::GeneFormat;
use crate::data::{CountMatrix, ReferenceTable, SampleSelector};
use crate::error::{PreproError, Result};
use crate::thesaurus::GeneThesaurus;

/// How a raw row was matched to its reference gene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The raw identifier is a reference id
    ById,
    /// Unique standardized-name match
    ByName,
    /// Standardized name shared by several reference genes
    ByAmbiguousName,
}

/// Counters describing one reconciliation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileStats {
    pub input_rows: usize,
    pub resolved_by_id: usize,
    pub resolved_by_name: usize,
    pub resolved_by_ambiguous_name: usize,
    /// Rows matching no reference gene, excluded from the output
    pub dropped_rows: usize,
    /// Reference genes that received more than one raw row
    pub merged_genes: usize,
    /// Reference genes that received no raw row
    pub missing_genes: usize,
    pub samples: usize,
}

/// Output of [`GeneReconciler::reconcile`]
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// One row per reference id, sorted ascending
    pub matrix: CountMatrix,
    /// Missing Gene Report: zero rows for reference ids without data
    pub missing: CountMatrix,
    pub stats: ReconcileStats,
}

/// Maps raw count rows onto reference gene ids
pub struct GeneReconciler<'a> {
    reference: &'a ReferenceTable,
    thesaurus: &'a dyn GeneThesaurus,
    format: GeneFormat,
    reference_names: Vec<String>,
    name_index: HashMap<String, Vec<usize>>,
}

impl<'a> GeneReconciler<'a> {
    pub fn new(reference: &'a ReferenceTable, thesaurus: &'a dyn GeneThesaurus, format: GeneFormat) -> Self {
        let reference_names = standardize_reference_names(reference, thesaurus);

        let mut name_index: HashMap<String, Vec<usize>> = HashMap::new();
        for (row, name) in reference_names.iter().enumerate() {
            name_index.entry(name.clone()).or_default().push(row);
        }

        Self {
            reference,
            thesaurus,
            format,
            reference_names,
            name_index,
        }
    }

    /// Standardized reference names, in reference table order
    pub fn reference_names(&self) -> &[String] {
        &self.reference_names
    }

    /// Resolve one raw row to a reference id
    pub fn resolve<'s>(&'s self, raw_id: &'s str, standard_name: &str) -> Option<(&'s str, Resolution)> {
        if self.reference.contains_id(raw_id) {
            return Some((raw_id, Resolution::ById));
        }

        let candidates = self.name_index.get(standard_name)?;
        let genes = self.reference.genes();

        if let [only] = candidates.as_slice() {
            return Some((genes[*only].id.as_str(), Resolution::ByName));
        }

        // TODO: paralogs sharing a symbol all collapse onto the first id; needs a
        // rule that uses chromosome or biotype once one is agreed on.
        let chosen = candidates
            .iter()
            .find(|&&row| self.reference.contains_id(&genes[row].id))
            .or_else(|| candidates.first())?;
        log::debug!(
            "'{}' ({}) matches {} reference genes, using {}",
            raw_id,
            standard_name,
            candidates.len(),
            genes[*chosen].id
        );
        Some((genes[*chosen].id.as_str(), Resolution::ByAmbiguousName))
    }

    /// Reconcile `counts` onto the reference, keeping only sample columns accepted by `selector`
    pub fn reconcile(&self, counts: &CountMatrix, selector: &SampleSelector) -> Result<Reconciliation> {
        let counts = counts.select_samples(selector);
        let n_samples = counts.n_samples();
        if n_samples == 0 {
            log::warn!("No column matches the sample pattern '{}'", selector.pattern());
        }

        let standard_names = standardize_input_names(counts.gene_ids(), self.format, self.thesaurus);

        let mut stats = ReconcileStats {
            input_rows: counts.n_genes(),
            samples: n_samples,
            ..Default::default()
        };
        let mut sums: BTreeMap<String, Array1<f64>> = BTreeMap::new();
        let mut merged: HashSet<String> = HashSet::new();

        for (i, (raw_id, name)) in counts.gene_ids().iter().zip(&standard_names).enumerate() {
            let (key, how) = match self.resolve(raw_id, name) {
                Some(resolved) => resolved,
                None => {
                    stats.dropped_rows += 1;
                    continue;
                }
            };

            match how {
                Resolution::ById => stats.resolved_by_id += 1,
                Resolution::ByName => stats.resolved_by_name += 1,
                Resolution::ByAmbiguousName => stats.resolved_by_ambiguous_name += 1,
            }

            let key = key.trim();
            if key.is_empty() || !self.reference.contains_id(key) {
                return Err(PreproError::Alignment {
                    reason: format!("row '{}' resolved to unusable reference key '{}'", raw_id, key),
                });
            }

            let row = counts.gene_counts(i);
            match sums.get_mut(key) {
                Some(acc) => {
                    *acc += &row;
                    merged.insert(key.to_string());
                }
                None => {
                    sums.insert(key.to_string(), row.to_owned());
                }
            }
        }

        if stats.dropped_rows > 0 {
            log::warn!(
                "{} of {} input rows matched no reference gene and were dropped",
                stats.dropped_rows,
                stats.input_rows
            );
        }

        let reference_ids = self.reference.sorted_ids();
        let mut matrix = Array2::zeros((reference_ids.len(), n_samples));
        let mut missing_ids = Vec::new();
        for (i, id) in reference_ids.iter().enumerate() {
            match sums.get(id) {
                Some(row) => matrix.row_mut(i).assign(row),
                None => missing_ids.push(id.clone()),
            }
        }

        stats.merged_genes = merged.len();
        stats.missing_genes = missing_ids.len();
        log::info!(
            "  {} reference genes, {} merged from duplicates, {} missing",
            reference_ids.len(),
            stats.merged_genes,
            stats.missing_genes
        );

        let sample_ids = counts.sample_ids().to_vec();
        Ok(Reconciliation {
            matrix: CountMatrix::new(matrix, reference_ids, sample_ids.clone())?,
            missing: CountMatrix::zeros(missing_ids, sample_ids)?,
            stats,
        })
    }
}
