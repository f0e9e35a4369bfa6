//! Batch assignments for optional batch-effect correction

use std::collections::{HashMap, HashSet};

use crate::error::{PreproError, Result};

/// Sample -> batch label table, in file order
#[derive(Debug, Clone)]
pub struct BatchAssignment {
    sample_ids: Vec<String>,
    batches: Vec<String>,
}

impl BatchAssignment {
    /// Create a batch table
    pub fn new(sample_ids: Vec<String>, batches: Vec<String>) -> Result<Self> {
        if sample_ids.len() != batches.len() {
            return Err(PreproError::DimensionMismatch {
                expected: format!("{} batch labels", sample_ids.len()),
                got: format!("{} batch labels", batches.len()),
            });
        }

        let mut seen = HashSet::new();
        for id in &sample_ids {
            if !seen.insert(id) {
                log::warn!("Duplicate sample ID in batch file: '{}'. The first entry is used.", id);
            }
        }

        Ok(Self { sample_ids, batches })
    }

    /// Sample ids in file order
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Number of distinct batch labels
    pub fn n_batches(&self) -> usize {
        self.batches.iter().collect::<HashSet<_>>().len()
    }

    /// Batch labels reordered to match `sample_order` exactly
    ///
    /// Every sample of the count matrix must have a batch; extra samples in the
    /// batch file are ignored.
    pub fn align_to(&self, sample_order: &[String]) -> Result<Vec<String>> {
        let mut lookup: HashMap<&str, &str> = HashMap::with_capacity(self.sample_ids.len());
        for (id, batch) in self.sample_ids.iter().zip(&self.batches) {
            lookup.entry(id.as_str()).or_insert(batch.as_str());
        }

        let missing: Vec<&str> = sample_order
            .iter()
            .filter(|id| !lookup.contains_key(id.as_str()))
            .map(|id| id.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(PreproError::Alignment {
                reason: format!(
                    "{} sample(s) have no batch assignment: {}",
                    missing.len(),
                    missing.join(", ")
                ),
            });
        }

        Ok(sample_order
            .iter()
            .map(|id| lookup[id.as_str()].to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_align_reorders_to_matrix_columns() {
        let batches = BatchAssignment::new(strings(&["s3", "s1", "s2"]), strings(&["b2", "b1", "b1"])).unwrap();
        let aligned = batches.align_to(&strings(&["s1", "s2", "s3"])).unwrap();
        assert_eq!(aligned, strings(&["b1", "b1", "b2"]));
        assert_eq!(batches.n_batches(), 2);
    }

    #[test]
    fn test_align_ignores_extra_samples() {
        let batches = BatchAssignment::new(strings(&["s1", "s2", "extra"]), strings(&["a", "b", "c"])).unwrap();
        let aligned = batches.align_to(&strings(&["s2", "s1"])).unwrap();
        assert_eq!(aligned, strings(&["b", "a"]));
    }

    #[test]
    fn test_align_missing_sample_is_fatal() {
        let batches = BatchAssignment::new(strings(&["s1"]), strings(&["a"])).unwrap();
        let result = batches.align_to(&strings(&["s1", "s2"]));
        assert!(matches!(result, Err(PreproError::Alignment { .. })));
    }
}
