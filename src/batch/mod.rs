//! Optional batch-effect correction of raw counts
//!
//! Correction backends only ever see a batch vector that is already aligned to
//! the matrix's sample columns; [`correct_batches`] owns that alignment.

mod combat;

pub use combat::RscriptComBatSeq;

use crate::data::{BatchAssignment, CountMatrix};
use crate::error::{PreproError, Result};

/// Removes batch effects from a raw count matrix
pub trait BatchCorrector {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Correct `counts`; `batches[j]` is the batch of sample column j
    fn correct(&self, counts: &CountMatrix, batches: &[String]) -> Result<CountMatrix>;
}

/// Batch labels reordered to the sample-column order of `counts`
pub fn align_batches(counts: &CountMatrix, assignment: &BatchAssignment) -> Result<Vec<String>> {
    assignment.align_to(counts.sample_ids())
}

/// Align batches, run the corrector and check its output keeps the matrix shape
pub fn correct_batches(
    counts: &CountMatrix,
    assignment: &BatchAssignment,
    corrector: &dyn BatchCorrector,
) -> Result<CountMatrix> {
    let batches = align_batches(counts, assignment)?;
    log::info!(
        "Correcting {} samples across {} batches with {}",
        counts.n_samples(),
        assignment.n_batches(),
        corrector.name()
    );

    let corrected = corrector.correct(counts, &batches)?;

    if corrected.sample_ids() != counts.sample_ids() || corrected.n_genes() != counts.n_genes() {
        return Err(PreproError::BatchCorrection {
            reason: format!(
                "{} returned a {}x{} matrix for a {}x{} input",
                corrector.name(),
                corrected.n_genes(),
                corrected.n_samples(),
                counts.n_genes(),
                counts.n_samples()
            ),
        });
    }
    Ok(corrected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::cell::RefCell;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    /// Records the batch vector and returns the input unchanged
    struct RecordingCorrector {
        seen: RefCell<Vec<String>>,
    }

    impl BatchCorrector for RecordingCorrector {
        fn name(&self) -> &str {
            "recording"
        }

        fn correct(&self, counts: &CountMatrix, batches: &[String]) -> Result<CountMatrix> {
            *self.seen.borrow_mut() = batches.to_vec();
            Ok(counts.clone())
        }
    }

    struct DroppingCorrector;

    impl BatchCorrector for DroppingCorrector {
        fn name(&self) -> &str {
            "dropping"
        }

        fn correct(&self, counts: &CountMatrix, _batches: &[String]) -> Result<CountMatrix> {
            CountMatrix::new(
                counts.counts().slice(ndarray::s![.., ..1]).to_owned(),
                counts.gene_ids().to_vec(),
                counts.sample_ids()[..1].to_vec(),
            )
        }
    }

    fn matrix() -> CountMatrix {
        CountMatrix::new(
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            strings(&["g1", "g2"]),
            strings(&["s3", "s1", "s2"]),
        )
        .unwrap()
    }

    #[test]
    fn test_batches_follow_matrix_column_order() {
        let assignment = BatchAssignment::new(
            strings(&["s1", "s2", "s3", "s9"]),
            strings(&["A", "B", "C", "A"]),
        )
        .unwrap();
        let corrector = RecordingCorrector { seen: RefCell::new(Vec::new()) };

        correct_batches(&matrix(), &assignment, &corrector).unwrap();
        assert_eq!(*corrector.seen.borrow(), strings(&["C", "A", "B"]));
    }

    #[test]
    fn test_unassigned_sample_fails_before_correction() {
        let assignment = BatchAssignment::new(strings(&["s1", "s2"]), strings(&["A", "B"])).unwrap();
        let corrector = RecordingCorrector { seen: RefCell::new(Vec::new()) };

        let err = correct_batches(&matrix(), &assignment, &corrector);
        assert!(matches!(err, Err(PreproError::Alignment { .. })));
        assert!(corrector.seen.borrow().is_empty());
    }

    #[test]
    fn test_reshaped_output_rejected() {
        let assignment = BatchAssignment::new(strings(&["s1", "s2", "s3"]), strings(&["A", "B", "A"])).unwrap();
        let err = correct_batches(&matrix(), &assignment, &DroppingCorrector);
        assert!(matches!(err, Err(PreproError::BatchCorrection { .. })));
    }
}
