//! The preprocessing pipeline: optional batch correction, gene reconciliation,
//! normalization and formatting for ALLIUM.

use std::path::PathBuf;

use serde::Serialize;

use crate::batch::{correct_batches, BatchCorrector};
use crate::config::{GeneFormat, PreprocessorConfig};
use crate::data::{CountMatrix, ExpressionMatrix, ReferenceTable, SampleSelector};
use crate::error::{PreproError, Result};
use crate::io::{
    read_batches, read_count_matrix, read_reference, write_count_matrix, write_expression_matrix, write_missing_genes,
};
use crate::normalization::ExpressionNormalizer;
use crate::output::{cleanup_intermediates, format_for_allium};
use crate::reconcile::{GeneReconciler, ReconcileStats};
use crate::thesaurus::GeneThesaurus;

/// Written next to the output as `<prefix>.prepro_summary.json`
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub prefix: String,
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    pub missing_genes_file: PathBuf,
    pub gene_format: GeneFormat,
    pub normalizer: String,
    pub batch_corrected: bool,
    pub reconciliation: ReconcileStats,
}

/// One preprocessing run over a single dataset
pub struct GexPreprocessor<'a> {
    config: PreprocessorConfig,
    selector: SampleSelector,
    thesaurus: &'a dyn GeneThesaurus,
    normalizer: &'a dyn ExpressionNormalizer,
    corrector: Option<&'a dyn BatchCorrector>,
}

impl<'a> GexPreprocessor<'a> {
    /// Validate the configuration and compile the sample-column pattern
    ///
    /// A batch file requires a `corrector`. No file is touched until [`run`](Self::run).
    pub fn new(
        config: PreprocessorConfig,
        thesaurus: &'a dyn GeneThesaurus,
        normalizer: &'a dyn ExpressionNormalizer,
        corrector: Option<&'a dyn BatchCorrector>,
    ) -> Result<Self> {
        config.validate()?;
        if config.batches_file.is_some() && corrector.is_none() {
            return Err(PreproError::InvalidConfig {
                reason: "a batch file was given but no batch correction backend is configured".to_string(),
            });
        }
        let selector = SampleSelector::new(&config.sample_col_regex)?;
        Ok(Self {
            config,
            selector,
            thesaurus,
            normalizer,
            corrector,
        })
    }

    /// Run every stage; intermediates are removed only when all stages succeed
    pub fn run(&self) -> Result<RunSummary> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let mut counts = read_count_matrix(&self.config.input_file, self.config.delimiter(), &self.selector)?;
        log::info!(
            "Loaded {} genes x {} samples from {}",
            counts.n_genes(),
            counts.n_samples(),
            self.config.input_file.display()
        );

        if let (Some(corrector), Some(batches_file)) = (self.corrector, &self.config.batches_file) {
            counts = self.correct_batches(&counts, batches_file, corrector)?;
        }

        let reference = read_reference(self.config.annotation_path())?;
        let (filtered, stats) = self.preprocess_genes(&counts, &reference)?;
        let expression = self.normalize(&filtered, &reference)?;

        log::info!("Formatting data for ALLIUM...");
        format_for_allium(self.config.output_path(), &expression)?;

        let summary = RunSummary {
            prefix: self.config.prefix.clone(),
            input_file: self.config.input_file.clone(),
            output_file: self.config.output_path(),
            missing_genes_file: self.config.missing_genes_path(),
            gene_format: self.config.gene_format,
            normalizer: self.normalizer.name().to_string(),
            batch_corrected: self.config.batches_file.is_some(),
            reconciliation: stats,
        };
        let file = std::fs::File::create(self.config.summary_path())?;
        serde_json::to_writer_pretty(file, &summary)?;

        self.cleanup()?;
        Ok(summary)
    }

    fn correct_batches(
        &self,
        counts: &CountMatrix,
        batches_file: &std::path::Path,
        corrector: &dyn BatchCorrector,
    ) -> Result<CountMatrix> {
        log::info!("Correcting batch effects...");
        let assignment = read_batches(batches_file)?;
        let corrected = correct_batches(counts, &assignment, corrector)?;
        if let Some(path) = self.config.batch_corrected_path() {
            write_count_matrix(path, &corrected)?;
        }
        Ok(corrected)
    }

    fn preprocess_genes(&self, counts: &CountMatrix, reference: &ReferenceTable) -> Result<(CountMatrix, ReconcileStats)> {
        log::info!("Preprocessing genes...");
        let reconciler = GeneReconciler::new(reference, self.thesaurus, self.config.gene_format);
        let result = reconciler.reconcile(counts, &self.selector)?;

        write_count_matrix(self.config.filtered_path(), &result.matrix)?;
        write_missing_genes(self.config.missing_genes_path(), &result.missing)?;
        if result.stats.missing_genes > 0 {
            log::info!(
                "{} reference genes had no data and were zero-filled (see {})",
                result.stats.missing_genes,
                self.config.missing_genes_path().display()
            );
        }
        Ok((result.matrix, result.stats))
    }

    fn normalize(&self, counts: &CountMatrix, reference: &ReferenceTable) -> Result<ExpressionMatrix> {
        log::info!("Normalizing data...");
        let lengths = reference.lengths_for(counts.gene_ids())?;
        let expression = self.normalizer.normalize(counts, &lengths)?;
        write_expression_matrix(self.config.normalized_path(), &expression)?;
        Ok(expression)
    }

    fn cleanup(&self) -> Result<()> {
        let mut paths = vec![self.config.filtered_path(), self.config.normalized_path()];
        paths.extend(self.config.batch_corrected_path());
        let removed = cleanup_intermediates(&paths)?;
        log::debug!("Removed {} intermediate files", removed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ReferenceGene;
    use crate::io::write_reference;
    use crate::normalization::EdgeRNormalizer;
    use crate::reference::filtered_annotation_path;
    use crate::thesaurus::StaticThesaurus;
    use std::path::Path;
    use tempfile::tempdir;

    struct FailingNormalizer;

    impl ExpressionNormalizer for FailingNormalizer {
        fn name(&self) -> &str {
            "failing"
        }

        fn normalize(&self, _counts: &CountMatrix, _lengths: &[f64]) -> Result<ExpressionMatrix> {
            Err(PreproError::Normalization {
                reason: "backend unavailable".to_string(),
            })
        }
    }

    fn setup(dir: &Path) -> PreprocessorConfig {
        let ref_dir = dir.join("reference");
        std::fs::create_dir_all(&ref_dir).unwrap();
        let genes = vec![
            ReferenceGene {
                id: "ENSG001".into(),
                chr: "1".into(),
                name: "GENEA".into(),
                biotype: "protein_coding".into(),
                length: 1000,
            },
            ReferenceGene {
                id: "ENSG002".into(),
                chr: "2".into(),
                name: "GENEB".into(),
                biotype: "protein_coding".into(),
                length: 2000,
            },
        ];
        write_reference(filtered_annotation_path(&ref_dir, "test"), &genes).unwrap();

        let input = dir.join("raw.csv");
        std::fs::write(&input, "gene,S1,S2\nGENEA,15,30\nGENEB,40,10\n").unwrap();

        let mut config = PreprocessorConfig::new("ds", input, dir.join("out"), GeneFormat::Symbol, "S");
        config.ref_genome = "test".into();
        config.ref_data_dir = Some(ref_dir);
        config
    }

    #[test]
    fn test_invalid_regex_fails_before_io() {
        let thesaurus = StaticThesaurus::new();
        let normalizer = EdgeRNormalizer::default();
        let config = PreprocessorConfig::new("ds", "/nonexistent/raw.csv", "/nonexistent/out", GeneFormat::Symbol, "S(");
        let err = GexPreprocessor::new(config, &thesaurus, &normalizer, None);
        assert!(matches!(err, Err(PreproError::RegexError(_))));
    }

    #[test]
    fn test_successful_run_removes_intermediates() {
        let dir = tempdir().unwrap();
        let config = setup(dir.path());
        let thesaurus = StaticThesaurus::new();
        let normalizer = EdgeRNormalizer::default();
        let pipeline = GexPreprocessor::new(config.clone(), &thesaurus, &normalizer, None).unwrap();

        let summary = pipeline.run().unwrap();
        assert_eq!(summary.reconciliation.resolved_by_name, 2);
        assert!(config.output_path().exists());
        assert!(config.summary_path().exists());
        assert!(config.missing_genes_path().exists());
        assert!(!config.filtered_path().exists());
        assert!(!config.normalized_path().exists());

        let report = std::fs::read_to_string(config.missing_genes_path()).unwrap();
        assert!(report.starts_with("id,S1,S2"));
    }

    #[test]
    fn test_failed_run_keeps_intermediates() {
        let dir = tempdir().unwrap();
        let config = setup(dir.path());
        let thesaurus = StaticThesaurus::new();
        let pipeline = GexPreprocessor::new(config.clone(), &thesaurus, &FailingNormalizer, None).unwrap();

        let err = pipeline.run();
        assert!(matches!(err, Err(PreproError::Normalization { .. })));
        assert!(config.filtered_path().exists());
        assert!(!config.output_path().exists());
    }

    struct IdentityCorrector;

    impl BatchCorrector for IdentityCorrector {
        fn name(&self) -> &str {
            "identity"
        }

        fn correct(&self, counts: &CountMatrix, _batches: &[String]) -> Result<CountMatrix> {
            Ok(counts.clone())
        }
    }

    #[test]
    fn test_batch_file_requires_backend() {
        let dir = tempdir().unwrap();
        let mut config = setup(dir.path());
        config.batches_file = Some(dir.path().join("batches.csv"));
        let thesaurus = StaticThesaurus::new();
        let normalizer = EdgeRNormalizer::default();

        let err = GexPreprocessor::new(config.clone(), &thesaurus, &normalizer, None);
        assert!(matches!(err, Err(PreproError::InvalidConfig { .. })));
        assert!(!config.output_dir.exists());

        let corrector = IdentityCorrector;
        assert!(GexPreprocessor::new(config, &thesaurus, &normalizer, Some(&corrector)).is_ok());
    }
}
