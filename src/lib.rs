//! allium_prepro: data preparation for the ALLIUM leukemia subtype classifier
//!
//! Turns raw RNA-seq count matrices from heterogeneous public datasets into a
//! canonical sample x gene feature matrix, and dataset-specific diagnosis
//! fields into canonical subtype labels.
//!
//! # Example
//!
//! ```ignore
//! use allium_prepro::prelude::*;
//!
//! let thesaurus = HgncThesaurus::load_or_fetch(std::env::temp_dir())?;
//! let normalizer = EdgeRNormalizer::default();
//! let config = PreprocessorConfig::new("jude", "jude.counts.raw.csv", "out", GeneFormat::Symbol, "SJ");
//!
//! let summary = GexPreprocessor::new(config, &thesaurus, &normalizer, None)?.run()?;
//! println!("{} genes missing", summary.reconciliation.missing_genes);
//! ```

pub mod batch;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod normalization;
pub mod output;
pub mod pipeline;
pub mod reconcile;
pub mod reference;
pub mod stats;
pub mod subtype;
pub mod thesaurus;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::batch::{align_batches, correct_batches, BatchCorrector, RscriptComBatSeq};
    pub use crate::config::{GeneFormat, PreprocessorConfig};
    pub use crate::data::{BatchAssignment, CountMatrix, ExpressionMatrix, ReferenceGene, ReferenceTable, SampleSelector};
    pub use crate::error::{PreproError, Result};
    pub use crate::io::{
        concatenate_counts, read_batches, read_count_matrix, read_reference, write_count_matrix, ConcatOptions,
    };
    pub use crate::normalization::{EdgeRNormalizer, ExpressionNormalizer};
    pub use crate::pipeline::{GexPreprocessor, RunSummary};
    pub use crate::reconcile::{GeneReconciler, ReconcileStats, Reconciliation};
    pub use crate::reference::ReferenceBuilder;
    pub use crate::subtype::{parse_jude_phenotypes, JudePhenotypeParser, SubtypeThesaurus, Translation};
    pub use crate::thesaurus::{GeneThesaurus, HgncThesaurus, IdKind, StaticThesaurus};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use crate::io::write_reference;
    use crate::reference::filtered_annotation_path;
    use approx::assert_relative_eq;
    use ndarray::array;
    use tempfile::tempdir;

    fn gene(id: &str, name: &str, length: u64) -> ReferenceGene {
        ReferenceGene {
            id: id.to_string(),
            chr: "1".to_string(),
            name: name.to_string(),
            biotype: "protein_coding".to_string(),
            length,
        }
    }

    #[test]
    fn test_full_pipeline() {
        let dir = tempdir().unwrap();
        let ref_dir = dir.path().join("reference");
        std::fs::create_dir_all(&ref_dir).unwrap();
        let genes = vec![gene("ENSG001", "GENEA", 1000), gene("ENSG002", "GENEB", 500)];
        write_reference(filtered_annotation_path(&ref_dir, "GRCh38.test"), &genes).unwrap();

        // one row keyed by the reference id, one by an outdated symbol of the same gene
        let input = dir.path().join("raw.csv");
        std::fs::write(&input, "gene,S1,S2,notes\nENSG001,10,20,a\nOLDA,5,0,b\n").unwrap();

        let thesaurus = StaticThesaurus::new().with_symbol_update("OLDA", "GENEA");
        let normalizer = EdgeRNormalizer::default();

        let reference = read_reference(filtered_annotation_path(&ref_dir, "GRCh38.test")).unwrap();
        let selector = SampleSelector::new("S[0-9]").unwrap();
        let raw = read_count_matrix(&input, b',', &selector).unwrap();
        let reconciled = GeneReconciler::new(&reference, &thesaurus, GeneFormat::Symbol)
            .reconcile(&raw, &selector)
            .unwrap();
        assert_eq!(reconciled.matrix.gene_ids(), &["ENSG001".to_string(), "ENSG002".to_string()]);
        assert_eq!(reconciled.matrix.counts(), array![[15.0, 20.0], [0.0, 0.0]]);

        let mut config = PreprocessorConfig::new("ds", &input, dir.path().join("out"), GeneFormat::Symbol, "S[0-9]");
        config.ref_genome = "GRCh38.test".to_string();
        config.ref_data_dir = Some(ref_dir);

        let summary = GexPreprocessor::new(config.clone(), &thesaurus, &normalizer, None)
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(summary.reconciliation.resolved_by_id, 1);
        assert_eq!(summary.reconciliation.resolved_by_name, 1);
        assert_eq!(summary.reconciliation.missing_genes, 1);
        assert_eq!(summary.reconciliation.samples, 2);

        let text = std::fs::read_to_string(config.output_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "id,ENSG001,ENSG002");

        // equal TMM factors; log-CPM with prior 2 scaled by library size
        let s1: Vec<f64> = lines[1].split(',').skip(1).map(|v| v.parse().unwrap()).collect();
        let prior = 2.0 * 15.0 / 17.5;
        assert_relative_eq!(s1[0], ((15.0 + prior) / (15.0 + 2.0 * prior) * 1e6_f64).log2(), epsilon = 1e-9);
        assert_relative_eq!(s1[1], (prior / (15.0 + 2.0 * prior) * 1e6_f64).log2(), epsilon = 1e-9);

        let missing = std::fs::read_to_string(config.missing_genes_path()).unwrap();
        assert_eq!(missing, "id,S1,S2\nENSG002,0,0\n");

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(config.summary_path()).unwrap()).unwrap();
        assert_eq!(json["reconciliation"]["dropped_rows"], 0);
        assert_eq!(json["gene_format"], "symbol");
    }
}
