//! Run configuration for the preprocessing pipeline

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PreproError, Result};
use crate::reference::{filtered_annotation_path, DEFAULT_REF_DIR, DEFAULT_REF_GENOME};

/// Kind of identifier in the first column of the raw count matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneFormat {
    /// Gene symbols, updated to the current approved symbol
    Symbol,
    /// Ensembl gene ids, translated to symbols
    Ensembl,
}

impl FromStr for GeneFormat {
    type Err = PreproError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "symbol" => Ok(GeneFormat::Symbol),
            "ensembl" => Ok(GeneFormat::Ensembl),
            other => Err(PreproError::InvalidConfig {
                reason: format!("gene format must be either \"symbol\" or \"ensembl\", got \"{}\"", other),
            }),
        }
    }
}

impl fmt::Display for GeneFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneFormat::Symbol => write!(f, "symbol"),
            GeneFormat::Ensembl => write!(f, "ensembl"),
        }
    }
}

/// Configuration of one preprocessing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessorConfig {
    /// Dataset prefix used for every output file name
    pub prefix: String,
    /// Raw count matrix
    pub input_file: PathBuf,
    /// Directory receiving outputs and intermediate files
    pub output_dir: PathBuf,
    /// Identifier kind of the count matrix rows
    pub gene_format: GeneFormat,
    /// Regular expression selecting sample columns, anchored at the start
    pub sample_col_regex: String,
    /// Field delimiter of the count matrix
    #[serde(default = "default_separator")]
    pub separator: char,
    /// Optional batch assignment file; enables batch correction
    #[serde(default)]
    pub batches_file: Option<PathBuf>,
    /// Reference genome release tag
    #[serde(default = "default_ref_genome")]
    pub ref_genome: String,
    /// Directory holding the filtered reference annotation
    #[serde(default)]
    pub ref_data_dir: Option<PathBuf>,
    /// Cache directory for the identifier thesaurus
    #[serde(default = "std::env::temp_dir")]
    pub tmp_dir: PathBuf,
}

fn default_separator() -> char {
    ','
}

fn default_ref_genome() -> String {
    DEFAULT_REF_GENOME.to_string()
}

impl PreprocessorConfig {
    /// Configuration with defaults for everything but the required inputs
    pub fn new(
        prefix: &str,
        input_file: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        gene_format: GeneFormat,
        sample_col_regex: &str,
    ) -> Self {
        Self {
            prefix: prefix.to_string(),
            input_file: input_file.into(),
            output_dir: output_dir.into(),
            gene_format,
            sample_col_regex: sample_col_regex.to_string(),
            separator: default_separator(),
            batches_file: None,
            ref_genome: default_ref_genome(),
            ref_data_dir: None,
            tmp_dir: std::env::temp_dir(),
        }
    }

    /// Check fields that can be validated without touching the filesystem
    pub fn validate(&self) -> Result<()> {
        if self.prefix.trim().is_empty() {
            return Err(PreproError::InvalidConfig {
                reason: "prefix must not be empty".to_string(),
            });
        }
        if self.prefix.contains(std::path::MAIN_SEPARATOR) {
            return Err(PreproError::InvalidConfig {
                reason: format!("prefix '{}' must not contain a path separator", self.prefix),
            });
        }
        if !self.separator.is_ascii() {
            return Err(PreproError::InvalidConfig {
                reason: format!("separator '{}' must be a single ASCII character", self.separator),
            });
        }
        Ok(())
    }

    /// Field delimiter as a byte
    pub fn delimiter(&self) -> u8 {
        self.separator as u8
    }

    /// Filtered reference annotation for this run
    pub fn annotation_path(&self) -> PathBuf {
        let dir = self
            .ref_data_dir
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_REF_DIR));
        filtered_annotation_path(dir, &self.ref_genome)
    }

    fn output(&self, suffix: &str) -> PathBuf {
        self.output_dir.join(format!("{}.{}", self.prefix, suffix))
    }

    /// Final sample x gene matrix
    pub fn output_path(&self) -> PathBuf {
        self.output("counts.allium.csv")
    }

    /// Missing Gene Report
    pub fn missing_genes_path(&self) -> PathBuf {
        self.output("missing_genes.csv")
    }

    /// Run summary
    pub fn summary_path(&self) -> PathBuf {
        self.output("prepro_summary.json")
    }

    /// Intermediate: reconciled raw counts
    pub fn filtered_path(&self) -> PathBuf {
        self.output("tmp.counts.filtered.csv")
    }

    /// Intermediate: normalized gene x sample matrix
    pub fn normalized_path(&self) -> PathBuf {
        self.output("tmp.counts.norm.csv")
    }

    /// Intermediate: batch-corrected raw counts, present only with a batch file
    pub fn batch_corrected_path(&self) -> Option<PathBuf> {
        self.batches_file
            .as_ref()
            .map(|_| self.output("tmp.counts.batch_corrected.csv"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gene_format_parsing() {
        assert_eq!("symbol".parse::<GeneFormat>().unwrap(), GeneFormat::Symbol);
        assert_eq!("ensembl".parse::<GeneFormat>().unwrap(), GeneFormat::Ensembl);
        let err = "entrez".parse::<GeneFormat>().unwrap_err();
        assert!(matches!(err, PreproError::InvalidConfig { .. }));
        assert!("Symbol".parse::<GeneFormat>().is_err());
    }

    #[test]
    fn test_output_paths() {
        let mut config = PreprocessorConfig::new("jude", "raw.csv", "/out", GeneFormat::Symbol, "^SJ");
        assert_eq!(config.output_path(), Path::new("/out/jude.counts.allium.csv"));
        assert_eq!(config.missing_genes_path(), Path::new("/out/jude.missing_genes.csv"));
        assert_eq!(config.filtered_path(), Path::new("/out/jude.tmp.counts.filtered.csv"));
        assert!(config.batch_corrected_path().is_none());

        config.batches_file = Some("batches.csv".into());
        assert_eq!(
            config.batch_corrected_path().unwrap(),
            Path::new("/out/jude.tmp.counts.batch_corrected.csv")
        );
    }

    #[test]
    fn test_annotation_path_override() {
        let mut config = PreprocessorConfig::new("x", "raw.csv", "out", GeneFormat::Ensembl, ".*");
        assert_eq!(
            config.annotation_path(),
            Path::new("data/reference/Homo_sapiens.GRCh38.103.allium.annotations.filtered.csv")
        );
        config.ref_data_dir = Some("/refs".into());
        config.ref_genome = "Homo_sapiens.GRCh38.110".to_string();
        assert_eq!(
            config.annotation_path(),
            Path::new("/refs/Homo_sapiens.GRCh38.110.allium.annotations.filtered.csv")
        );
    }

    #[test]
    fn test_validate_rejects_empty_prefix() {
        let config = PreprocessorConfig::new(" ", "raw.csv", "out", GeneFormat::Symbol, ".*");
        assert!(config.validate().is_err());
    }
}
