//! ComBat-seq through an `Rscript` subprocess

use std::path::{Path, PathBuf};
use std::process::Command;

use csv::WriterBuilder;

use super::BatchCorrector;
use crate::data::{CountMatrix, SampleSelector};
use crate::error::{PreproError, Result};
use crate::io::{read_count_matrix, write_count_matrix};

/// R program run with `Rscript -e`; arguments are input, batches, output
const COMBAT_SEQ_SCRIPT: &str = r#"
args <- commandArgs(trailingOnly = TRUE)
suppressPackageStartupMessages(library(sva))
x <- read.csv(args[1], row.names = 1, header = TRUE, check.names = FALSE)
batches <- read.csv(args[2], row.names = 1, header = TRUE, check.names = FALSE)
batches <- batches[colnames(x), , drop = FALSE]
corrected <- ComBat_seq(as.matrix(x), batch = batches$batch)
write.csv(corrected, args[3])
"#;

/// sva `ComBat_seq` run in an external R process
///
/// Scratch files live in `scratch_dir` under `prefix` and are removed once the
/// corrected matrix has been read back.
#[derive(Debug, Clone)]
pub struct RscriptComBatSeq {
    rscript: PathBuf,
    scratch_dir: PathBuf,
    prefix: String,
}

impl RscriptComBatSeq {
    pub fn new(scratch_dir: impl Into<PathBuf>, prefix: &str) -> Self {
        Self {
            rscript: PathBuf::from("Rscript"),
            scratch_dir: scratch_dir.into(),
            prefix: prefix.to_string(),
        }
    }

    /// Use a specific `Rscript` executable
    pub fn with_rscript(mut self, rscript: impl Into<PathBuf>) -> Self {
        self.rscript = rscript.into();
        self
    }

    fn scratch(&self, suffix: &str) -> PathBuf {
        self.scratch_dir.join(format!("{}.tmp.combat_seq.{}", self.prefix, suffix))
    }
}

fn write_batch_table(path: &Path, sample_ids: &[String], batches: &[String]) -> Result<()> {
    let mut writer = WriterBuilder::new().from_path(path)?;
    writer.write_record(["id", "batch"])?;
    for (id, batch) in sample_ids.iter().zip(batches) {
        writer.write_record([id, batch])?;
    }
    writer.flush()?;
    Ok(())
}

impl BatchCorrector for RscriptComBatSeq {
    fn name(&self) -> &str {
        "ComBat_seq"
    }

    fn correct(&self, counts: &CountMatrix, batches: &[String]) -> Result<CountMatrix> {
        if batches.len() != counts.n_samples() {
            return Err(PreproError::Alignment {
                reason: format!("{} batch labels for {} samples", batches.len(), counts.n_samples()),
            });
        }

        let input = self.scratch("input.csv");
        let batch_file = self.scratch("batches.csv");
        let output = self.scratch("output.csv");

        write_count_matrix(&input, counts)?;
        write_batch_table(&batch_file, counts.sample_ids(), batches)?;

        log::debug!("Running {} -e <ComBat_seq> {}", self.rscript.display(), input.display());
        let result = Command::new(&self.rscript)
            .arg("-e")
            .arg(COMBAT_SEQ_SCRIPT)
            .arg(&input)
            .arg(&batch_file)
            .arg(&output)
            .output()
            .map_err(|e| PreproError::BatchCorrection {
                reason: format!("failed to start {}: {}", self.rscript.display(), e),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(PreproError::BatchCorrection {
                reason: format!("ComBat_seq exited with {}: {}", result.status, stderr.trim()),
            });
        }

        let corrected = read_count_matrix(&output, b',', &SampleSelector::new("")?)?;
        for path in [&input, &batch_file, &output] {
            std::fs::remove_file(path)?;
        }
        Ok(corrected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::tempdir;

    #[test]
    fn test_missing_rscript_is_a_batch_correction_error() {
        let dir = tempdir().unwrap();
        let counts = CountMatrix::new(
            array![[1.0, 2.0]],
            vec!["g1".to_string()],
            vec!["s1".to_string(), "s2".to_string()],
        )
        .unwrap();
        let corrector = RscriptComBatSeq::new(dir.path(), "run").with_rscript(dir.path().join("no-such-Rscript"));

        let err = corrector.correct(&counts, &["A".to_string(), "B".to_string()]);
        assert!(matches!(err, Err(PreproError::BatchCorrection { .. })));
        // scratch inputs are left behind for diagnosis
        assert!(dir.path().join("run.tmp.combat_seq.batches.csv").exists());
    }
}
