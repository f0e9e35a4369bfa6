//! Merge per-sample count files (one `gene<TAB>count` file per sample) into one matrix

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use ndarray::Array2;

use crate::data::CountMatrix;
use crate::error::{PreproError, Result};

/// Options for [`concatenate_counts`]
#[derive(Debug, Clone)]
pub struct ConcatOptions {
    /// Field delimiter of the per-sample files
    pub delimiter: u8,
    /// Skip files whose name starts with any of these prefixes
    pub exclude_prefixes: Vec<String>,
}

impl Default for ConcatOptions {
    fn default() -> Self {
        Self {
            delimiter: b'\t',
            exclude_prefixes: Vec::new(),
        }
    }
}

/// Sample name of a per-sample count file: everything before the first `.`
pub fn sample_name_from_file(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or(file_name)
}

/// Concatenate every per-sample count file in `dir` into one genes x samples matrix
///
/// Files are read in name order and genes keep first-seen order. Samples are
/// sorted by name, genes absent from a sample count as zero, and counter summary
/// rows (ids starting with `__`) are dropped.
pub fn concatenate_counts<P: AsRef<Path>>(dir: P, options: &ConcatOptions) -> Result<CountMatrix> {
    let mut files: Vec<(String, std::path::PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir.as_ref())? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if options
            .exclude_prefixes
            .iter()
            .any(|p| file_name.starts_with(p.as_str()))
        {
            log::debug!("Skipping {}", file_name);
            continue;
        }
        files.push((file_name, entry.path()));
    }

    if files.is_empty() {
        return Err(PreproError::EmptyData {
            reason: format!("no count files found in {}", dir.as_ref().display()),
        });
    }
    files.sort();

    let mut samples: Vec<(String, HashMap<String, f64>)> = Vec::with_capacity(files.len());
    let mut gene_order: Vec<String> = Vec::new();
    let mut gene_seen: HashSet<String> = HashSet::new();

    for (file_name, path) in &files {
        let sample = sample_name_from_file(file_name).to_string();
        if samples.iter().any(|(s, _)| s == &sample) {
            return Err(PreproError::InvalidInput {
                reason: format!("sample name '{}' derived from more than one file", sample),
            });
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(options.delimiter)
            .trim(Trim::All)
            .from_path(path)?;

        let mut counts = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let gene = record.get(0).unwrap_or_default();
            if gene.is_empty() || gene.starts_with("__") {
                continue;
            }
            let field = record.get(1).unwrap_or_default();
            let value = field.parse::<f64>().map_err(|_| PreproError::InvalidCountMatrix {
                reason: format!("{}: invalid count '{}' for gene '{}'", file_name, field, gene),
            })?;
            if gene_seen.insert(gene.to_string()) {
                gene_order.push(gene.to_string());
            }
            counts.insert(gene.to_string(), value);
        }
        samples.push((sample, counts));
    }

    samples.sort_by(|a, b| a.0.cmp(&b.0));
    log::info!("  {} genes across {} samples", gene_order.len(), samples.len());

    let mut matrix = Array2::zeros((gene_order.len(), samples.len()));
    for (j, (_, counts)) in samples.iter().enumerate() {
        for (i, gene) in gene_order.iter().enumerate() {
            if let Some(&value) = counts.get(gene) {
                matrix[[i, j]] = value;
            }
        }
    }

    let sample_ids = samples.into_iter().map(|(s, _)| s).collect();
    CountMatrix::new(matrix, gene_order, sample_ids)
}
