//! Thesaurus backed by the HGNC complete set

use std::collections::{HashMap, HashSet};
use std::path::Path;

use csv::{ReaderBuilder, Trim};

use super::{strip_version, GeneThesaurus, IdKind};
use crate::error::{PreproError, Result};
use crate::reference::download_once;

/// Download location of the HGNC complete set
pub const HGNC_COMPLETE_SET_URL: &str =
    "https://storage.googleapis.com/public-download-files/hgnc/tsv/tsv/hgnc_complete_set.txt";

/// File name of the cached HGNC complete set
pub const HGNC_FILE_NAME: &str = "hgnc_complete_set.txt";

/// Symbol thesaurus built from the HGNC complete set
///
/// Current symbols resolve to themselves. Previous symbols take precedence over
/// alias symbols, and the first record wins when an old symbol was reused.
#[derive(Debug, Clone, Default)]
pub struct HgncThesaurus {
    current: HashSet<String>,
    previous: HashMap<String, String>,
    aliases: HashMap<String, String>,
    ensembl_to_symbol: HashMap<String, String>,
    symbol_to_ensembl: HashMap<String, String>,
}

impl HgncThesaurus {
    /// Load a cached complete set from `cache_dir`, downloading it once if absent
    pub fn load_or_fetch<P: AsRef<Path>>(cache_dir: P) -> Result<Self> {
        let path = cache_dir.as_ref().join(HGNC_FILE_NAME);
        download_once(HGNC_COMPLETE_SET_URL, &path)?;
        Self::from_file(&path)
    }

    /// Load the tab-separated HGNC complete set
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .trim(Trim::All)
            .from_path(path)?;

        let header = reader.headers()?.clone();
        let column = |name: &str| -> Result<usize> {
            header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| PreproError::InvalidInput {
                    reason: format!("{} has no '{}' column", path.display(), name),
                })
        };
        let symbol_col = column("symbol")?;
        let ensembl_col = column("ensembl_gene_id")?;
        let prev_col = column("prev_symbol")?;
        let alias_col = column("alias_symbol")?;

        let mut thesaurus = Self::default();
        for record in reader.records() {
            let record = record?;
            let field = |i: usize| record.get(i).unwrap_or_default();
            thesaurus.add_record(
                field(symbol_col),
                field(ensembl_col),
                &split_multi(field(prev_col)),
                &split_multi(field(alias_col)),
            );
        }

        log::info!(
            "Loaded {} approved symbols from {}",
            thesaurus.current.len(),
            path.display()
        );
        Ok(thesaurus)
    }

    fn add_record(&mut self, symbol: &str, ensembl_id: &str, previous: &[&str], aliases: &[&str]) {
        if symbol.is_empty() {
            return;
        }
        self.current.insert(symbol.to_string());

        if !ensembl_id.is_empty() {
            self.ensembl_to_symbol
                .entry(strip_version(ensembl_id).to_string())
                .or_insert_with(|| symbol.to_string());
            self.symbol_to_ensembl
                .entry(symbol.to_string())
                .or_insert_with(|| strip_version(ensembl_id).to_string());
        }
        for old in previous {
            self.previous
                .entry(old.to_string())
                .or_insert_with(|| symbol.to_string());
        }
        for alias in aliases {
            self.aliases
                .entry(alias.to_string())
                .or_insert_with(|| symbol.to_string());
        }
    }

    fn current_symbol<'s>(&'s self, symbol: &'s str) -> Option<&'s str> {
        if self.current.contains(symbol) {
            return Some(symbol);
        }
        self.previous
            .get(symbol)
            .or_else(|| self.aliases.get(symbol))
            .map(String::as_str)
    }
}

/// Split a pipe-separated HGNC multi-value field
fn split_multi(field: &str) -> Vec<&str> {
    field
        .split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

impl GeneThesaurus for HgncThesaurus {
    fn translate(&self, ids: &[String], source: IdKind, target: IdKind) -> HashMap<String, String> {
        ids.iter()
            .filter_map(|id| {
                let translated = match (source, target) {
                    (IdKind::EnsemblId, IdKind::Symbol) => {
                        self.ensembl_to_symbol.get(strip_version(id)).cloned()
                    }
                    (IdKind::Symbol, IdKind::EnsemblId) => self
                        .current_symbol(id)
                        .and_then(|s| self.symbol_to_ensembl.get(s))
                        .cloned(),
                    (IdKind::Symbol, IdKind::Symbol) => self.current_symbol(id).map(str::to_string),
                    (IdKind::EnsemblId, IdKind::EnsemblId) => self
                        .ensembl_to_symbol
                        .contains_key(strip_version(id))
                        .then(|| strip_version(id).to_string()),
                };
                translated.map(|t| (id.clone(), t))
            })
            .collect()
    }

    fn update_to_current(&self, symbols: &[String]) -> HashMap<String, String> {
        symbols
            .iter()
            .filter_map(|s| self.current_symbol(s).map(|c| (s.clone(), c.to_string())))
            .collect()
    }
}
