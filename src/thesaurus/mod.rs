//! Gene identifier thesaurus: translation between identifier kinds and
//! updating outdated symbols to the currently approved ones.

mod hgnc;

use std::collections::HashMap;

pub use hgnc::{HgncThesaurus, HGNC_COMPLETE_SET_URL, HGNC_FILE_NAME};

/// Kind of gene identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    /// Gene symbol (e.g. `TP53`)
    Symbol,
    /// Ensembl gene id, optionally versioned (e.g. `ENSG00000141510.17`)
    EnsemblId,
}

/// Contract of an identifier thesaurus
///
/// Both operations return a mapping that only contains inputs the thesaurus
/// could resolve; callers default unmapped identifiers to their original value.
pub trait GeneThesaurus {
    /// Translate identifiers of `source` kind into identifiers of `target` kind
    fn translate(&self, ids: &[String], source: IdKind, target: IdKind) -> HashMap<String, String>;

    /// Map (possibly outdated) symbols to their current approved symbol
    fn update_to_current(&self, symbols: &[String]) -> HashMap<String, String>;
}

/// Strip an Ensembl version suffix: `ENSG00000141510.17` -> `ENSG00000141510`
pub fn strip_version(id: &str) -> &str {
    match id.rsplit_once('.') {
        Some((base, version)) if !version.is_empty() && version.bytes().all(|b| b.is_ascii_digit()) => base,
        _ => id,
    }
}

/// In-memory thesaurus built from explicit mappings
#[derive(Debug, Clone, Default)]
pub struct StaticThesaurus {
    symbol_updates: HashMap<String, String>,
    ensembl_to_symbol: HashMap<String, String>,
}

impl StaticThesaurus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `old` is an outdated symbol for `current`
    pub fn with_symbol_update(mut self, old: &str, current: &str) -> Self {
        self.symbol_updates.insert(old.to_string(), current.to_string());
        self
    }

    /// Record the symbol of an Ensembl gene id
    pub fn with_ensembl(mut self, ensembl_id: &str, symbol: &str) -> Self {
        self.ensembl_to_symbol
            .insert(strip_version(ensembl_id).to_string(), symbol.to_string());
        self
    }
}

impl GeneThesaurus for StaticThesaurus {
    fn translate(&self, ids: &[String], source: IdKind, target: IdKind) -> HashMap<String, String> {
        match (source, target) {
            (IdKind::EnsemblId, IdKind::Symbol) => ids
                .iter()
                .filter_map(|id| {
                    self.ensembl_to_symbol
                        .get(strip_version(id))
                        .map(|s| (id.clone(), s.clone()))
                })
                .collect(),
            (IdKind::Symbol, IdKind::EnsemblId) => ids
                .iter()
                .filter_map(|symbol| {
                    self.ensembl_to_symbol
                        .iter()
                        .find(|(_, s)| *s == symbol)
                        .map(|(id, _)| (symbol.clone(), id.clone()))
                })
                .collect(),
            (IdKind::Symbol, IdKind::Symbol) => self.update_to_current(ids),
            (IdKind::EnsemblId, IdKind::EnsemblId) => HashMap::new(),
        }
    }

    fn update_to_current(&self, symbols: &[String]) -> HashMap<String, String> {
        symbols
            .iter()
            .filter_map(|s| self.symbol_updates.get(s).map(|c| (s.clone(), c.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_version() {
        assert_eq!(strip_version("ENSG00000141510.17"), "ENSG00000141510");
        assert_eq!(strip_version("ENSG00000141510"), "ENSG00000141510");
        assert_eq!(strip_version("HLA-A.x"), "HLA-A.x");
    }

    #[test]
    fn test_static_thesaurus_omits_unmapped() {
        let thesaurus = StaticThesaurus::new()
            .with_symbol_update("FAM46C", "TENT5C")
            .with_ensembl("ENSG00000183508", "TENT5C");

        let ids = vec!["FAM46C".to_string(), "UNKNOWN".to_string()];
        let updated = thesaurus.update_to_current(&ids);
        assert_eq!(updated.len(), 1);
        assert_eq!(updated["FAM46C"], "TENT5C");

        let ens = vec!["ENSG00000183508.5".to_string()];
        let symbols = thesaurus.translate(&ens, IdKind::EnsemblId, IdKind::Symbol);
        assert_eq!(symbols["ENSG00000183508.5"], "TENT5C");
    }
}
