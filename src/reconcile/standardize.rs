//! Standardized gene names: the shared key between raw rows and reference genes

use crate::config::GeneFormat;
use crate::data::ReferenceTable;
use crate::thesaurus::{GeneThesaurus, IdKind};

/// Standardized name for every raw identifier, in input order
///
/// Ensembl ids are translated to symbols, symbols are updated to the current
/// approved symbol. Identifiers the thesaurus cannot resolve keep their
/// original value.
pub fn standardize_input_names(
    ids: &[String],
    format: GeneFormat,
    thesaurus: &dyn GeneThesaurus,
) -> Vec<String> {
    let mapping = match format {
        GeneFormat::Ensembl => thesaurus.translate(ids, IdKind::EnsemblId, IdKind::Symbol),
        GeneFormat::Symbol => thesaurus.update_to_current(ids),
    };

    ids.iter()
        .map(|id| mapping.get(id).cloned().unwrap_or_else(|| id.clone()))
        .collect()
}

/// Standardized name for every reference gene, in table order
pub fn standardize_reference_names(reference: &ReferenceTable, thesaurus: &dyn GeneThesaurus) -> Vec<String> {
    let names: Vec<String> = reference.genes().iter().map(|g| g.name.clone()).collect();
    standardize_input_names(&names, GeneFormat::Symbol, thesaurus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thesaurus::StaticThesaurus;

    #[test]
    fn test_unresolved_names_are_kept() {
        let thesaurus = StaticThesaurus::new()
            .with_symbol_update("FAM46C", "TENT5C")
            .with_ensembl("ENSG00000183508", "TENT5C");

        let symbols = vec!["FAM46C".to_string(), "NOVEL1".to_string()];
        assert_eq!(
            standardize_input_names(&symbols, GeneFormat::Symbol, &thesaurus),
            vec!["TENT5C", "NOVEL1"]
        );

        let ensembl = vec!["ENSG00000183508.4".to_string(), "ENSG00000000000".to_string()];
        assert_eq!(
            standardize_input_names(&ensembl, GeneFormat::Ensembl, &thesaurus),
            vec!["TENT5C", "ENSG00000000000"]
        );
    }
}
