//! Subtype label harmonization: the ALLIUM controlled vocabulary and the
//! parsers that map dataset diagnosis fields onto it.

mod phenotype;
mod thesaurus;

pub use phenotype::{
    parse_jude_phenotypes, split_diagnosis, write_phenotype_table, Diagnosis, JudePhenotypeParser,
    PhenotypeRecord, PhenotypeRun, SubtypeLevel, UnknownTermLedger, FALLBACK_PRIMARY, T_LINEAGE_SUBTYPE,
};
pub use thesaurus::{SubtypeThesaurus, Translation, UNRECOGNIZED_PREFIX};
