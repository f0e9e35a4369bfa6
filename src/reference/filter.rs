//! Selection of the genes that make up the ALLIUM feature space

use crate::data::ReferenceGene;

/// Biotype kept in the filtered annotation
pub const KEPT_BIOTYPE: &str = "protein_coding";

/// Symbol prefixes of ribosomal protein genes, which are excluded
pub const RIBOSOMAL_PREFIXES: [&str; 2] = ["RPL", "RPS"];

/// Autosomes 1-22 and X; Y and mitochondrial genes are excluded
pub fn is_kept_chromosome(chr: &str) -> bool {
    chr == "X" || chr.parse::<u8>().map_or(false, |n| (1..=22).contains(&n))
}

/// Check whether a gene belongs to the filtered annotation
pub fn is_kept_gene(gene: &ReferenceGene) -> bool {
    gene.biotype == KEPT_BIOTYPE
        && is_kept_chromosome(&gene.chr)
        && !RIBOSOMAL_PREFIXES.iter().any(|p| gene.name.starts_with(p))
}

/// Keep protein-coding, non-ribosomal genes on chromosomes 1-22 and X
pub fn filter_annotations(genes: &[ReferenceGene]) -> Vec<ReferenceGene> {
    genes.iter().filter(|g| is_kept_gene(g)).cloned().collect()
}
