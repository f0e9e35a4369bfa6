//! Reference gene annotation: the fixed target schema for reconciliation

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{PreproError, Result};

/// One canonical gene of the reference annotation
///
/// Field order matches the annotation CSV header: `id,chr,name,biotype,length`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceGene {
    /// Stable reference gene id (e.g. an Ensembl gene id)
    pub id: String,
    /// Chromosome name without a `chr` prefix
    pub chr: String,
    /// Gene symbol as recorded in the annotation release
    pub name: String,
    /// Gene biotype (e.g. `protein_coding`)
    pub biotype: String,
    /// Transcript length in bases, used as the length-normalization divisor
    pub length: u64,
}

/// Immutable table of reference genes indexed by id
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    genes: Vec<ReferenceGene>,
    index: HashMap<String, usize>,
}

impl ReferenceTable {
    /// Build a table, rejecting duplicate ids and non-positive lengths
    pub fn new(genes: Vec<ReferenceGene>) -> Result<Self> {
        let mut index = HashMap::with_capacity(genes.len());

        for (i, gene) in genes.iter().enumerate() {
            if gene.length == 0 {
                return Err(PreproError::InvalidReference {
                    reason: format!("gene '{}' has zero length", gene.id),
                });
            }
            if index.insert(gene.id.clone(), i).is_some() {
                return Err(PreproError::InvalidReference {
                    reason: format!("duplicate reference id '{}'", gene.id),
                });
            }
        }

        Ok(Self { genes, index })
    }

    /// Number of reference genes
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// True when the table has no genes
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Genes in file order
    pub fn genes(&self) -> &[ReferenceGene] {
        &self.genes
    }

    /// Check if `id` is a reference gene id
    pub fn contains_id(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Look up a gene by reference id
    pub fn get(&self, id: &str) -> Option<&ReferenceGene> {
        self.index.get(id).map(|&i| &self.genes[i])
    }

    /// All reference ids, sorted ascending
    pub fn sorted_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.genes.iter().map(|g| g.id.clone()).collect();
        ids.sort();
        ids
    }

    /// Transcript lengths aligned row-for-row with `gene_ids`
    ///
    /// Fails if any id is not in the table.
    pub fn lengths_for(&self, gene_ids: &[String]) -> Result<Vec<f64>> {
        gene_ids
            .iter()
            .map(|id| {
                self.get(id)
                    .map(|g| g.length as f64)
                    .ok_or_else(|| PreproError::Alignment {
                        reason: format!("gene '{}' has no reference length", id),
                    })
            })
            .collect()
    }
}
