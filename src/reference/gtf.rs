//! Per-gene annotation extraction from an Ensembl GTF file
//!
//! Gene length is the width of the union of the gene's exons: overlapping
//! exons from different transcripts are flattened before summing, so shared
//! sequence is counted once.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::data::ReferenceGene;
use crate::error::{PreproError, Result};

/// Value of `key` in a GTF attribute column (`gene_id "X"; gene_name "Y";`)
fn attribute<'a>(attributes: &'a str, key: &str) -> Option<&'a str> {
    attributes.split(';').find_map(|field| {
        let field = field.trim();
        let (name, value) = field.split_once(char::is_whitespace)?;
        (name == key).then(|| value.trim().trim_matches('"'))
    })
}

/// Total width of the union of closed intervals `[start, end]`
pub fn flattened_length(intervals: &mut [(u64, u64)]) -> u64 {
    if intervals.is_empty() {
        return 0;
    }
    intervals.sort_unstable();

    let mut total = 0;
    let (mut cur_start, mut cur_end) = intervals[0];
    for &(start, end) in &intervals[1..] {
        if start <= cur_end {
            cur_end = cur_end.max(end);
        } else {
            total += cur_end - cur_start + 1;
            cur_start = start;
            cur_end = end;
        }
    }
    total + cur_end - cur_start + 1
}

#[derive(Debug, Default)]
struct GeneRecord {
    chr: String,
    name: String,
    biotype: String,
    seen_gene_line: bool,
    exons: Vec<(u64, u64)>,
}

/// Open a GTF file, transparently decompressing `.gz`
pub fn open_gtf<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader: Box<dyn Read> = if path.extension().map_or(false, |e| e == "gz") {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(Box::new(BufReader::new(reader)))
}

/// Extract one annotation row per gene, sorted by gene id
///
/// Genes without a `gene` line or without exons are skipped.
pub fn parse_gtf<R: BufRead>(reader: R) -> Result<Vec<ReferenceGene>> {
    let mut genes: HashMap<String, GeneRecord> = HashMap::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.splitn(9, '\t').collect();
        if fields.len() != 9 {
            return Err(PreproError::InvalidReference {
                reason: format!("GTF line {} has {} columns, expected 9", line_no + 1, fields.len()),
            });
        }

        let feature = fields[2];
        if feature != "gene" && feature != "exon" {
            continue;
        }

        let gene_id = match attribute(fields[8], "gene_id") {
            Some(id) => id,
            None => continue,
        };
        let record = genes.entry(gene_id.to_string()).or_default();

        if feature == "gene" {
            record.seen_gene_line = true;
            record.chr = fields[0].to_string();
            record.name = attribute(fields[8], "gene_name").unwrap_or_default().to_string();
            record.biotype = attribute(fields[8], "gene_biotype").unwrap_or_default().to_string();
        } else {
            let parse = |s: &str| {
                s.parse::<u64>().map_err(|_| PreproError::InvalidReference {
                    reason: format!("GTF line {}: invalid coordinate '{}'", line_no + 1, s),
                })
            };
            record.exons.push((parse(fields[3])?, parse(fields[4])?));
        }
    }

    let mut skipped = 0usize;
    let mut annotations: Vec<ReferenceGene> = genes
        .into_iter()
        .filter_map(|(id, mut record)| {
            let length = flattened_length(&mut record.exons);
            if !record.seen_gene_line || length == 0 {
                skipped += 1;
                return None;
            }
            Some(ReferenceGene {
                id,
                chr: record.chr,
                name: record.name,
                biotype: record.biotype,
                length,
            })
        })
        .collect();

    if skipped > 0 {
        log::warn!("Skipped {} GTF genes without a gene line or exons", skipped);
    }

    annotations.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(annotations)
}
