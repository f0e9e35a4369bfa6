//! St. Jude diagnosis parsing
//!
//! The `attr_diagnosis` field packs lineage, primary and optional secondary
//! subtype into one string:
//! `Lineage:<L>,Primary_subtype:<P>[,Secondary_subtype:<S>]`.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use regex::Regex;
use serde::Serialize;

use super::thesaurus::{SubtypeThesaurus, Translation};
use crate::error::{PreproError, Result};

/// Primary label for B-lineage cases without a primary subtype
pub const FALLBACK_PRIMARY: &str = "B-other";

/// Single label used for every T-lineage case
pub const T_LINEAGE_SUBTYPE: &str = "T-ALL";

const DIAGNOSIS_PATTERN: &str = r"^Lineage:(.*?),Primary_subtype:(.*?)(?:,Secondary_subtype:(.*))?$";

/// Diagnosis value of excluded (non-ALL) cases
const EXCLUDED_DIAGNOSIS: &str = "AML";

/// Separator between label components
const LEVEL_DELIMITER: &str = ",";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SubtypeLevel {
    Primary,
    Secondary,
}

/// Components of a diagnosis string; absent secondary is empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    pub lineage: String,
    pub primary: String,
    pub secondary: String,
}

/// Split a diagnosis string, `None` if it does not follow the format
pub fn split_diagnosis(pattern: &Regex, s: &str) -> Option<Diagnosis> {
    let caps = pattern.captures(s)?;
    let group = |i: usize| caps.get(i).map_or("", |m| m.as_str()).to_string();
    Some(Diagnosis {
        lineage: group(1),
        primary: group(2),
        secondary: group(3),
    })
}

/// Unrecognized terms and how often they occurred, per level
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnknownTermLedger {
    counts: BTreeMap<(SubtypeLevel, String), usize>,
}

impl UnknownTermLedger {
    pub fn record(&mut self, level: SubtypeLevel, term: &str) {
        *self.counts.entry((level, term.to_string())).or_insert(0) += 1;
    }

    pub fn count(&self, level: SubtypeLevel, term: &str) -> usize {
        self.counts.get(&(level, term.to_string())).copied().unwrap_or(0)
    }

    /// Terms of one level with their counts, sorted by term
    pub fn terms(&self, level: SubtypeLevel) -> Vec<(&str, usize)> {
        self.counts
            .iter()
            .filter(|((l, _), _)| *l == level)
            .map(|((_, term), &n)| (term.as_str(), n))
            .collect()
    }

    /// Total occurrences of unknown terms at one level
    pub fn total(&self, level: SubtypeLevel) -> usize {
        self.terms(level).iter().map(|(_, n)| n).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// One row of the canonical phenotype table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhenotypeRecord {
    pub id: String,
    pub subtype: String,
}

/// Turns St. Jude diagnosis strings into ALLIUM labels
pub struct JudePhenotypeParser<'a> {
    thesaurus: &'a SubtypeThesaurus,
    pattern: Regex,
    ledger: UnknownTermLedger,
}

impl<'a> JudePhenotypeParser<'a> {
    pub fn new(thesaurus: &'a SubtypeThesaurus) -> Result<Self> {
        Ok(Self {
            thesaurus,
            pattern: Regex::new(DIAGNOSIS_PATTERN)?,
            ledger: UnknownTermLedger::default(),
        })
    }

    pub fn ledger(&self) -> &UnknownTermLedger {
        &self.ledger
    }

    /// Normalize one component; unknown terms are recorded and become empty
    pub fn alliumify(&mut self, term: &str, level: SubtypeLevel) -> String {
        let term = term.trim_end_matches('?');

        if term.is_empty() {
            return match level {
                SubtypeLevel::Primary => FALLBACK_PRIMARY.to_string(),
                SubtypeLevel::Secondary => String::new(),
            };
        }
        if self.thesaurus.is_known(term) {
            return term.to_string();
        }

        match self.thesaurus.translate(term) {
            Translation::Known(id) => id,
            Translation::Unrecognized(stripped) => {
                log::debug!("Unrecognized {:?} subtype '{}'", level, stripped);
                self.ledger.record(level, &stripped);
                String::new()
            }
        }
    }

    /// ALLIUM label of one diagnosis string
    pub fn label(&mut self, sample: &str, diagnosis: &str) -> Result<String> {
        let parts = split_diagnosis(&self.pattern, diagnosis).ok_or_else(|| PreproError::PhenotypeFormat {
            sample: sample.to_string(),
            value: diagnosis.to_string(),
        })?;

        let primary = if parts.lineage == "T" {
            T_LINEAGE_SUBTYPE
        } else {
            parts.primary.as_str()
        };
        let primary = self.alliumify(primary, SubtypeLevel::Primary);
        let secondary = self.alliumify(&parts.secondary, SubtypeLevel::Secondary);

        let mut components: Vec<String> = [primary, secondary].into_iter().filter(|c| !c.is_empty()).collect();
        components.sort();
        Ok(components.join(LEVEL_DELIMITER))
    }

    /// Read a St. Jude sample table (`sample_name`, `attr_diagnosis`) and label
    /// every non-AML case
    pub fn parse<P: AsRef<Path>>(&mut self, path: P, delimiter: u8) -> Result<Vec<PhenotypeRecord>> {
        let path = path.as_ref();
        let mut reader = ReaderBuilder::new().delimiter(delimiter).from_path(path)?;

        let header = reader.headers()?.clone();
        let column = |name: &str| {
            header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| PreproError::InvalidInput {
                    reason: format!("{} has no '{}' column", path.display(), name),
                })
        };
        let sample_col = column("sample_name")?;
        let diagnosis_col = column("attr_diagnosis")?;

        let mut records = Vec::new();
        let mut excluded = 0usize;
        for record in reader.records() {
            let record = record?;
            let sample = record.get(sample_col).unwrap_or_default();
            let diagnosis = record.get(diagnosis_col).unwrap_or_default();

            if diagnosis == EXCLUDED_DIAGNOSIS {
                excluded += 1;
                continue;
            }
            let subtype = self.label(sample, diagnosis)?;
            records.push(PhenotypeRecord {
                id: sample.to_string(),
                subtype,
            });
        }

        if excluded > 0 {
            log::info!("Dropped {} {} cases", excluded, EXCLUDED_DIAGNOSIS);
        }
        Ok(records)
    }

    /// Audit report of unknown terms and the number of labelled cases
    pub fn summary(&self, n_records: usize) -> String {
        let format_terms = |level| {
            let terms = self.ledger.terms(level);
            if terms.is_empty() {
                "none".to_string()
            } else {
                terms
                    .iter()
                    .map(|(term, n)| format!("{} ({})", term, n))
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        };

        let mut out = String::new();
        let _ = writeln!(out, "Unknown primary subtypes: {}", format_terms(SubtypeLevel::Primary));
        let _ = writeln!(
            out,
            "Total cases with unknown primary subtypes: {}",
            self.ledger.total(SubtypeLevel::Primary)
        );
        let _ = writeln!(out, "Unknown secondary subtypes: {}", format_terms(SubtypeLevel::Secondary));
        let _ = writeln!(
            out,
            "Total cases with unknown secondary subtypes: {}",
            self.ledger.total(SubtypeLevel::Secondary)
        );
        let _ = writeln!(out, "Number of cases remaining: {}", n_records);
        out
    }
}

/// Write the canonical `id;subtype` phenotype table
pub fn write_phenotype_table<P: AsRef<Path>>(path: P, records: &[PhenotypeRecord]) -> Result<()> {
    let mut writer = WriterBuilder::new().delimiter(b';').from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Files produced by [`parse_jude_phenotypes`]
#[derive(Debug, Clone)]
pub struct PhenotypeRun {
    pub output_file: PathBuf,
    pub summary_file: PathBuf,
    pub records: usize,
    pub ledger: UnknownTermLedger,
}

/// Parse a St. Jude phenotype table into `<prefix>.pheno.allium.csv` and
/// `<prefix>.pheno_summary.txt`
pub fn parse_jude_phenotypes(
    prefix: &str,
    input: &Path,
    output_dir: &Path,
    delimiter: u8,
    thesaurus: &SubtypeThesaurus,
) -> Result<PhenotypeRun> {
    log::info!("Parsing St. Jude phenotype data...");
    std::fs::create_dir_all(output_dir)?;

    let mut parser = JudePhenotypeParser::new(thesaurus)?;
    let records = parser.parse(input, delimiter)?;

    let summary = parser.summary(records.len());
    let summary_file = output_dir.join(format!("{}.pheno_summary.txt", prefix));
    std::fs::write(&summary_file, &summary)?;
    log::info!("{}", summary.trim_end());

    let output_file = output_dir.join(format!("{}.pheno.allium.csv", prefix));
    write_phenotype_table(&output_file, &records)?;

    Ok(PhenotypeRun {
        output_file,
        summary_file,
        records: records.len(),
        ledger: parser.ledger.clone(),
    })
}
