//! Offline construction of the reference annotation
//!
//! Downloads an Ensembl GTF release once, extracts per-gene chromosome, symbol,
//! biotype and flattened exon length, and writes both the full and the filtered
//! annotation. The filtered file is the static input of the preprocessing pipeline.

mod fetch;
mod filter;
mod gtf;

use std::fs;
use std::path::{Path, PathBuf};

pub use fetch::download_once;
pub use filter::{filter_annotations, is_kept_chromosome, is_kept_gene, KEPT_BIOTYPE, RIBOSOMAL_PREFIXES};
pub use gtf::{flattened_length, open_gtf, parse_gtf};

use crate::error::{PreproError, Result};
use crate::io::write_reference;

/// Reference genome release used when none is given
pub const DEFAULT_REF_GENOME: &str = "Homo_sapiens.GRCh38.103";

/// Directory holding reference annotations when none is given
pub const DEFAULT_REF_DIR: &str = "data/reference";

/// Path of the filtered annotation for a genome release
pub fn filtered_annotation_path(ref_dir: &Path, genome: &str) -> PathBuf {
    ref_dir.join(format!("{}.allium.annotations.filtered.csv", genome))
}

/// Path of the unfiltered annotation for a genome release
pub fn full_annotation_path(ref_dir: &Path, genome: &str) -> PathBuf {
    ref_dir.join(format!("{}.allium.annotations.full.csv", genome))
}

/// Ensembl FTP location of the GTF for a release tag such as `Homo_sapiens.GRCh38.103`
pub fn ensembl_gtf_url(genome: &str) -> Result<String> {
    let species = genome.split('.').next().filter(|s| !s.is_empty());
    let release = genome.rsplit('.').next().filter(|r| r.parse::<u32>().is_ok());

    match (species, release) {
        (Some(species), Some(release)) if genome.matches('.').count() >= 2 => Ok(format!(
            "http://ftp.ensembl.org/pub/release-{}/gtf/{}/{}.gtf.gz",
            release,
            species.to_lowercase(),
            genome
        )),
        _ => Err(PreproError::InvalidConfig {
            reason: format!(
                "reference genome '{}' is not of the form <Species>.<Assembly>.<release>",
                genome
            ),
        }),
    }
}

/// Builds the reference annotation files for one genome release
#[derive(Debug, Clone)]
pub struct ReferenceBuilder {
    genome: String,
    ref_dir: PathBuf,
    keep_gtf: bool,
}

impl ReferenceBuilder {
    pub fn new(genome: &str, ref_dir: &Path) -> Result<Self> {
        ensembl_gtf_url(genome)?;
        Ok(Self {
            genome: genome.to_string(),
            ref_dir: ref_dir.to_path_buf(),
            keep_gtf: false,
        })
    }

    /// Keep the downloaded GTF after the annotation has been written
    pub fn keep_gtf(mut self, keep: bool) -> Self {
        self.keep_gtf = keep;
        self
    }

    /// Path the GTF is downloaded to
    pub fn gtf_path(&self) -> PathBuf {
        self.ref_dir.join(format!("{}.gtf.gz", self.genome))
    }

    /// Fetch, parse, filter and write; returns the filtered annotation path
    pub fn run(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.ref_dir)?;

        let gtf_path = self.gtf_path();
        download_once(&ensembl_gtf_url(&self.genome)?, &gtf_path)?;

        log::info!("Parsing GTF...");
        let genes = parse_gtf(open_gtf(&gtf_path)?)?;
        let full_path = full_annotation_path(&self.ref_dir, &self.genome);
        write_reference(&full_path, &genes)?;
        log::info!("Created {} ({} genes)", full_path.display(), genes.len());

        let filtered = filter_annotations(&genes);
        let filtered_path = filtered_annotation_path(&self.ref_dir, &self.genome);
        write_reference(&filtered_path, &filtered)?;
        log::info!("Created {} ({} genes)", filtered_path.display(), filtered.len());

        if !self.keep_gtf {
            log::info!("Cleaning up...");
            fs::remove_file(&gtf_path)?;
        }

        Ok(filtered_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensembl_gtf_url() {
        assert_eq!(
            ensembl_gtf_url("Homo_sapiens.GRCh38.103").unwrap(),
            "http://ftp.ensembl.org/pub/release-103/gtf/homo_sapiens/Homo_sapiens.GRCh38.103.gtf.gz"
        );
        assert!(ensembl_gtf_url("GRCh38").is_err());
        assert!(ensembl_gtf_url("Homo_sapiens.GRCh38.latest").is_err());
    }

    #[test]
    fn test_annotation_paths() {
        let dir = Path::new("data/reference");
        assert_eq!(
            filtered_annotation_path(dir, DEFAULT_REF_GENOME),
            Path::new("data/reference/Homo_sapiens.GRCh38.103.allium.annotations.filtered.csv")
        );
    }

    #[test]
    fn test_builder_with_cached_gtf() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let builder = ReferenceBuilder::new("Homo_sapiens.GRCh38.103", dir.path()).unwrap();

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        write!(
            encoder,
            "1\te\tgene\t1\t100\t.\t+\t.\tgene_id \"ENSG1\"; gene_name \"GENEA\"; gene_biotype \"protein_coding\";\n\
             1\te\texon\t1\t100\t.\t+\t.\tgene_id \"ENSG1\";\n\
             1\te\tgene\t1\t100\t.\t+\t.\tgene_id \"ENSG2\"; gene_name \"RPL5\"; gene_biotype \"protein_coding\";\n\
             1\te\texon\t1\t50\t.\t+\t.\tgene_id \"ENSG2\";\n"
        )
        .unwrap();
        fs::write(builder.gtf_path(), encoder.finish().unwrap()).unwrap();

        let filtered = builder.run().unwrap();
        let text = fs::read_to_string(filtered).unwrap();
        assert_eq!(text, "id,chr,name,biotype,length\nENSG1,1,GENEA,protein_coding,100\n");
        assert!(!builder.gtf_path().exists());
    }
}
