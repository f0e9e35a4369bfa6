//! Command-line interface for allium_prepro

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::reference::{DEFAULT_REF_DIR, DEFAULT_REF_GENOME};

#[derive(Parser)]
#[command(name = "allium_prepro")]
#[command(version)]
#[command(about = "Gene-expression and phenotype preparation for the ALLIUM classifier")]
#[command(disable_help_flag = true)]
#[command(disable_version_flag = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Preprocess a raw count matrix into an ALLIUM feature matrix
    #[command(
        about = "Preprocess a raw count matrix into an ALLIUM feature matrix",
        long_about = "Preprocess a raw count matrix into an ALLIUM feature matrix\n\n\
            Reconciles gene identifiers onto the reference annotation (summing\n\
            duplicates, zero-filling missing genes), normalizes counts (length,\n\
            TMM, log-CPM) and writes one row per sample, one column per gene.\n\n\
            With --batches, ComBat_seq batch correction runs first through Rscript.",
        after_long_help = "\
Examples:
  # Symbol-keyed matrix, sample columns starting with SJ
  allium_prepro preprocess -p jude -i jude.counts.raw.csv -o out \\
    --gene-format symbol --sample-col-regex 'SJ'

  # Ensembl-keyed TSV with batch correction
  allium_prepro preprocess -p krali -i krali.tsv -o out --separator '\\t' \\
    --gene-format ensembl --sample-col-regex 'P[0-9]+' --batches batches.csv"
    )]
    Preprocess {
        /// Dataset prefix for every output file
        #[arg(short, long)]
        prefix: String,

        /// Raw count matrix
        #[arg(short, long,
            long_help = "Raw count matrix.\n\
                Format: first column = gene identifier, remaining columns = samples.\n\
                Columns not matched by --sample-col-regex are ignored.")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Gene identifier kind: symbol or ensembl
        #[arg(short, long)]
        gene_format: String,

        /// Regular expression selecting sample columns (anchored at the start)
        #[arg(short, long)]
        sample_col_regex: String,

        /// Field separator of the count matrix [default: ,]
        #[arg(long, default_value = ",")]
        separator: String,

        /// Batch assignment CSV (first column sample id, column `batch`)
        #[arg(short, long)]
        batches: Option<PathBuf>,

        /// Reference genome release
        #[arg(long, default_value = DEFAULT_REF_GENOME)]
        ref_genome: String,

        /// Directory holding the filtered reference annotation
        #[arg(long)]
        ref_data_dir: Option<PathBuf>,

        /// Cache directory for the HGNC identifier table [default: system temp dir]
        #[arg(long)]
        tmp_dir: Option<PathBuf>,

        /// Rscript executable used for batch correction
        #[arg(long, default_value = "Rscript")]
        rscript: PathBuf,

        /// Number of threads (0 = all cores)
        #[arg(short = 't', long, default_value_t = 0)]
        threads: usize,
    },

    /// Convert St. Jude diagnoses into the ALLIUM phenotype table
    #[command(
        long_about = "Convert St. Jude diagnoses into the ALLIUM phenotype table.\n\n\
            Reads `sample_name` and `attr_diagnosis`, drops AML cases, maps subtypes\n\
            onto the ALLIUM vocabulary and writes <prefix>.pheno.allium.csv plus a\n\
            summary of unrecognized terms in <prefix>.pheno_summary.txt.",
        after_long_help = "\
Examples:
  allium_prepro phenotype -p jude -i SAMPLE_INFO.txt -o out
  allium_prepro phenotype -p jude -i SAMPLE_INFO.txt -o out --subtypes my_subtypes.yml"
    )]
    Phenotype {
        /// Dataset prefix for every output file
        #[arg(short, long)]
        prefix: String,

        /// Sample information table
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Field separator of the sample table [default: tab]
        #[arg(long, default_value = "\\t")]
        separator: String,

        /// Subtype vocabulary YAML [default: built-in table]
        #[arg(long)]
        subtypes: Option<PathBuf>,
    },

    /// Build the filtered reference annotation from an Ensembl GTF
    #[command(
        long_about = "Build the filtered reference annotation from an Ensembl GTF.\n\n\
            Downloads the GTF once (skipped when already present), computes the\n\
            flattened exon length of every gene and keeps protein-coding genes on\n\
            chromosomes 1-22 and X that are not ribosomal proteins.",
        after_long_help = "\
Examples:
  allium_prepro reference
  allium_prepro reference --genome Homo_sapiens.GRCh38.110 --ref-dir ref --keep-gtf"
    )]
    Reference {
        /// Reference genome release
        #[arg(short, long, default_value = DEFAULT_REF_GENOME)]
        genome: String,

        /// Output directory for annotations
        #[arg(short, long, default_value = DEFAULT_REF_DIR)]
        ref_dir: PathBuf,

        /// Keep the downloaded GTF
        #[arg(long)]
        keep_gtf: bool,
    },

    /// Merge per-sample count files into one raw count matrix
    #[command(
        long_about = "Merge per-sample count files into one raw count matrix.\n\n\
            Every file in the input directory holds `gene<TAB>count` rows; the sample\n\
            name is the file name up to the first dot. Writes <prefix>.counts.raw.csv.",
        after_long_help = "\
Examples:
  allium_prepro concat -d htseq_counts -p krali -o out
  allium_prepro concat -d counts -p tran -o out --exclude README"
    )]
    Concat {
        /// Directory of per-sample count files
        #[arg(short = 'd', long)]
        input_dir: PathBuf,

        /// Dataset prefix for the output file
        #[arg(short, long)]
        prefix: String,

        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Field separator of the per-sample files [default: tab]
        #[arg(long, default_value = "\\t")]
        separator: String,

        /// Skip files whose name starts with this prefix (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
    },
}

/// Interpret a separator argument; `\t` and `tab` mean a tab character
pub fn parse_separator(arg: &str) -> Option<char> {
    match arg {
        "\\t" | "tab" | "\t" => Some('\t'),
        s => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii() => Some(c),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_separator() {
        assert_eq!(parse_separator(","), Some(','));
        assert_eq!(parse_separator("\\t"), Some('\t'));
        assert_eq!(parse_separator("tab"), Some('\t'));
        assert_eq!(parse_separator(";"), Some(';'));
        assert_eq!(parse_separator(",,"), None);
        assert_eq!(parse_separator(""), None);
    }

    #[test]
    fn test_preprocess_arguments() {
        let cli = Cli::try_parse_from([
            "allium_prepro",
            "preprocess",
            "-p",
            "jude",
            "-i",
            "raw.csv",
            "-o",
            "out",
            "-g",
            "symbol",
            "-s",
            "SJ",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Preprocess { prefix, ref_genome, batches, .. }) => {
                assert_eq!(prefix, "jude");
                assert_eq!(ref_genome, DEFAULT_REF_GENOME);
                assert!(batches.is_none());
            }
            _ => panic!("expected preprocess"),
        }
    }
}
