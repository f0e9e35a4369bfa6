//! allium_prepro command-line interface

use std::path::{Path, PathBuf};

use clap::Parser;
use log::{info, LevelFilter};

use allium_prepro::cli::{parse_separator, Cli, Commands};
use allium_prepro::prelude::*;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Find the first non-flag argument (potential subcommand)
    let first_positional = args.iter().skip(1).find(|a| !a.starts_with('-'));
    let subcommands = ["preprocess", "phenotype", "reference", "concat", "help"];
    let has_subcommand = first_positional.map_or(false, |a| subcommands.contains(&a.as_str()));

    if !has_subcommand {
        if args.len() == 1 {
            print_no_args();
            return;
        }
        if args.iter().any(|a| a == "--help") {
            print_long_help();
            return;
        }
        if args.iter().any(|a| a == "-h") {
            print_short_help();
            return;
        }
        if args.iter().any(|a| a == "-V" || a == "--version") {
            println!("allium_prepro {}", VERSION);
            return;
        }
        print_no_args();
        return;
    }

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Some(Commands::Preprocess {
            prefix,
            input,
            output_dir,
            gene_format,
            sample_col_regex,
            separator,
            batches,
            ref_genome,
            ref_data_dir,
            tmp_dir,
            rscript,
            threads,
        }) => run_preprocess(
            PreprocessArgs {
                prefix,
                input,
                output_dir,
                gene_format,
                sample_col_regex,
                separator,
                batches,
                ref_genome,
                ref_data_dir,
                tmp_dir,
            },
            &rscript,
            threads,
        ),
        Some(Commands::Phenotype {
            prefix,
            input,
            output_dir,
            separator,
            subtypes,
        }) => run_phenotype(&prefix, &input, &output_dir, &separator, subtypes.as_deref()),
        Some(Commands::Reference {
            genome,
            ref_dir,
            keep_gtf,
        }) => run_reference(&genome, &ref_dir, keep_gtf),
        Some(Commands::Concat {
            input_dir,
            prefix,
            output_dir,
            separator,
            exclude,
        }) => run_concat(&input_dir, &prefix, &output_dir, &separator, exclude),
        None => {
            print_no_args();
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Custom help output
// ---------------------------------------------------------------------------

fn print_no_args() {
    println!("allium_prepro v{}", VERSION);
    println!("Run `allium_prepro -h` for usage or `allium_prepro --help` for detailed information.");
}

fn print_short_help() {
    println!("allium_prepro v{}", VERSION);
    println!();
    println!("Usage: allium_prepro <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  preprocess  Raw counts -> ALLIUM feature matrix");
    println!("  phenotype   St. Jude diagnoses -> ALLIUM phenotype table");
    println!("  reference   Build the filtered reference annotation");
    println!("  concat      Merge per-sample count files");
    println!();
    println!("Run `allium_prepro <COMMAND> -h` for command-specific options.");
}

fn print_long_help() {
    println!("allium_prepro v{}", VERSION);
    println!("Gene-expression and phenotype preparation for the ALLIUM classifier");
    println!();
    println!("Usage: allium_prepro <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  preprocess  Raw counts -> ALLIUM feature matrix");
    println!("                - Gene identifiers reconciled onto the reference annotation");
    println!("                - Duplicate genes summed, missing genes zero-filled and reported");
    println!("                - Length, TMM and log-CPM normalization");
    println!("                - Optional ComBat_seq batch correction (Rscript)");
    println!("  phenotype   St. Jude diagnoses -> ALLIUM phenotype table");
    println!("  reference   Build the filtered reference annotation from an Ensembl GTF");
    println!("  concat      Merge per-sample count files into one raw matrix");
    println!();
    println!("Global Options:");
    println!("  -v, --verbose    Enable verbose output");
    println!("  -h               Print short help");
    println!("      --help       Print detailed help");
    println!("  -V, --version    Print version");
    println!();
    println!("Examples:");
    println!("  allium_prepro reference");
    println!();
    println!("  allium_prepro preprocess -p jude -i jude.counts.raw.csv -o out \\");
    println!("    --gene-format symbol --sample-col-regex SJ");
    println!();
    println!("  allium_prepro phenotype -p jude -i SAMPLE_INFO.txt -o out");
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

struct PreprocessArgs {
    prefix: String,
    input: PathBuf,
    output_dir: PathBuf,
    gene_format: String,
    sample_col_regex: String,
    separator: String,
    batches: Option<PathBuf>,
    ref_genome: String,
    ref_data_dir: Option<PathBuf>,
    tmp_dir: Option<PathBuf>,
}

fn separator_arg(arg: &str) -> Result<char> {
    parse_separator(arg).ok_or_else(|| PreproError::InvalidConfig {
        reason: format!("separator '{}' must be a single ASCII character", arg),
    })
}

fn run_preprocess(args: PreprocessArgs, rscript: &Path, threads: usize) -> Result<()> {
    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .ok();
    }

    let gene_format: GeneFormat = args.gene_format.parse()?;
    let mut config = PreprocessorConfig::new(
        &args.prefix,
        args.input,
        args.output_dir,
        gene_format,
        &args.sample_col_regex,
    );
    config.separator = separator_arg(&args.separator)?;
    config.batches_file = args.batches;
    config.ref_genome = args.ref_genome;
    config.ref_data_dir = args.ref_data_dir;
    if let Some(tmp_dir) = args.tmp_dir {
        config.tmp_dir = tmp_dir;
    }

    // Cheap checks first; the thesaurus may need a download
    config.validate()?;
    SampleSelector::new(&config.sample_col_regex)?;

    info!("Loading gene thesaurus (cache: {})", config.tmp_dir.display());
    let thesaurus = HgncThesaurus::load_or_fetch(&config.tmp_dir)?;
    let normalizer = EdgeRNormalizer::default();
    let corrector = RscriptComBatSeq::new(&config.output_dir, &config.prefix).with_rscript(rscript);

    let pipeline = GexPreprocessor::new(config, &thesaurus, &normalizer, Some(&corrector))?;
    let summary = pipeline.run()?;

    let stats = &summary.reconciliation;
    info!(
        "{} input rows: {} by id, {} by name, {} by ambiguous name, {} dropped",
        stats.input_rows,
        stats.resolved_by_id,
        stats.resolved_by_name,
        stats.resolved_by_ambiguous_name,
        stats.dropped_rows
    );
    info!("Output written to: {}", summary.output_file.display());
    info!("Done!");
    Ok(())
}

fn run_phenotype(
    prefix: &str,
    input: &Path,
    output_dir: &Path,
    separator: &str,
    subtypes: Option<&Path>,
) -> Result<()> {
    let delimiter = separator_arg(separator)? as u8;
    let thesaurus = match subtypes {
        Some(path) => {
            info!("Loading subtype vocabulary from: {}", path.display());
            SubtypeThesaurus::from_file(path)?
        }
        None => SubtypeThesaurus::builtin()?,
    };

    let run = parse_jude_phenotypes(prefix, input, output_dir, delimiter, &thesaurus)?;
    info!("{} phenotypes written to: {}", run.records, run.output_file.display());
    Ok(())
}

fn run_reference(genome: &str, ref_dir: &Path, keep_gtf: bool) -> Result<()> {
    info!("Building reference annotation for {}", genome);
    let filtered = ReferenceBuilder::new(genome, ref_dir)?.keep_gtf(keep_gtf).run()?;
    info!("Reference annotation written to: {}", filtered.display());
    Ok(())
}

fn run_concat(
    input_dir: &Path,
    prefix: &str,
    output_dir: &Path,
    separator: &str,
    exclude: Vec<String>,
) -> Result<()> {
    let options = ConcatOptions {
        delimiter: separator_arg(separator)? as u8,
        exclude_prefixes: exclude,
    };

    info!("Concatenating count files from: {}", input_dir.display());
    let counts = concatenate_counts(input_dir, &options)?;
    info!("  {} genes, {} samples", counts.n_genes(), counts.n_samples());

    std::fs::create_dir_all(output_dir)?;
    let output = output_dir.join(format!("{}.counts.raw.csv", prefix));
    write_count_matrix(&output, &counts)?;
    info!("Raw counts written to: {}", output.display());
    Ok(())
}
