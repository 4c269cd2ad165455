//! bigbio: biomedical corpus loaders.
//!
//! bigbio reads annotated biomedical corpora (BRAT standoff, BioC XML,
//! PubTator, CoNLL/IOB and CSV/TSV) and projects them into a small set of
//! canonical schemas. Annotation corpora meet in `bigbio_kb`, where they can
//! be validated and merged across annotators.
//!
//! # Modules
//!
//! - [`schema`]: The canonical schemas (`bigbio_kb` and the record schemas)
//! - [`source`]: One reader per on-disk format
//! - [`offsets`]: Character offset reconciliation
//! - [`projection`]: Source documents → schema records, with loss reports
//! - [`merge`]: Multi-annotator agreement merge
//! - [`validation`]: Integrity checks for `bigbio_kb` documents
//! - [`config`] / [`loader`]: YAML corpus configs and split loading
//! - [`error`]: Error types for bigbio operations

pub mod config;
pub mod error;
pub mod loader;
pub mod merge;
pub mod offsets;
pub mod projection;
pub mod schema;
pub mod source;
pub mod validation;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;

pub use error::BigbioError;

use config::CorpusConfig;
use loader::CorpusLoader;
use projection::{project_all, projector_for, ProjectionReport};
use schema::{IdGenerator, KbDocument, Record, Schema};
use source::{read_source, SourceFormat, SourceOptions};

/// The bigbio CLI application.
#[derive(Parser)]
#[command(name = "bigbio")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Read a corpus in one format and write it in a bigbio schema.
    Convert(ConvertArgs),
    /// Load every split of a configured corpus.
    Load(LoadArgs),
    /// Validate bigbio_kb JSON Lines for errors and warnings.
    Validate(ValidateArgs),
    /// Keep only the annotations two annotators agree on.
    Merge(MergeArgs),
}

/// Arguments for the convert subcommand.
#[derive(clap::Args)]
struct ConvertArgs {
    /// Input file or directory.
    input: PathBuf,

    /// Input format ('brat', 'bioc', 'pubtator', 'conll', 'csv' or 'tsv').
    #[arg(long)]
    from: String,

    /// Output schema ('source', 'bigbio_kb', 'bigbio_qa', ...).
    #[arg(long, default_value = "bigbio_kb")]
    schema: String,

    /// Output JSON Lines file.
    #[arg(short, long)]
    output: PathBuf,

    /// Reader options as YAML (the per-format blocks of a corpus config).
    #[arg(long)]
    options: Option<PathBuf>,

    /// Report format on stderr ('text' or 'json').
    #[arg(long, default_value = "text")]
    report: String,

    /// Fail if anything was dropped.
    #[arg(long)]
    strict: bool,
}

/// Arguments for the load subcommand.
#[derive(clap::Args)]
struct LoadArgs {
    /// Corpus config (YAML).
    #[arg(long)]
    config: PathBuf,

    /// Load only this split.
    #[arg(long)]
    split: Option<String>,

    /// Directory holding the extracted corpus files.
    #[arg(long, env = "BIGBIO_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Override the schema named in the config.
    #[arg(long)]
    schema: Option<String>,

    /// Directory for `<split>.jsonl` files.
    #[arg(long)]
    output_dir: PathBuf,

    /// Report format on stderr ('text' or 'json').
    #[arg(long, default_value = "text")]
    report: String,
}

/// Arguments for the validate subcommand.
#[derive(clap::Args)]
struct ValidateArgs {
    /// bigbio_kb JSON Lines file to validate.
    input: PathBuf,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the merge subcommand.
#[derive(clap::Args)]
struct MergeArgs {
    /// First annotator's corpus.
    left: PathBuf,

    /// Second annotator's corpus.
    right: PathBuf,

    /// Input format of both corpora ('brat', 'bioc', 'pubtator', 'conll' or
    /// 'kb-jsonl' for already projected documents).
    #[arg(long, default_value = "brat")]
    from: String,

    /// Output JSON Lines file.
    #[arg(short, long)]
    output: PathBuf,
}

/// Run the bigbio CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), BigbioError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Convert(args)) => run_convert(args),
        Some(Commands::Load(args)) => run_load(args),
        Some(Commands::Validate(args)) => run_validate(args),
        Some(Commands::Merge(args)) => run_merge(args),
        None => {
            println!("bigbio {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Biomedical corpus loaders for the bigbio schemas.");
            println!();
            println!("Run 'bigbio --help' for usage information.");
            Ok(())
        }
    }
}

fn read_options(path: Option<&Path>) -> Result<SourceOptions, BigbioError> {
    let Some(path) = path else {
        return Ok(SourceOptions::default());
    };
    let data = fs::read_to_string(path).map_err(BigbioError::Io)?;
    serde_yaml::from_str(&data).map_err(|source| BigbioError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

fn emit_report(report: &ProjectionReport, format: &str) {
    match format {
        "json" => match serde_json::to_string_pretty(report) {
            Ok(json) => eprintln!("{}", json),
            Err(e) => eprintln!("Failed to serialize report: {}", e),
        },
        _ => eprint!("{}", report),
    }
}

/// Execute the convert subcommand.
fn run_convert(args: ConvertArgs) -> Result<(), BigbioError> {
    let format: SourceFormat = args.from.parse()?;
    let schema: Schema = args.schema.parse()?;
    let options = read_options(args.options.as_deref())?;

    let projector = projector_for(format, schema, &options)?;
    let mut report = ProjectionReport::new(format.name(), schema.name());
    let documents = read_source(format, &args.input, &options, &mut report)?;
    let mut ids = IdGenerator::new();
    let records = project_all(projector.as_ref(), &documents, &mut ids, &mut report)?;

    emit_report(&report, &args.report);
    if args.strict && report.warning_count() > 0 {
        return Err(BigbioError::ProjectionFailed {
            warning_count: report.warning_count(),
            report: Box::new(report),
        });
    }

    schema::io_jsonl::write_jsonl(&args.output, &records)?;
    println!(
        "Wrote {} {} record(s) to {}",
        records.len(),
        schema,
        args.output.display()
    );
    Ok(())
}

/// Execute the load subcommand.
fn run_load(args: LoadArgs) -> Result<(), BigbioError> {
    let config = CorpusConfig::load(&args.config)?;
    let schema = args
        .schema
        .as_deref()
        .map(str::parse::<Schema>)
        .transpose()?;
    let loader = CorpusLoader::new(config, args.data_dir.as_deref(), schema)?;

    let splits = match args.split {
        Some(split) => vec![split],
        None => loader.splits(),
    };

    fs::create_dir_all(&args.output_dir).map_err(BigbioError::Io)?;
    for split in splits {
        let mut report = loader.new_report();
        let records = loader.generate_examples(&split, &mut report)?;
        emit_report(&report, &args.report);

        let path = args.output_dir.join(format!("{}.jsonl", split));
        schema::io_jsonl::write_jsonl(&path, &records)?;
        println!(
            "{}: wrote {} record(s) to {}",
            split,
            records.len(),
            path.display()
        );
    }
    Ok(())
}

/// Execute the validate subcommand.
fn run_validate(args: ValidateArgs) -> Result<(), BigbioError> {
    let documents = schema::io_jsonl::read_kb_jsonl(&args.input)?;

    let opts = validation::ValidateOptions {
        strict: args.strict,
    };
    let report = validation::validate_documents(&documents, &opts);

    match args.output.as_str() {
        "json" => match report.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize report: {}", e),
        },
        _ => print!("{}", report),
    }

    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (args.strict && has_warnings) {
        Err(BigbioError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

/// Reads one annotator's corpus as kb documents.
fn read_kb_corpus(path: &Path, from: &str) -> Result<Vec<KbDocument>, BigbioError> {
    if matches!(from, "kb-jsonl" | "jsonl") {
        return schema::io_jsonl::read_kb_jsonl(path);
    }

    let format: SourceFormat = from.parse()?;
    let options = SourceOptions::default();
    let projector = projector_for(format, Schema::Kb, &options)?;
    let mut report = ProjectionReport::new(format.name(), Schema::Kb.name());
    let documents = read_source(format, path, &options, &mut report)?;
    let records = project_all(
        projector.as_ref(),
        &documents,
        &mut IdGenerator::new(),
        &mut report,
    )?;
    if report.is_lossy() {
        eprint!("{}", report);
    }

    Ok(records
        .into_iter()
        .filter_map(|record| match record {
            Record::Kb(doc) => Some(doc),
            _ => None,
        })
        .collect())
}

/// Execute the merge subcommand.
fn run_merge(args: MergeArgs) -> Result<(), BigbioError> {
    let left = read_kb_corpus(&args.left, &args.from)?;
    let right = read_kb_corpus(&args.right, &args.from)?;

    let merged = merge::merge_corpora(&left, &right, &mut IdGenerator::new())?;
    info!(
        left = left.len(),
        right = right.len(),
        merged = merged.len(),
        "merged annotator corpora"
    );

    schema::io_jsonl::write_jsonl(&args.output, &merged)?;
    println!(
        "Merged {} document(s) into {}",
        merged.len(),
        args.output.display()
    );
    Ok(())
}
