use std::path::PathBuf;
use thiserror::Error;

use crate::projection::ProjectionReport;
use crate::validation::ValidationReport;

/// The main error type for bigbio operations.
#[derive(Debug, Error)]
pub enum BigbioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid BRAT corpus at {path}: {message}")]
    BratLayoutInvalid { path: PathBuf, message: String },

    #[error("Failed to parse BioC XML from {path}: {message}")]
    BiocXmlParse { path: PathBuf, message: String },

    #[error("Failed to parse PubTator from {path} at line {line}: {message}")]
    PubTatorParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Failed to parse CoNLL from {path} at line {line}: {message}")]
    ConllParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Failed to parse delimited rows from {path}: {source}")]
    TabularParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Missing column '{column}' in {path}")]
    TabularColumnMissing { path: PathBuf, column: String },

    #[error("Row '{row}' has no column '{column}'")]
    RowColumnMissing { row: String, column: String },

    #[error("Failed to parse bigbio_kb JSON Lines from {path} at line {line}: {source}")]
    KbJsonParse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write JSON Lines to {path}: {source}")]
    JsonlWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse corpus config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },

    #[error("Unknown schema: '{0}' (supported: source, bigbio_kb, bigbio_qa, bigbio_pairs, bigbio_text, bigbio_t2t, bigbio_te)")]
    UnknownSchema(String),

    #[error("Unknown format: '{0}' (supported: brat, bioc, pubtator, conll, csv, tsv)")]
    UnknownFormat(String),

    #[error("Schema '{schema}' is not available for format '{format}'")]
    UnsupportedSchema { format: String, schema: String },

    #[error("Corpus '{corpus}' is local-only; pass --data-dir (or set data_dir in the config) to point at the extracted files")]
    MissingDataDir { corpus: String },

    #[error("Corpus '{corpus}' has no split named '{split}'")]
    MissingSplit { corpus: String, split: String },

    #[error("Cannot merge annotations of '{left}' and '{right}': {message}")]
    MergeMismatch {
        left: String,
        right: String,
        message: String,
    },

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },

    #[error("Projection produced {warning_count} warning(s) in strict mode")]
    ProjectionFailed {
        warning_count: usize,
        report: Box<ProjectionReport>,
    },
}
