//! Error types for the ALLIUM preprocessing pipeline

use thiserror::Error;

/// Main error type for preprocessing operations
#[derive(Error, Debug)]
pub enum PreproError {
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Invalid count matrix: {reason}")]
    InvalidCountMatrix { reason: String },

    #[error("Invalid reference annotation: {reason}")]
    InvalidReference { reason: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    #[error("Alignment violation: {reason}")]
    Alignment { reason: String },

    #[error("Normalization failed: {reason}")]
    Normalization { reason: String },

    #[error("Batch correction failed: {reason}")]
    BatchCorrection { reason: String },

    #[error("Invalid subtype table: {reason}")]
    InvalidSubtypeTable { reason: String },

    #[error("Malformed diagnosis for sample {sample}: '{value}'")]
    PhenotypeFormat { sample: String, value: String },

    #[error("Empty data: {reason}")]
    EmptyData { reason: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid regular expression: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Download failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Result type alias for preprocessing operations
pub type Result<T> = std::result::Result<T, PreproError>;
