//! Error types for cl-core

use std::path::PathBuf;
use thiserror::Error;

use crate::filter::FilterError;
use crate::value::ValueError;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cl-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or write an output file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tab-separated I/O error from the csv crate
    #[error("TSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A row with more cells than the course loader schema allows
    #[error(
        "row {line} has {fields} fields, expected at most {max}",
        max = crate::row::FIELD_COUNT
    )]
    RowShape { line: u64, fields: usize },

    /// Malformed value literal or regular expression
    #[error(transparent)]
    Value(#[from] ValueError),

    /// Malformed filter expression
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
