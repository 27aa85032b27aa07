//! Error types for loading the directory and writing submissions.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while preparing the directory. Fatal at startup.
#[derive(Debug, Error)]
pub enum DataLoadError {
    /// Source file could not be opened or read
    #[error("cannot read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source is not well-formed CSV
    #[error("malformed dataset: {0}")]
    Csv(#[from] csv::Error),

    /// A required column has no matching header
    #[error("dataset is missing required column '{column}'")]
    MissingColumn { column: &'static str },
}

/// Errors raised by the contact submission sink
#[derive(Debug, Error)]
pub enum WriteError {
    /// Store location is not writable
    #[error("cannot write submissions to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Record could not be encoded as CSV
    #[error("cannot encode submission: {0}")]
    Csv(#[from] csv::Error),
}
