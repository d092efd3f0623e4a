use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to read one dataset file, or to read any dataset at all.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse delimited file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to read spreadsheet {path}: {reason}")]
    Spreadsheet { path: PathBuf, reason: String },
    #[error("unsupported dataset format: {0}")]
    UnsupportedFormat(PathBuf),
    #[error("no dataset could be loaded from {dir}")]
    NothingLoaded { dir: PathBuf },
}

/// A raw dataset whose shape a normalizer cannot work with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("{dataset}: none of the expected columns {columns:?} are present")]
    MissingColumns {
        dataset: &'static str,
        columns: Vec<&'static str>,
    },
    #[error("{dataset}: {reason}")]
    Malformed {
        dataset: &'static str,
        reason: String,
    },
}

/// Why the model backend could not answer. Every variant leads to the
/// offline narrative.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend disabled (offline mode)")]
    Offline,
    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("backend returned HTTP {0}")]
    Status(u16),
    #[error("backend returned an empty completion")]
    EmptyResponse,
}
