//! Structured error types for the partitioned store.

use crate::domain::SeriesError;
use crate::schema::SchemaError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parquet I/O error at {path}: {reason}")]
    Parquet { path: PathBuf, reason: String },

    #[error("csv read error at {path}: {reason}")]
    Csv { path: PathBuf, reason: String },

    #[error("schema error in {path}: {source}")]
    Schema {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },

    #[error("invalid series: {0}")]
    Series(#[from] SeriesError),

    #[error("frame conversion error: {0}")]
    Frame(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parquet(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        StoreError::Parquet {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
