//! Open-data source interfaces.
//!
//! Collaborators that pull tables from the web stay thin: a listing yields a
//! `{year: url}` map, and each table is saved as parquet. Price data lands in
//! the store through [`crate::ingest`] instead.

pub mod annual;
pub mod fetch;

pub use annual::{extract_links, latest_per_year, save_annual_tables, AnnualSourceIndex, ListingPage};
pub use fetch::{HttpFetcher, TableFetcher};

use crate::storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("failed to parse table from {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
