//! CSV import into the partitioned store.
//!
//! This is how collaborators that download prices land their data: a CSV
//! following the price schema (index column included) is conformed, checked
//! for duplicate dates and written one file per month.

use crate::domain::TickerSeries;
use crate::schema::SchemaContract;
use crate::storage::frame::frame_to_records;
use crate::storage::{write_series, PartitionLayout, StoreError};
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::{Path, PathBuf};

/// Read a price CSV into a series for `ticker`.
///
/// A missing `ticker` column is filled with `ticker`; any other mismatch
/// with the contract fails the import.
pub fn read_price_csv(
    path: &Path,
    ticker: &str,
    contract: &SchemaContract,
) -> Result<TickerSeries, StoreError> {
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .map_parse_options(|opts| opts.with_try_parse_dates(true))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| StoreError::Csv {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if df.column("ticker").is_err() {
        let fill = Column::new("ticker".into(), vec![ticker; df.height()]);
        df.with_column(fill)
            .map_err(|e| StoreError::Frame(format!("add ticker column: {e}")))?;
    }

    let df = contract.conform(df).map_err(|source| StoreError::Schema {
        path: path.to_path_buf(),
        source,
    })?;
    let records = frame_to_records(&df, contract)?;
    Ok(TickerSeries::new(ticker, records)?)
}

/// Import a price CSV and write it partitioned by month under `dest`.
///
/// With `since`, months before `since`'s month are left alone.
pub fn import_csv(
    path: &Path,
    ticker: &str,
    dest: &PartitionLayout,
    contract: &SchemaContract,
    since: Option<NaiveDate>,
) -> Result<Vec<PathBuf>, StoreError> {
    let series = read_price_csv(path, ticker, contract)?;
    let files = write_series(&series, dest, contract, since)?;
    tracing::info!(
        ticker,
        rows = series.len(),
        partitions = files.len(),
        source = %path.display(),
        "imported csv"
    );
    Ok(files)
}
