//! Parquet I/O for partition files.
//!
//! Reads conform every file to the schema contract before any record is
//! built. Writes are atomic: write to `.parquet.tmp`, then rename into place.

use super::error::StoreError;
use super::frame::frame_to_records;
use super::layout::PartitionFile;
use crate::domain::{PriceRecord, TickerSeries};
use crate::schema::SchemaContract;
use polars::prelude::*;
use std::fs;
use std::path::Path;

/// Read one partition file and return its records.
pub fn read_partition(path: &Path, contract: &SchemaContract) -> Result<Vec<PriceRecord>, StoreError> {
    let file = fs::File::open(path).map_err(|e| StoreError::io(path, e))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| StoreError::parquet(path, format!("read: {e}")))?;

    let df = contract.conform(df).map_err(|source| StoreError::Schema {
        path: path.to_path_buf(),
        source,
    })?;

    let records = frame_to_records(&df, contract)?;
    tracing::debug!(path = %path.display(), rows = records.len(), "read partition");
    Ok(records)
}

/// Load every discovered partition of one ticker into a single series.
///
/// Fails on the first schema error; a bad file is fatal for the ticker.
pub fn load_series(
    ticker: &str,
    files: &[PartitionFile],
    contract: &SchemaContract,
) -> Result<TickerSeries, StoreError> {
    let mut records = Vec::new();
    for file in files {
        records.extend(read_partition(&file.path, contract)?);
    }
    Ok(TickerSeries::new(ticker, records)?)
}

/// Write a frame to `path` atomically, creating parent directories.
pub fn write_frame(df: &DataFrame, path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let tmp_path = path.with_extension("parquet.tmp");
    let file = fs::File::create(&tmp_path).map_err(|e| StoreError::io(&tmp_path, e))?;
    if let Err(e) = ParquetWriter::new(file).finish(&mut df.clone()) {
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::parquet(path, format!("write: {e}")));
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        // Clean up temp file on rename failure
        let _ = fs::remove_file(&tmp_path);
        StoreError::io(path, e)
    })?;

    tracing::debug!(path = %path.display(), rows = df.height(), "wrote partition");
    Ok(())
}
