//! Re-partitioning a series into monthly files.

use super::error::StoreError;
use super::frame::records_to_frame;
use super::layout::{PartitionFile, PartitionLayout};
use super::parquet::write_frame;
use crate::domain::{PriceRecord, TickerSeries, YearMonth};
use crate::schema::SchemaContract;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Group records by calendar month, keeping each group's input order.
pub fn split_by_month(records: &[PriceRecord]) -> BTreeMap<YearMonth, Vec<PriceRecord>> {
    let mut by_month: BTreeMap<YearMonth, Vec<PriceRecord>> = BTreeMap::new();
    for rec in records {
        by_month.entry(rec.year_month()).or_default().push(rec.clone());
    }
    by_month
}

/// Write one month of records to `dest`. Only schema columns are written.
fn write_month(
    ticker: &str,
    ym: YearMonth,
    records: &[PriceRecord],
    dest: &PartitionLayout,
    contract: &SchemaContract,
) -> Result<PathBuf, StoreError> {
    let df = records_to_frame(records, contract, Vec::new())?;
    let path = dest.ticker_path(ym, ticker);
    write_frame(&df, &path)?;
    Ok(path)
}

/// Write the months a series was loaded from, mirroring them under `dest`.
///
/// Each discovered `(year, month)` gets exactly the records of that month.
/// Running this twice with the same input overwrites with identical files.
/// Records dated outside every discovered month are reported, not written.
pub fn write_discovered(
    series: &TickerSeries,
    discovered: &[PartitionFile],
    dest: &PartitionLayout,
    contract: &SchemaContract,
) -> Result<Vec<PathBuf>, StoreError> {
    let mut by_month = split_by_month(series.records());
    let mut written = Vec::with_capacity(discovered.len());
    for file in discovered {
        let records = by_month.remove(&file.year_month).unwrap_or_default();
        written.push(write_month(series.ticker(), file.year_month, &records, dest, contract)?);
    }

    for (ym, records) in &by_month {
        tracing::warn!(
            ticker = series.ticker(),
            month = %ym,
            rows = records.len(),
            "records fall outside every discovered partition, not written"
        );
    }
    Ok(written)
}

/// Write every month present in a series, optionally only from `since`'s month on.
pub fn write_series(
    series: &TickerSeries,
    dest: &PartitionLayout,
    contract: &SchemaContract,
    since: Option<NaiveDate>,
) -> Result<Vec<PathBuf>, StoreError> {
    let from = since.map(YearMonth::of);
    split_by_month(series.records())
        .into_iter()
        .filter(|(ym, _)| from.map_or(true, |f| *ym >= f))
        .map(|(ym, records)| write_month(series.ticker(), ym, &records, dest, contract))
        .collect()
}
