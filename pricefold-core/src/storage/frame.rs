//! Conversion between polars frames and `PriceRecord`s.

use super::error::StoreError;
use crate::domain::PriceRecord;
use crate::schema::SchemaContract;
use chrono::NaiveDate;
use polars::prelude::*;

/// An extra float column appended after the schema columns (derived factors).
pub struct ExtraColumn<'a> {
    pub name: &'a str,
    pub values: Vec<f64>,
}

/// 1970-01-01, the zero point of polars' `Date` physical type.
fn epoch() -> NaiveDate {
    NaiveDate::default()
}

/// Build a frame with the schema columns in canonical order, plus any extras.
pub fn records_to_frame(
    records: &[PriceRecord],
    contract: &SchemaContract,
    extras: Vec<ExtraColumn<'_>>,
) -> Result<DataFrame, StoreError> {
    let frame_err = |e: PolarsError| StoreError::Frame(format!("dataframe creation: {e}"));

    let dates: Vec<i32> = records
        .iter()
        .map(|r| (r.date - epoch()).num_days() as i32)
        .collect();
    let tickers: Vec<&str> = records.iter().map(|r| r.ticker.as_str()).collect();
    let float_col = |name: &str, f: fn(&PriceRecord) -> f64| {
        Column::new(name.into(), records.iter().map(f).collect::<Vec<f64>>())
    };
    let volumes: Vec<i64> = records.iter().map(|r| r.volume).collect();

    let mut columns = vec![
        Column::new(contract.index_column().into(), dates)
            .cast(&DataType::Date)
            .map_err(frame_err)?,
        Column::new("ticker".into(), tickers),
        float_col("open", |r| r.open),
        float_col("high", |r| r.high),
        float_col("low", |r| r.low),
        float_col("close", |r| r.close),
        Column::new("volume".into(), volumes),
        float_col("adj close", |r| r.adj_close),
        float_col("dividends", |r| r.dividends),
        float_col("stock splits", |r| r.stock_splits),
    ];

    for extra in extras {
        if extra.values.len() != records.len() {
            return Err(StoreError::Frame(format!(
                "derived column '{}' has {} values for {} records",
                extra.name,
                extra.values.len(),
                records.len()
            )));
        }
        columns.push(Column::new(extra.name.into(), extra.values));
    }

    DataFrame::new(columns).map_err(frame_err)
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, StoreError> {
    df.column(name)
        .map_err(|e| StoreError::Frame(format!("column read '{name}': {e}")))
}

fn type_err(name: &str, e: PolarsError) -> StoreError {
    StoreError::Frame(format!("{name} column type: {e}"))
}

fn f64_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Float64Chunked, StoreError> {
    column(df, name)?.f64().map_err(|e| type_err(name, e))
}

fn null_at(name: &str, row: usize) -> StoreError {
    StoreError::Frame(format!("null {name} at row {row}"))
}

/// Convert a frame already conformed to the contract back to records.
pub fn frame_to_records(
    df: &DataFrame,
    contract: &SchemaContract,
) -> Result<Vec<PriceRecord>, StoreError> {
    let index = contract.index_column();
    let date_ca = column(df, index)?.date().map_err(|e| type_err(index, e))?;
    let ticker_ca = column(df, "ticker")?.str().map_err(|e| type_err("ticker", e))?;
    let vol_ca = column(df, "volume")?.i64().map_err(|e| type_err("volume", e))?;
    let open_ca = f64_column(df, "open")?;
    let high_ca = f64_column(df, "high")?;
    let low_ca = f64_column(df, "low")?;
    let close_ca = f64_column(df, "close")?;
    let adj_ca = f64_column(df, "adj close")?;
    let div_ca = f64_column(df, "dividends")?;
    let split_ca = f64_column(df, "stock splits")?;

    let get_f64 =
        |ca: &Float64Chunked, name: &str, i: usize| ca.get(i).ok_or_else(|| null_at(name, i));

    let n = df.height();
    let mut records = Vec::with_capacity(n);
    for i in 0..n {
        let days = date_ca.get(i).ok_or_else(|| null_at(index, i))?;
        records.push(PriceRecord {
            date: epoch() + chrono::Duration::days(days as i64),
            ticker: ticker_ca
                .get(i)
                .ok_or_else(|| null_at("ticker", i))?
                .to_string(),
            open: get_f64(open_ca, "open", i)?,
            high: get_f64(high_ca, "high", i)?,
            low: get_f64(low_ca, "low", i)?,
            close: get_f64(close_ca, "close", i)?,
            volume: vol_ca.get(i).ok_or_else(|| null_at("volume", i))?,
            adj_close: get_f64(adj_ca, "adj close", i)?,
            dividends: get_f64(div_ca, "dividends", i)?,
            stock_splits: get_f64(split_ca, "stock splits", i)?,
        });
    }

    Ok(records)
}
