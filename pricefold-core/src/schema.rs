//! Parquet schema contract for partition files.
//!
//! Defines the exact column names and data types every
//! `{year}/{month}/{ticker}.parquet` file must carry, and the explicit table of
//! casts allowed when a file was written with a narrower type.
//!
//! - Columns: ticker, open, high, low, close, volume, adj close, dividends, stock splits
//! - Index: a date column (default `date`), also accepted under the pandas
//!   artefact name `__index_level_0__`
//! - Unknown columns are rejected, not dropped

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default name of the timestamp index column.
pub const DEFAULT_INDEX_COLUMN: &str = "date";

/// Name pandas gives an unnamed index when writing parquet.
pub const PANDAS_INDEX_ARTEFACT: &str = "__index_level_0__";

/// Declared semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaType {
    Date,
    String,
    Float64,
    Int64,
}

/// What to do with a column whose stored dtype differs from its declared one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastRule {
    /// Stored type already matches.
    Exact,
    /// Lossless widening; cast on load.
    Widen,
    /// Midnight timestamps reduced to their wall-clock date in their own zone.
    LocalDate,
    /// Incompatible; fail the load.
    Reject,
}

impl SchemaType {
    pub fn dtype(self) -> DataType {
        match self {
            SchemaType::Date => DataType::Date,
            SchemaType::String => DataType::String,
            SchemaType::Float64 => DataType::Float64,
            SchemaType::Int64 => DataType::Int64,
        }
    }

    /// The casting table.
    pub fn cast_rule(self, actual: &DataType) -> CastRule {
        use DataType as D;
        match (self, actual) {
            (SchemaType::Date, D::Date)
            | (SchemaType::String, D::String)
            | (SchemaType::Float64, D::Float64)
            | (SchemaType::Int64, D::Int64) => CastRule::Exact,

            (SchemaType::Date, D::Datetime(_, _)) => CastRule::LocalDate,
            (
                SchemaType::Float64,
                D::Float32 | D::Int8 | D::Int16 | D::Int32 | D::UInt8 | D::UInt16 | D::UInt32,
            ) => CastRule::Widen,
            (SchemaType::Int64, D::Int8 | D::Int16 | D::Int32 | D::UInt8 | D::UInt16 | D::UInt32) => {
                CastRule::Widen
            }

            _ => CastRule::Reject,
        }
    }
}

/// A single column of the contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: &'static str,
    pub dtype: SchemaType,
}

/// Data columns in canonical order (index column excluded).
pub const PRICE_SCHEMA: &[SchemaField] = &[
    SchemaField {
        name: "ticker",
        dtype: SchemaType::String,
    },
    SchemaField {
        name: "open",
        dtype: SchemaType::Float64,
    },
    SchemaField {
        name: "high",
        dtype: SchemaType::Float64,
    },
    SchemaField {
        name: "low",
        dtype: SchemaType::Float64,
    },
    SchemaField {
        name: "close",
        dtype: SchemaType::Float64,
    },
    SchemaField {
        name: "volume",
        dtype: SchemaType::Int64,
    },
    SchemaField {
        name: "adj close",
        dtype: SchemaType::Float64,
    },
    SchemaField {
        name: "dividends",
        dtype: SchemaType::Float64,
    },
    SchemaField {
        name: "stock splits",
        dtype: SchemaType::Float64,
    },
];

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("unknown column '{0}' is not part of the price schema")]
    UnknownColumn(String),

    #[error("type mismatch in column '{column}': expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },

    #[error("column '{column}' has {count} null value(s)")]
    NullValue { column: String, count: usize },

    #[error("failed to cast column '{column}': {reason}")]
    Cast { column: String, reason: String },

    #[error("column '{column}' has unknown time zone '{tz}'")]
    UnknownTimeZone { column: String, tz: String },

    #[error("column '{column}' row {row} is intraday ({value}); daily bars must be at local midnight")]
    IntradayTimestamp {
        column: String,
        row: usize,
        value: NaiveDateTime,
    },
}

/// Validates and conforms frames to the price schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaContract {
    index_column: String,
}

impl SchemaContract {
    pub fn new(index_column: impl Into<String>) -> Self {
        Self {
            index_column: index_column.into(),
        }
    }

    pub fn index_column(&self) -> &str {
        &self.index_column
    }

    /// All column names in canonical order, index first.
    pub fn column_names(&self) -> Vec<&str> {
        std::iter::once(self.index_column.as_str())
            .chain(PRICE_SCHEMA.iter().map(|f| f.name))
            .collect()
    }

    /// Check a frame against the contract and return it with declared types
    /// and canonical column order.
    ///
    /// Applies only the widenings listed in [`SchemaType::cast_rule`].
    pub fn conform(&self, mut df: DataFrame) -> Result<DataFrame, SchemaError> {
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();

        if !names.iter().any(|n| n == &self.index_column) {
            if names.iter().any(|n| n == PANDAS_INDEX_ARTEFACT) {
                df.rename(PANDAS_INDEX_ARTEFACT, self.index_column.as_str().into())
                    .map_err(|e| SchemaError::Cast {
                        column: PANDAS_INDEX_ARTEFACT.to_string(),
                        reason: e.to_string(),
                    })?;
            } else {
                return Err(SchemaError::MissingColumn(self.index_column.clone()));
            }
        }

        for name in &names {
            let known = name == &self.index_column
                || name == PANDAS_INDEX_ARTEFACT
                || PRICE_SCHEMA.iter().any(|f| f.name == name);
            if !known {
                return Err(SchemaError::UnknownColumn(name.clone()));
            }
        }

        let fields = std::iter::once((self.index_column.as_str(), SchemaType::Date))
            .chain(PRICE_SCHEMA.iter().map(|f| (f.name, f.dtype)));

        for (name, declared) in fields {
            let column = df
                .column(name)
                .map_err(|_| SchemaError::MissingColumn(name.to_string()))?;

            let nulls = column.null_count();
            if nulls > 0 {
                return Err(SchemaError::NullValue {
                    column: name.to_string(),
                    count: nulls,
                });
            }

            match declared.cast_rule(column.dtype()) {
                CastRule::Exact => {}
                CastRule::Widen => {
                    let cast = column
                        .cast(&declared.dtype())
                        .map_err(|e| SchemaError::Cast {
                            column: name.to_string(),
                            reason: e.to_string(),
                        })?;
                    df.with_column(cast).map_err(|e| SchemaError::Cast {
                        column: name.to_string(),
                        reason: e.to_string(),
                    })?;
                }
                CastRule::LocalDate => {
                    let DataType::Datetime(unit, tz) = column.dtype() else {
                        return Err(SchemaError::TypeMismatch {
                            column: name.to_string(),
                            expected: declared.dtype(),
                            actual: column.dtype().clone(),
                        });
                    };
                    let dates = datetime_to_local_date(name, column, *unit, tz.as_deref())?;
                    df.with_column(dates).map_err(|e| SchemaError::Cast {
                        column: name.to_string(),
                        reason: e.to_string(),
                    })?;
                }
                CastRule::Reject => {
                    return Err(SchemaError::TypeMismatch {
                        column: name.to_string(),
                        expected: declared.dtype(),
                        actual: column.dtype().clone(),
                    });
                }
            }
        }

        df.select(self.column_names()).map_err(|e| SchemaError::Cast {
            column: self.index_column.clone(),
            reason: e.to_string(),
        })
    }
}

/// Reduce a `Datetime` column to `Date` on the wall clock of its own zone.
///
/// The physical value is UTC; a tz-aware bar at local midnight east of UTC
/// lies on the previous UTC day, so truncating it directly shifts the date.
fn datetime_to_local_date(
    name: &str,
    column: &Column,
    unit: TimeUnit,
    tz: Option<&str>,
) -> Result<Column, SchemaError> {
    let zone = match tz {
        Some(tz) => Some(tz.parse::<Tz>().map_err(|_| SchemaError::UnknownTimeZone {
            column: name.to_string(),
            tz: tz.to_string(),
        })?),
        None => None,
    };
    let cast_err = |reason: String| SchemaError::Cast {
        column: name.to_string(),
        reason,
    };

    let physical = column
        .cast(&DataType::Int64)
        .map_err(|e| cast_err(e.to_string()))?;
    let ticks = physical.i64().map_err(|e| cast_err(e.to_string()))?;

    let epoch = NaiveDate::default();
    let mut days = Vec::with_capacity(ticks.len());
    for (row, tick) in ticks.into_iter().enumerate() {
        let Some(tick) = tick else {
            return Err(SchemaError::NullValue {
                column: name.to_string(),
                count: 1,
            });
        };
        let utc: DateTime<Utc> = match unit {
            TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(tick)),
            TimeUnit::Microseconds => DateTime::from_timestamp_micros(tick),
            TimeUnit::Milliseconds => DateTime::from_timestamp_millis(tick),
        }
        .ok_or_else(|| cast_err(format!("timestamp {tick} out of range at row {row}")))?;

        let local = match zone {
            Some(zone) => utc.with_timezone(&zone).naive_local(),
            None => utc.naive_utc(),
        };
        if local.time() != NaiveTime::MIN {
            return Err(SchemaError::IntradayTimestamp {
                column: name.to_string(),
                row,
                value: local,
            });
        }
        days.push((local.date() - epoch).num_days() as i32);
    }

    Column::new(name.into(), days)
        .cast(&DataType::Date)
        .map_err(|e| cast_err(e.to_string()))
}

impl Default for SchemaContract {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_COLUMN)
    }
}
