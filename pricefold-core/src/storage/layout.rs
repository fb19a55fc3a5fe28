//! Partition layout and path resolution.
//!
//! Layout: `{base}/{year}/{month:02}/{ticker}.parquet`
//!
//! Resolution never fails because data is missing: a month directory or a
//! ticker file that does not exist is skipped, so a ticker with no data in the
//! whole range resolves to an empty list.

use super::error::StoreError;
use crate::domain::YearMonth;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

const PARQUET_EXT: &str = "parquet";

/// Inclusive range of calendar years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    first: i32,
    last: i32,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid year range: first year {first} is after last year {last}")]
pub struct InvalidYearRange {
    pub first: i32,
    pub last: i32,
}

impl YearRange {
    pub fn new(first: i32, last: i32) -> Result<Self, InvalidYearRange> {
        if first > last {
            return Err(InvalidYearRange { first, last });
        }
        Ok(Self { first, last })
    }

    pub fn first(&self) -> i32 {
        self.first
    }

    pub fn last(&self) -> i32 {
        self.last
    }

    /// Every (year, month) in the range, ascending.
    pub fn months(&self) -> impl Iterator<Item = YearMonth> {
        (self.first..=self.last).flat_map(|y| (1..=12).map(move |m| YearMonth::new(y, m)))
    }
}

/// One discovered partition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionFile {
    pub year_month: YearMonth,
    pub ticker: String,
    pub path: PathBuf,
}

/// A `{year}/{month}/{ticker}.parquet` tree rooted at `base`.
#[derive(Debug, Clone)]
pub struct PartitionLayout {
    base: PathBuf,
}

impl PartitionLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// `{base}/{year}/{month:02}`
    pub fn month_dir(&self, ym: YearMonth) -> PathBuf {
        self.base
            .join(ym.year.to_string())
            .join(format!("{:02}", ym.month))
    }

    /// `{base}/{year}/{month:02}/{ticker}.parquet`
    pub fn ticker_path(&self, ym: YearMonth, ticker: &str) -> PathBuf {
        self.month_dir(ym).join(format!("{ticker}.{PARQUET_EXT}"))
    }

    /// Discover partition files over a year range.
    ///
    /// With `ticker = None`, every parquet file in each month directory is
    /// returned (all tickers). Results are ordered by month, then ticker.
    pub fn resolve(
        &self,
        ticker: Option<&str>,
        years: YearRange,
    ) -> Result<Vec<PartitionFile>, StoreError> {
        let mut files = Vec::new();

        for ym in years.months() {
            match ticker {
                Some(t) => {
                    let path = self.ticker_path(ym, t);
                    if path.is_file() {
                        files.push(PartitionFile {
                            year_month: ym,
                            ticker: t.to_string(),
                            path,
                        });
                    }
                }
                None => files.extend(self.list_month(ym)?),
            }
        }

        tracing::debug!(
            base = %self.base.display(),
            ticker = ticker.unwrap_or("*"),
            first_year = years.first(),
            last_year = years.last(),
            found = files.len(),
            "resolved partitions"
        );
        Ok(files)
    }

    /// All ticker files in one month directory, sorted by ticker.
    fn list_month(&self, ym: YearMonth) -> Result<Vec<PartitionFile>, StoreError> {
        let dir = self.month_dir(ym);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&dir, e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&dir, e))?.path();

            // Skip temp files and anything that is not a partition
            if path.extension().and_then(|e| e.to_str()) != Some(PARQUET_EXT) || !path.is_file() {
                continue;
            }
            let Some(ticker) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            files.push(PartitionFile {
                year_month: ym,
                ticker: ticker.to_string(),
                path: path.clone(),
            });
        }

        files.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        Ok(files)
    }
}
