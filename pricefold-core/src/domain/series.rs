//! TickerSeries — an ordered, timestamp-unique run of records for one ticker.

use super::record::{PriceRecord, YearMonth};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("duplicate timestamp {date} for ticker '{ticker}'")]
    DuplicateTimestamp { ticker: String, date: NaiveDate },

    #[error("record for '{found}' found in series for '{expected}' on {date}")]
    TickerMismatch {
        expected: String,
        found: String,
        date: NaiveDate,
    },
}

/// Records for a single ticker, sorted ascending by date.
///
/// Dates are unique. Transforms take a series by reference and build a new
/// one; nothing mutates a series after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerSeries {
    ticker: String,
    records: Vec<PriceRecord>,
}

impl TickerSeries {
    /// Build a series, sorting by date and rejecting duplicates or foreign tickers.
    pub fn new(ticker: impl Into<String>, mut records: Vec<PriceRecord>) -> Result<Self, SeriesError> {
        let ticker = ticker.into();

        if let Some(foreign) = records.iter().find(|r| r.ticker != ticker) {
            return Err(SeriesError::TickerMismatch {
                expected: ticker,
                found: foreign.ticker.clone(),
                date: foreign.date,
            });
        }

        records.sort_by_key(|r| r.date);
        if let Some(pair) = records.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(SeriesError::DuplicateTimestamp {
                ticker,
                date: pair[0].date,
            });
        }

        Ok(Self { ticker, records })
    }

    /// Wrap records already known to be sorted and unique.
    ///
    /// Transforms use this: they rewrite values in place of a validated
    /// series and never touch dates.
    pub(crate) fn from_validated(ticker: String, records: Vec<PriceRecord>) -> Self {
        debug_assert!(records.windows(2).all(|w| w[0].date < w[1].date));
        Self { ticker, records }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<PriceRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    /// Distinct calendar months covered, ascending.
    pub fn months(&self) -> BTreeSet<YearMonth> {
        self.records.iter().map(PriceRecord::year_month).collect()
    }

    /// Records falling in one calendar month.
    pub fn month_slice(&self, ym: YearMonth) -> &[PriceRecord] {
        let start = self.records.partition_point(|r| r.year_month() < ym);
        let end = self.records.partition_point(|r| r.year_month() <= ym);
        &self.records[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(ticker: &str, y: i32, m: u32, d: u32) -> PriceRecord {
        PriceRecord {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            ticker: ticker.into(),
            open: 10.0,
            high: 11.0,
            low: 9.0,
            close: 10.5,
            volume: 100,
            adj_close: 10.5,
            dividends: 0.0,
            stock_splits: 0.0,
        }
    }

    #[test]
    fn new_sorts_ascending() {
        let s = TickerSeries::new(
            "ABC",
            vec![rec("ABC", 2022, 3, 1), rec("ABC", 2022, 1, 3), rec("ABC", 2022, 2, 1)],
        )
        .unwrap();
        let dates: Vec<_> = s.records().iter().map(|r| r.date).collect();
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(s.first_date(), NaiveDate::from_ymd_opt(2022, 1, 3));
    }

    #[test]
    fn new_rejects_duplicate_dates() {
        let err = TickerSeries::new("ABC", vec![rec("ABC", 2022, 1, 3), rec("ABC", 2022, 1, 3)])
            .unwrap_err();
        assert!(matches!(err, SeriesError::DuplicateTimestamp { .. }));
    }

    #[test]
    fn new_rejects_foreign_ticker() {
        let err = TickerSeries::new("ABC", vec![rec("XYZ", 2022, 1, 3)]).unwrap_err();
        assert_eq!(
            err,
            SeriesError::TickerMismatch {
                expected: "ABC".into(),
                found: "XYZ".into(),
                date: NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(),
            }
        );
    }

    #[test]
    fn month_slice_selects_one_month() {
        let s = TickerSeries::new(
            "ABC",
            vec![
                rec("ABC", 2022, 1, 3),
                rec("ABC", 2022, 1, 4),
                rec("ABC", 2022, 2, 1),
                rec("ABC", 2022, 3, 1),
            ],
        )
        .unwrap();
        assert_eq!(s.months().len(), 3);
        assert_eq!(s.month_slice(YearMonth::new(2022, 1)).len(), 2);
        assert_eq!(s.month_slice(YearMonth::new(2022, 2)).len(), 1);
        assert!(s.month_slice(YearMonth::new(2022, 4)).is_empty());
    }

    #[test]
    fn empty_series_is_valid() {
        let s = TickerSeries::new("ABC", vec![]).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.last_date(), None);
    }
}
