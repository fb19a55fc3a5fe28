//! PriceRecord — one trading-period observation for one ticker.

use super::field::PriceField;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of the partitioned store.
///
/// Prices are in currency units. `stock_splits` uses 0 and 1 to mean
/// "no split"; any other value N is an N-for-1 split in that period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub ticker: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub adj_close: f64,
    pub dividends: f64,
    pub stock_splits: f64,
}

impl PriceRecord {
    /// Read a float column by field.
    pub fn get(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
            PriceField::AdjClose => self.adj_close,
            PriceField::Dividends => self.dividends,
            PriceField::StockSplits => self.stock_splits,
        }
    }

    /// Mutable access to a float column by field.
    pub fn field_mut(&mut self, field: PriceField) -> &mut f64 {
        match field {
            PriceField::Open => &mut self.open,
            PriceField::High => &mut self.high,
            PriceField::Low => &mut self.low,
            PriceField::Close => &mut self.close,
            PriceField::AdjClose => &mut self.adj_close,
            PriceField::Dividends => &mut self.dividends,
            PriceField::StockSplits => &mut self.stock_splits,
        }
    }

    /// Calendar month this record belongs to.
    pub fn year_month(&self) -> YearMonth {
        YearMonth::of(self.date)
    }
}

/// A calendar (year, month) pair; the unit of partitioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// True if `date` falls in this month.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}
