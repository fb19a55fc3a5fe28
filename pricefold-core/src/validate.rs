//! Validation hooks run on a transformed series before it is persisted.

use crate::domain::{PriceField, TickerSeries};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("non-finite {column} ({value}) for '{ticker}' on {date}")]
    NonFinite {
        ticker: String,
        date: NaiveDate,
        column: PriceField,
        value: f64,
    },
}

/// A check a series must pass before it may be written.
pub trait SeriesValidator: Send + Sync {
    fn validate(&self, series: &TickerSeries) -> Result<(), ValidationError>;
}

/// Rejects NaN and infinite values in any float column.
///
/// Catches the degenerate output of a zero close in the dividend pass and
/// NaNs that propagated through a cumulative product.
#[derive(Debug, Clone, Copy, Default)]
pub struct FiniteValues;

impl SeriesValidator for FiniteValues {
    fn validate(&self, series: &TickerSeries) -> Result<(), ValidationError> {
        for rec in series.records() {
            for column in PriceField::ALL {
                let value = rec.get(column);
                if !value.is_finite() {
                    return Err(ValidationError::NonFinite {
                        ticker: series.ticker().to_string(),
                        date: rec.date,
                        column,
                        value,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceRecord;

    fn series(adj_close: f64) -> TickerSeries {
        TickerSeries::new(
            "ABC",
            vec![PriceRecord {
                date: NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(),
                ticker: "ABC".into(),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 0,
                adj_close,
                dividends: 0.0,
                stock_splits: 0.0,
            }],
        )
        .unwrap()
    }

    #[test]
    fn finite_series_passes() {
        assert!(FiniteValues.validate(&series(1.0)).is_ok());
    }

    #[test]
    fn nan_and_infinity_are_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            match FiniteValues.validate(&series(bad)) {
                Err(ValidationError::NonFinite { column, ticker, .. }) => {
                    assert_eq!(column, PriceField::AdjClose);
                    assert_eq!(ticker, "ABC");
                }
                other => panic!("expected NonFinite, got {other:?}"),
            }
        }
    }
}
