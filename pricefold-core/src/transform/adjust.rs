//! Price adjustment: raw prices to split- and dividend-adjusted prices.
//!
//! Step order matters and is fixed:
//! 1. divide the selected columns by the shifted cumulative split factor;
//! 2. derive forward dividends, retention rates and their running product
//!    from the split-adjusted `dividends` and `close`;
//! 3. write `adj close = accum_retention * close`.
//!
//! A zero close makes the retention rate non-finite. The value is carried
//! through to `adj close` rather than rejected here; see [`crate::validate`].

use super::factors::{DividendFactors, SplitFactors};
use crate::domain::{PriceField, TickerSeries};
use crate::schema::SchemaContract;
use crate::storage::frame::{records_to_frame, ExtraColumn};
use crate::storage::StoreError;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustOptions {
    /// Columns divided by the cumulative split factor.
    pub columns: Vec<PriceField>,
    /// Column holding split ratios.
    pub split_field: PriceField,
}

impl Default for AdjustOptions {
    fn default() -> Self {
        Self {
            columns: PriceField::DEFAULT_ADJUSTED.to_vec(),
            split_field: PriceField::StockSplits,
        }
    }
}

/// An adjusted series with its derived factor columns.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustedSeries {
    pub series: TickerSeries,
    pub split: SplitFactors,
    pub dividend: DividendFactors,
}

impl AdjustedSeries {
    /// Frame of the schema columns followed by every derived column.
    pub fn to_frame(&self, contract: &SchemaContract) -> Result<DataFrame, StoreError> {
        let extras = vec![
            ExtraColumn {
                name: SplitFactors::ADJUST_FACTOR,
                values: self.split.adjust_factor.clone(),
            },
            ExtraColumn {
                name: SplitFactors::CUM_ADJ_FACTOR,
                values: self.split.cum_adj_factor.clone(),
            },
            ExtraColumn {
                name: DividendFactors::FWD_DIV,
                values: self.dividend.fwd_div.clone(),
            },
            ExtraColumn {
                name: DividendFactors::RETENTION_RATE,
                values: self.dividend.retention_rate.clone(),
            },
            ExtraColumn {
                name: DividendFactors::ACCUM_RETENTION,
                values: self.dividend.accum_retention.clone(),
            },
        ];
        records_to_frame(self.series.records(), contract, extras)
    }
}

/// Adjust raw prices for splits and dividends.
pub fn adjust_prices(series: &TickerSeries, opts: &AdjustOptions) -> AdjustedSeries {
    let newest_first_ratios: Vec<f64> = series
        .records()
        .iter()
        .rev()
        .map(|r| r.get(opts.split_field))
        .collect();
    let split = SplitFactors::from_newest_first(&newest_first_ratios);

    let mut records: Vec<_> = series
        .records()
        .iter()
        .zip(&split.cum_adj_factor)
        .map(|(rec, &factor)| {
            let mut rec = rec.clone();
            for &field in &opts.columns {
                *rec.field_mut(field) /= factor;
            }
            rec
        })
        .collect();

    // Dividend pass reads the split-adjusted columns
    let dividends: Vec<f64> = records.iter().rev().map(|r| r.dividends).collect();
    let closes: Vec<f64> = records.iter().rev().map(|r| r.close).collect();
    let dividend = DividendFactors::from_newest_first(&dividends, &closes);

    for (rec, &retained) in records.iter_mut().zip(&dividend.accum_retention) {
        rec.adj_close = retained * rec.close;
    }

    AdjustedSeries {
        series: TickerSeries::from_validated(series.ticker().to_string(), records),
        split,
        dividend,
    }
}
