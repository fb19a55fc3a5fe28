//! Raw price reconstruction: undo split adjustment.
//!
//! Split factors are accumulated newest to oldest, shifted by one row, so a
//! period is scaled by every split that happened after it but not by its own.
//! Multiplying the adjusted columns by that factor recovers the prices as
//! they were quoted on the day.

use super::factors::SplitFactors;
use crate::domain::{PriceField, TickerSeries};
use crate::schema::SchemaContract;
use crate::storage::frame::{records_to_frame, ExtraColumn};
use crate::storage::StoreError;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructOptions {
    /// Columns multiplied by the cumulative factor.
    pub columns: Vec<PriceField>,
    /// Column holding split ratios.
    pub split_field: PriceField,
    /// Discard `adjust_factor` / `cum_adj_factor` from the result.
    pub drop_factor_columns: bool,
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self {
            columns: PriceField::DEFAULT_ADJUSTED.to_vec(),
            split_field: PriceField::StockSplits,
            drop_factor_columns: true,
        }
    }
}

/// A reconstructed series with its factor columns, if kept.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
    pub series: TickerSeries,
    pub factors: Option<SplitFactors>,
}

impl RawSeries {
    /// Frame of the schema columns plus the factor columns when kept.
    pub fn to_frame(&self, contract: &SchemaContract) -> Result<DataFrame, StoreError> {
        let extras = match &self.factors {
            Some(f) => vec![
                ExtraColumn {
                    name: SplitFactors::ADJUST_FACTOR,
                    values: f.adjust_factor.clone(),
                },
                ExtraColumn {
                    name: SplitFactors::CUM_ADJ_FACTOR,
                    values: f.cum_adj_factor.clone(),
                },
            ],
            None => Vec::new(),
        };
        records_to_frame(self.series.records(), contract, extras)
    }
}

/// Convert split-adjusted prices back to raw prices.
pub fn reconstruct_raw(series: &TickerSeries, opts: &ReconstructOptions) -> RawSeries {
    let newest_first_ratios: Vec<f64> = series
        .records()
        .iter()
        .rev()
        .map(|r| r.get(opts.split_field))
        .collect();
    let factors = SplitFactors::from_newest_first(&newest_first_ratios);

    let records = series
        .records()
        .iter()
        .zip(&factors.cum_adj_factor)
        .map(|(rec, &factor)| {
            let mut rec = rec.clone();
            for &field in &opts.columns {
                *rec.field_mut(field) *= factor;
            }
            rec
        })
        .collect();

    RawSeries {
        series: TickerSeries::from_validated(series.ticker().to_string(), records),
        factors: (!opts.drop_factor_columns).then_some(factors),
    }
}
