//! Split and dividend factor math.
//!
//! Every function here takes columns ordered newest first, which is the order
//! the cumulative products run in. Callers reverse the results back to
//! ascending order when attaching them to a series.

use serde::{Deserialize, Serialize};

/// Per-row split multiplier: 1 where the ratio is the 0 sentinel, the ratio otherwise.
pub fn split_adjust_factors(split_ratios: &[f64]) -> Vec<f64> {
    split_ratios
        .iter()
        .map(|&ratio| if ratio == 0.0 { 1.0 } else { ratio })
        .collect()
}

/// Running product of `factors`, shifted down one row with the first row set to 1.
///
/// Row i holds the product of rows `0..i`, so a period's own split is
/// excluded and only splits that happened after it (in calendar time) apply.
pub fn cumulative_adjustment_factors(factors: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(factors.len());
    let mut acc = 1.0;
    for &f in factors {
        out.push(acc);
        acc *= f;
    }
    out
}

/// Dividend of the next more recent row; 0 for the newest row.
pub fn forward_dividends(dividends: &[f64]) -> Vec<f64> {
    std::iter::once(0.0)
        .chain(dividends.iter().copied())
        .take(dividends.len())
        .collect()
}

/// `1 - fwd_div / close`. A zero close yields a non-finite rate.
pub fn retention_rates(forward_dividends: &[f64], closes: &[f64]) -> Vec<f64> {
    forward_dividends
        .iter()
        .zip(closes)
        .map(|(div, close)| 1.0 - div / close)
        .collect()
}

/// Unshifted running product.
pub fn cumulative_product(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(1.0, |acc, &v| {
            *acc *= v;
            Some(*acc)
        })
        .collect()
}

/// Split factor columns, aligned to a series in ascending date order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitFactors {
    pub adjust_factor: Vec<f64>,
    pub cum_adj_factor: Vec<f64>,
}

impl SplitFactors {
    pub const ADJUST_FACTOR: &'static str = "adjust_factor";
    pub const CUM_ADJ_FACTOR: &'static str = "cum_adj_factor";

    /// Compute from split ratios ordered newest first; stored ascending.
    pub fn from_newest_first(split_ratios: &[f64]) -> Self {
        let mut adjust_factor = split_adjust_factors(split_ratios);
        let mut cum_adj_factor = cumulative_adjustment_factors(&adjust_factor);
        adjust_factor.reverse();
        cum_adj_factor.reverse();
        Self {
            adjust_factor,
            cum_adj_factor,
        }
    }
}

/// Dividend retention columns, aligned to a series in ascending date order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendFactors {
    pub fwd_div: Vec<f64>,
    pub retention_rate: Vec<f64>,
    pub accum_retention: Vec<f64>,
}

impl DividendFactors {
    pub const FWD_DIV: &'static str = "fwd_div";
    pub const RETENTION_RATE: &'static str = "retention_rate";
    pub const ACCUM_RETENTION: &'static str = "accum_retention";

    /// Compute from dividends and closes ordered newest first; stored ascending.
    pub fn from_newest_first(dividends: &[f64], closes: &[f64]) -> Self {
        let mut fwd_div = forward_dividends(dividends);
        let mut retention_rate = retention_rates(&fwd_div, closes);
        let mut accum_retention = cumulative_product(&retention_rate);
        fwd_div.reverse();
        retention_rate.reverse();
        accum_retention.reverse();
        Self {
            fwd_div,
            retention_rate,
            accum_retention,
        }
    }
}
