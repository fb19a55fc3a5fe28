//! The two inverse transforms and the factor math they share.

pub mod adjust;
pub mod factors;
pub mod reconstruct;

pub use adjust::{adjust_prices, AdjustOptions, AdjustedSeries};
pub use factors::{DividendFactors, SplitFactors};
pub use reconstruct::{reconstruct_raw, RawSeries, ReconstructOptions};
