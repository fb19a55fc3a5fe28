//! Domain types for pricefold

pub mod field;
pub mod record;
pub mod series;

pub use field::{PriceField, UnknownField};
pub use record::{PriceRecord, YearMonth};
pub use series::{SeriesError, TickerSeries};
