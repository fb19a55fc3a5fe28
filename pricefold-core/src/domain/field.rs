//! PriceField — the float columns a transform may read or rewrite.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A float-valued column of the price schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    AdjClose,
    Dividends,
    StockSplits,
}

impl PriceField {
    pub const ALL: [PriceField; 7] = [
        PriceField::Open,
        PriceField::High,
        PriceField::Low,
        PriceField::Close,
        PriceField::AdjClose,
        PriceField::Dividends,
        PriceField::StockSplits,
    ];

    /// Columns rewritten by both transforms unless configured otherwise.
    pub const DEFAULT_ADJUSTED: [PriceField; 5] = [
        PriceField::Open,
        PriceField::High,
        PriceField::Low,
        PriceField::Close,
        PriceField::Dividends,
    ];

    /// Column name as stored in the parquet files.
    pub fn column_name(self) -> &'static str {
        match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
            PriceField::AdjClose => "adj close",
            PriceField::Dividends => "dividends",
            PriceField::StockSplits => "stock splits",
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown price column '{0}'")]
pub struct UnknownField(pub String);

impl FromStr for PriceField {
    type Err = UnknownField;

    /// Accepts the stored column name or its snake_case spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', " ");
        PriceField::ALL
            .into_iter()
            .find(|f| f.column_name() == normalized)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

impl TryFrom<String> for PriceField {
    type Error = UnknownField;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PriceField> for String {
    fn from(field: PriceField) -> Self {
        field.column_name().to_string()
    }
}
