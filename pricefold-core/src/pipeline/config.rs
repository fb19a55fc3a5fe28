//! Serializable pipeline configuration.
//!
//! Everything a run needs is passed in through this struct: storage roots,
//! the year range, which columns to rewrite, and the persistence policy.
//! Loadable from TOML; CLI flags override individual fields.

use crate::domain::PriceField;
use crate::schema::{SchemaContract, DEFAULT_INDEX_COLUMN};
use crate::storage::{InvalidYearRange, YearRange};
use crate::transform::{AdjustOptions, ReconstructOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    InvalidYearRange(#[from] InvalidYearRange),

    #[error("at least one column to adjust is required")]
    NoColumns,
}

fn default_columns() -> Vec<PriceField> {
    PriceField::DEFAULT_ADJUSTED.to_vec()
}

fn default_split_column() -> PriceField {
    PriceField::StockSplits
}

fn default_index_column() -> String {
    DEFAULT_INDEX_COLUMN.to_string()
}

fn default_true() -> bool {
    true
}

/// Configuration for reconstruct and adjust runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Root of the input partition tree.
    pub source_dir: PathBuf,

    /// Root the transformed partitions are written under.
    pub dest_dir: PathBuf,

    /// First year to load (inclusive).
    pub first_year: i32,

    /// Last year to load (inclusive).
    pub last_year: i32,

    /// Columns rewritten by the split factor.
    #[serde(default = "default_columns")]
    pub columns: Vec<PriceField>,

    /// Column holding split ratios.
    #[serde(default = "default_split_column")]
    pub split_column: PriceField,

    /// Name of the date index column in the parquet files.
    #[serde(default = "default_index_column")]
    pub index_column: String,

    /// Drop the split factor columns from reconstructed results.
    #[serde(default = "default_true")]
    pub drop_factor_columns: bool,

    /// Write results to `dest_dir` instead of returning them.
    #[serde(default = "default_true")]
    pub persist: bool,

    /// Refuse to persist series containing NaN or infinite values.
    #[serde(default)]
    pub reject_degenerate: bool,

    /// Run batch tickers on the rayon pool.
    #[serde(default)]
    pub parallel: bool,
}

impl PipelineConfig {
    pub fn new(source_dir: impl Into<PathBuf>, dest_dir: impl Into<PathBuf>, years: YearRange) -> Self {
        Self {
            source_dir: source_dir.into(),
            dest_dir: dest_dir.into(),
            first_year: years.first(),
            last_year: years.last(),
            columns: default_columns(),
            split_column: default_split_column(),
            index_column: default_index_column(),
            drop_factor_columns: true,
            persist: true,
            reject_degenerate: false,
            parallel: false,
        }
    }

    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.years()?;
        if self.columns.is_empty() {
            return Err(ConfigError::NoColumns);
        }
        Ok(())
    }

    pub fn years(&self) -> Result<YearRange, InvalidYearRange> {
        YearRange::new(self.first_year, self.last_year)
    }

    pub fn contract(&self) -> SchemaContract {
        SchemaContract::new(self.index_column.clone())
    }

    pub fn reconstruct_options(&self) -> ReconstructOptions {
        ReconstructOptions {
            columns: self.columns.clone(),
            split_field: self.split_column,
            drop_factor_columns: self.drop_factor_columns,
        }
    }

    pub fn adjust_options(&self) -> AdjustOptions {
        AdjustOptions {
            columns: self.columns.clone(),
            split_field: self.split_column,
        }
    }
}
