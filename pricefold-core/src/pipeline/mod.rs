//! Pipeline entry points: resolve → load → transform → validate → persist.
//!
//! Each ticker is processed independently with no shared state, so batches
//! may run on the rayon pool; per-ticker results keep input order either way.

pub mod batch;
pub mod config;

pub use batch::{BatchReport, Outcome, TickerOutcome};
pub use config::{ConfigError, PipelineConfig};

use crate::domain::TickerSeries;
use crate::schema::SchemaContract;
use crate::storage::{self, PartitionFile, PartitionLayout, StoreError, YearRange};
use crate::transform::{adjust_prices, reconstruct_raw, AdjustedSeries, RawSeries};
use crate::validate::{FiniteValues, SeriesValidator, ValidationError};
use rayon::prelude::*;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{ticker}: {source}")]
    Store {
        ticker: String,
        #[source]
        source: StoreError,
    },

    #[error("{ticker}: rejected before persistence: {source}")]
    Rejected {
        ticker: String,
        #[source]
        source: ValidationError,
    },
}

/// Runs the reconstruct and adjust transforms against a partition tree.
pub struct Pipeline {
    config: PipelineConfig,
    years: YearRange,
    source: PartitionLayout,
    dest: PartitionLayout,
    contract: SchemaContract,
    validators: Vec<Box<dyn SeriesValidator>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let years = config.years()?;

        let mut validators: Vec<Box<dyn SeriesValidator>> = Vec::new();
        if config.reject_degenerate {
            validators.push(Box::new(FiniteValues));
        }

        Ok(Self {
            years,
            source: PartitionLayout::new(&config.source_dir),
            dest: PartitionLayout::new(&config.dest_dir),
            contract: config.contract(),
            validators,
            config,
        })
    }

    /// Add a check every series must pass before it is written.
    pub fn with_validator(mut self, validator: impl SeriesValidator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Resolve and load a ticker. `None` when no partitions exist in range.
    fn load(&self, ticker: &str) -> Result<Option<(TickerSeries, Vec<PartitionFile>)>, StoreError> {
        let files = self.source.resolve(Some(ticker), self.years)?;
        if files.is_empty() {
            tracing::debug!(ticker, "no partitions in range, skipping");
            return Ok(None);
        }
        let series = storage::load_series(ticker, &files, &self.contract)?;
        Ok(Some((series, files)))
    }

    /// Validate, then mirror the discovered partitions under the destination.
    fn persist(
        &self,
        series: &TickerSeries,
        files: &[PartitionFile],
    ) -> Result<Vec<PathBuf>, PipelineError> {
        for validator in &self.validators {
            validator
                .validate(series)
                .map_err(|source| PipelineError::Rejected {
                    ticker: series.ticker().to_string(),
                    source,
                })?;
        }
        storage::write_discovered(series, files, &self.dest, &self.contract).map_err(|source| {
            PipelineError::Store {
                ticker: series.ticker().to_string(),
                source,
            }
        })
    }

    /// Reconstruct raw prices for one ticker.
    pub fn reconstruct_raw(&self, ticker: &str) -> Result<Outcome<RawSeries>, PipelineError> {
        let store_err = |source| PipelineError::Store {
            ticker: ticker.to_string(),
            source,
        };
        let Some((series, files)) = self.load(ticker).map_err(store_err)? else {
            return Ok(Outcome::NoData);
        };

        let raw = reconstruct_raw(&series, &self.config.reconstruct_options());
        tracing::info!(ticker, rows = raw.series.len(), partitions = files.len(), "reconstructed raw prices");

        if self.config.persist {
            let files = self.persist(&raw.series, &files)?;
            Ok(Outcome::Persisted { files })
        } else {
            Ok(Outcome::InMemory(raw))
        }
    }

    /// Adjust raw prices for splits and dividends for one ticker.
    pub fn adjust(&self, ticker: &str) -> Result<Outcome<AdjustedSeries>, PipelineError> {
        let store_err = |source| PipelineError::Store {
            ticker: ticker.to_string(),
            source,
        };
        let Some((series, files)) = self.load(ticker).map_err(store_err)? else {
            return Ok(Outcome::NoData);
        };

        let adjusted = adjust_prices(&series, &self.config.adjust_options());
        tracing::info!(ticker, rows = adjusted.series.len(), partitions = files.len(), "adjusted prices");

        if self.config.persist {
            let files = self.persist(&adjusted.series, &files)?;
            Ok(Outcome::Persisted { files })
        } else {
            Ok(Outcome::InMemory(adjusted))
        }
    }

    pub fn reconstruct_raw_batch(&self, tickers: &[String]) -> BatchReport<RawSeries> {
        self.run_batch(tickers, |t| self.reconstruct_raw(t))
    }

    pub fn adjust_batch(&self, tickers: &[String]) -> BatchReport<AdjustedSeries> {
        self.run_batch(tickers, |t| self.adjust(t))
    }

    /// Run `run` per ticker. A failure is recorded and the batch continues.
    fn run_batch<T, F>(&self, tickers: &[String], run: F) -> BatchReport<T>
    where
        T: Send,
        F: Fn(&str) -> Result<Outcome<T>, PipelineError> + Sync,
    {
        let one = |ticker: &String| {
            let result = run(ticker);
            if let Err(e) = &result {
                tracing::warn!(ticker = ticker.as_str(), error = %e, "ticker failed");
            }
            TickerOutcome {
                ticker: ticker.clone(),
                result,
            }
        };

        let outcomes: Vec<TickerOutcome<T>> = if self.config.parallel {
            tickers.par_iter().map(one).collect()
        } else {
            tickers.iter().map(one).collect()
        };

        let report = BatchReport { outcomes };
        tracing::info!(
            total = report.total(),
            succeeded = report.succeeded(),
            no_data = report.no_data(),
            failed = report.failed(),
            "batch complete"
        );
        report
    }
}
