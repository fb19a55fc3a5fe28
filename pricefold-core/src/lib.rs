//! Pricefold Core — split/dividend price adjustment over a monthly parquet store.
//!
//! This crate contains:
//! - Domain types (price records, per-ticker series, price fields)
//! - The schema contract every partition file is conformed to on read
//! - The `{year}/{month}/{ticker}.parquet` layout and its resolver
//! - Raw price reconstruction (undoing split adjustment)
//! - Split and dividend adjustment with the derived factor columns
//! - Pipeline orchestration for single tickers and batches
//! - CSV import and open-data source helpers

pub mod domain;
pub mod ingest;
pub mod pipeline;
pub mod schema;
pub mod sources;
pub mod storage;
pub mod transform;
pub mod validate;

pub use domain::{PriceField, PriceRecord, TickerSeries, YearMonth};
pub use pipeline::{BatchReport, Outcome, Pipeline, PipelineConfig, PipelineError};
pub use schema::SchemaContract;
pub use storage::{PartitionLayout, StoreError, YearRange};
