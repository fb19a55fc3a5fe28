//! Partitioned parquet store: layout, I/O and re-partitioning.

pub mod error;
pub mod frame;
pub mod layout;
pub mod parquet;
pub mod partition;

pub use error::StoreError;
pub use layout::{InvalidYearRange, PartitionFile, PartitionLayout, YearRange};
pub use parquet::{load_series, read_partition, write_frame};
pub use partition::{split_by_month, write_discovered, write_series};
