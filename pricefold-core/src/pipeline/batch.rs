//! Per-ticker outcomes and batch summaries.

use super::PipelineError;
use std::path::PathBuf;

/// What a single-ticker run produced.
#[derive(Debug)]
pub enum Outcome<T> {
    /// No partitions were found in the year range; nothing was read or written.
    NoData,
    /// The result was written; these are the files.
    Persisted { files: Vec<PathBuf> },
    /// The result, returned instead of written.
    InMemory(T),
}

impl<T> Outcome<T> {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Outcome::NoData)
    }

    /// The in-memory result, if this run returned one.
    pub fn into_series(self) -> Option<T> {
        match self {
            Outcome::InMemory(series) => Some(series),
            _ => None,
        }
    }

    /// Files written by this run (empty unless persisted).
    pub fn written_files(&self) -> &[PathBuf] {
        match self {
            Outcome::Persisted { files } => files,
            _ => &[],
        }
    }
}

/// Result for one ticker of a batch.
#[derive(Debug)]
pub struct TickerOutcome<T> {
    pub ticker: String,
    pub result: Result<Outcome<T>, PipelineError>,
}

/// Results of a batch run, one entry per input ticker in input order.
///
/// Tickers without data keep their slot as `Outcome::NoData`; failures keep
/// theirs as `Err`. Earlier writes are never rolled back.
#[derive(Debug)]
pub struct BatchReport<T> {
    pub outcomes: Vec<TickerOutcome<T>>,
}

impl<T> BatchReport<T> {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, Ok(ref out) if !out.is_no_data()))
            .count()
    }

    pub fn no_data(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, Ok(Outcome::NoData)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }

    /// Failing tickers with their errors.
    pub fn errors(&self) -> impl Iterator<Item = (&str, &PipelineError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.ticker.as_str(), e)))
    }

    /// In-memory results aligned with the input tickers; `None` marks a ticker
    /// that had no data, failed, or was persisted.
    pub fn into_series(self) -> Vec<Option<T>> {
        self.outcomes
            .into_iter()
            .map(|o| o.result.ok().and_then(Outcome::into_series))
            .collect()
    }
}
