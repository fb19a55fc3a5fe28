//! Annual open-data tables: pick one download per year, save as parquet.
//!
//! A listing page links one file per publication; several publications can
//! share a year. The listing is newest first, so the first link seen for a
//! year is the latest update for that year.

use super::fetch::TableFetcher;
use super::SourceError;
use crate::storage::write_frame;
use polars::prelude::*;
use regex::Regex;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Map year → URL, keeping the first URL seen per year.
///
/// The year is the first match of `pattern` in the URL (capture group 1 if
/// the pattern has one), sliced by `year_span`. URLs that do not match, or
/// whose match is shorter than the span, are skipped.
pub fn latest_per_year(
    urls: &[String],
    pattern: &Regex,
    year_span: Range<usize>,
) -> BTreeMap<String, String> {
    let mut latest = BTreeMap::new();
    for url in urls {
        let Some(caps) = pattern.captures(url) else {
            tracing::debug!(url = url.as_str(), "no year match, skipping");
            continue;
        };
        let matched = caps.get(1).or_else(|| caps.get(0)).map_or("", |m| m.as_str());
        let Some(year) = matched.get(year_span.clone()) else {
            tracing::debug!(url = url.as_str(), matched, "match shorter than year span, skipping");
            continue;
        };
        latest
            .entry(year.to_string())
            .or_insert_with(|| url.clone());
    }
    latest
}

/// `href` targets on a listing page that end in `.{extension}`.
pub fn extract_links(html: &str, extension: &str) -> Vec<String> {
    let pattern = format!(r#"href\s*=\s*["']([^"']+\.{})["']"#, regex::escape(extension));
    match Regex::new(&pattern) {
        Ok(re) => re
            .captures_iter(html)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Source of a `{year: url}` mapping.
pub trait AnnualSourceIndex {
    fn annual_sources(&self) -> Result<BTreeMap<String, String>, SourceError>;
}

/// Listing page whose links name the publication year.
pub struct ListingPage<'a> {
    pub url: String,
    pub extension: String,
    pub pattern: Regex,
    pub year_span: Range<usize>,
    pub fetcher: &'a dyn TableFetcher,
}

impl AnnualSourceIndex for ListingPage<'_> {
    fn annual_sources(&self) -> Result<BTreeMap<String, String>, SourceError> {
        let body = self.fetcher.fetch(&self.url)?;
        let html = String::from_utf8_lossy(&body);
        let links = extract_links(&html, &self.extension);
        tracing::debug!(url = self.url.as_str(), links = links.len(), "scanned listing page");
        Ok(latest_per_year(&links, &self.pattern, self.year_span.clone()))
    }
}

/// Download each year's table and save it as `{export_dir}/{year}.parquet`.
///
/// Only CSV tables are parsed; other formats are skipped with a warning.
/// Returns the files written.
pub fn save_annual_tables(
    sources: &BTreeMap<String, String>,
    export_dir: &Path,
    fetcher: &dyn TableFetcher,
) -> Result<Vec<PathBuf>, SourceError> {
    let mut written = Vec::new();

    for (year, url) in sources {
        let format = url.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
        if format != "csv" {
            tracing::warn!(year = year.as_str(), url = url.as_str(), format = format.as_str(), "file format not supported, skipping");
            continue;
        }

        let bytes = fetcher.fetch(url)?;
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .map_err(|e| SourceError::Parse {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let path = export_dir.join(format!("{year}.parquet"));
        write_frame(&df, &path)?;
        tracing::info!(year = year.as_str(), rows = df.height(), path = %path.display(), "saved annual table");
        written.push(path);
    }

    Ok(written)
}
