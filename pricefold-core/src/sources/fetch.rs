//! Fetching raw bytes for source tables.

use super::SourceError;
use std::time::Duration;

/// Anything that can turn a URL into bytes.
///
/// Kept as a trait so the annual-table pipeline can run against fixtures.
pub trait TableFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError>;
}

/// Blocking HTTP fetcher.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl TableFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| SourceError::Http(format!("{url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = resp
            .bytes()
            .map_err(|e| SourceError::Http(format!("{url}: reading body: {e}")))?;
        Ok(bytes.to_vec())
    }
}
