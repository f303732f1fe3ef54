//! Loading the persisted table from a file or a published CSV URL.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use tracing::{debug, info, warn};

use crate::domain::ObservationTable;
use crate::error::TableError;
use crate::io::table::{read_table, read_table_file};

/// Default bound on a remote fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the table lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Url(Url),
}

impl DataSource {
    /// `http(s)://...` is treated as a URL, anything else as a local path.
    pub fn parse(raw: &str) -> Result<Self, TableError> {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let url = Url::parse(trimmed)
                .map_err(|e| TableError::load_failure(trimmed, format!("Invalid URL: {e}")))?;
            return Ok(DataSource::Url(url));
        }
        Ok(DataSource::File(PathBuf::from(trimmed)))
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Url(url) => write!(f, "{url}"),
        }
    }
}

/// Anything that can produce a fresh copy of the table.
pub trait TableLoader {
    fn load(&self) -> Result<ObservationTable, TableError>;
}

/// Loads a table from a `DataSource`.
pub struct Loader {
    source: DataSource,
    timeout: Duration,
}

impl Loader {
    pub fn new(source: DataSource, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    fn fetch_url(&self, url: &Url) -> Result<ObservationTable, TableError> {
        let origin = url.to_string();
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| TableError::load_failure(&origin, format!("HTTP client error: {e}")))?;

        let resp = client
            .get(url.clone())
            .send()
            .map_err(|e| TableError::load_failure(&origin, format!("Request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(TableError::load_failure(
                &origin,
                format!("Request failed with status {}.", resp.status()),
            ));
        }

        let body = resp
            .text()
            .map_err(|e| TableError::load_failure(&origin, format!("Failed to read response body: {e}")))?;
        if body.trim().is_empty() {
            return Err(TableError::load_failure(&origin, "Empty response body."));
        }

        read_table(body.as_bytes(), &origin)
    }
}

impl TableLoader for Loader {
    fn load(&self) -> Result<ObservationTable, TableError> {
        debug!(source = %self.source, "loading rate table");
        let table = match &self.source {
            DataSource::File(path) => read_table_file(path)?,
            DataSource::Url(url) => self.fetch_url(url)?,
        };

        let dups = table.duplicate_dates();
        if !dups.is_empty() {
            warn!(source = %self.source, count = dups.len(), first = %dups[0], "rate table has duplicate dates");
        }
        info!(source = %self.source, rows = table.len(), series = table.series().len(), "loaded rate table");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_distinguishes_urls_and_paths() {
        let url = DataSource::parse("https://example.com/pub?output=csv").unwrap();
        assert!(matches!(url, DataSource::Url(_)));

        let path = DataSource::parse(" data/rates.csv ").unwrap();
        assert_eq!(path, DataSource::File(PathBuf::from("data/rates.csv")));
    }

    #[test]
    fn invalid_url_is_a_load_failure() {
        let err = DataSource::parse("http://").unwrap_err();
        assert!(matches!(err, TableError::LoadFailure { .. }));
    }

    #[test]
    fn loads_local_file() {
        let path = std::env::temp_dir().join(format!("rate_watch_load_{}.csv", std::process::id()));
        std::fs::write(&path, "Date,BOJ\n2024-01-01,0.5\n2024-01-01,0.6\n").unwrap();
        let loader = Loader::new(DataSource::File(path.clone()), DEFAULT_FETCH_TIMEOUT);
        let table = loader.load().unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(table.len(), 2);
        assert_eq!(loader.source().to_string(), path.display().to_string());
    }
}
