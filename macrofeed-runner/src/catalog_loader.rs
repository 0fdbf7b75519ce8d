//! Catalog loading from a URL or a local file.
//!
//! The catalog is loaded fresh on every pass; nothing is cached between
//! passes because upstream edits must take effect on the next run.

use macrofeed_core::{Catalog, CatalogError};
use reqwest::blocking::Client;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("failed to fetch catalog from {location}: {reason}")]
    Fetch { location: String, reason: String },

    #[error("HTTP {status} fetching catalog from {location}")]
    Http { status: u16, location: String },

    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog: {0}")]
    Invalid(#[from] CatalogError),
}

/// Anything that can produce the catalog for a pass.
pub trait CatalogProvider: Send + Sync {
    fn load(&self) -> Result<Catalog, CatalogLoadError>;

    /// Human-readable location, for logs.
    fn location(&self) -> &str;
}

/// Where the catalog document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogLocation {
    Url(String),
    Path(PathBuf),
}

impl CatalogLocation {
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            CatalogLocation::Url(trimmed.to_string())
        } else {
            CatalogLocation::Path(PathBuf::from(trimmed))
        }
    }
}

/// Loads the JSON catalog from its configured location.
pub struct CatalogSource {
    location: String,
    parsed: CatalogLocation,
    timeout: Duration,
    user_agent: String,
}

impl CatalogSource {
    pub fn new(location: &str, timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            location: location.trim().to_string(),
            parsed: CatalogLocation::parse(location),
            timeout,
            user_agent: user_agent.into(),
        }
    }

    fn fetch_url(&self, url: &str) -> Result<String, CatalogLoadError> {
        let fetch_err = |reason: String| CatalogLoadError::Fetch {
            location: url.to_string(),
            reason,
        };
        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(|e| fetch_err(e.to_string()))?;

        let resp = client.get(url).send().map_err(|e| fetch_err(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CatalogLoadError::Http {
                status: status.as_u16(),
                location: url.to_string(),
            });
        }
        resp.text().map_err(|e| fetch_err(e.to_string()))
    }
}

impl CatalogProvider for CatalogSource {
    fn load(&self) -> Result<Catalog, CatalogLoadError> {
        let content = match &self.parsed {
            CatalogLocation::Url(url) => self.fetch_url(url)?,
            CatalogLocation::Path(path) => {
                std::fs::read_to_string(path).map_err(|source| CatalogLoadError::Read {
                    path: path.clone(),
                    source,
                })?
            }
        };
        Ok(Catalog::from_json(&content)?)
    }

    fn location(&self) -> &str {
        &self.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn source(location: &str) -> CatalogSource {
        CatalogSource::new(location, Duration::from_secs(5), "test")
    }

    #[test]
    fn location_kinds() {
        assert_eq!(
            CatalogLocation::parse("https://example.com/tickers.json"),
            CatalogLocation::Url("https://example.com/tickers.json".into())
        );
        assert_eq!(
            CatalogLocation::parse(" ./tickers.json "),
            CatalogLocation::Path(PathBuf::from("./tickers.json"))
        );
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"USA_RATES": [{{"Source": "fred", "Header": "US10Y", "Ticker": "DGS10"}}]}}"#
        )
        .unwrap();

        let loader = source(file.path().to_str().unwrap());
        let catalog = loader.load().unwrap();
        assert_eq!(catalog.category_names(), vec!["USA_RATES"]);
        assert_eq!(catalog.entry_count(), 1);
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let loader = source(dir.path().join("absent.json").to_str().unwrap());
        assert!(matches!(loader.load(), Err(CatalogLoadError::Read { .. })));
    }

    #[test]
    fn malformed_document_is_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2, 3]").unwrap();
        let loader = source(file.path().to_str().unwrap());
        assert!(matches!(
            loader.load(),
            Err(CatalogLoadError::Invalid(CatalogError::Parse(_)))
        ));
    }
}
