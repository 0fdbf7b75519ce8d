//! CFTC Commitments of Traders CSV files.

use super::parse_date_value_csv;
use crate::data::http::HttpFetcher;
use crate::data::provider::{RawSeries, SourceCapability, SourceError};

pub struct CftcSource {
    fetcher: HttpFetcher,
    base_url: String,
}

impl CftcSource {
    pub fn new(fetcher: HttpFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    fn report_url(&self, ticker: &str) -> String {
        format!("{}/{}.csv", self.base_url.trim_end_matches('/'), ticker.trim())
    }
}

impl SourceCapability for CftcSource {
    fn name(&self) -> &str {
        "cftc"
    }

    fn fetch(&self, ticker: &str, header: &str) -> Result<RawSeries, SourceError> {
        let body = self
            .fetcher
            .get_text(&self.report_url(ticker))
            .map_err(|e| match e {
                SourceError::NotFound { .. } => SourceError::TickerNotFound {
                    ticker: ticker.to_string(),
                },
                other => other,
            })?;
        parse_date_value_csv(&body, header)
    }
}
