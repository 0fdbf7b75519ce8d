//! FRED (Federal Reserve Economic Data) via the public fredgraph CSV export.

use super::parse_date_value_csv;
use crate::data::http::HttpFetcher;
use crate::data::provider::{RawSeries, SourceCapability, SourceError};

pub struct FredSource {
    fetcher: HttpFetcher,
    base_url: String,
}

impl FredSource {
    pub fn new(fetcher: HttpFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    fn series_url(&self, ticker: &str) -> String {
        format!("{}?id={}", self.base_url.trim_end_matches('?'), ticker.trim())
    }
}

impl SourceCapability for FredSource {
    fn name(&self) -> &str {
        "fred"
    }

    fn fetch(&self, ticker: &str, header: &str) -> Result<RawSeries, SourceError> {
        let body = self
            .fetcher
            .get_text(&self.series_url(ticker))
            .map_err(|e| match e {
                SourceError::NotFound { .. } => SourceError::TickerNotFound {
                    ticker: ticker.to_string(),
                },
                other => other,
            })?;
        parse_date_value_csv(&body, header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::circuit_breaker::CircuitBreaker;
    use crate::data::settings::SourceSettings;
    use std::sync::Arc;

    #[test]
    fn builds_fredgraph_url() {
        let settings = SourceSettings::default();
        let fetcher = HttpFetcher::new(&settings, Arc::new(CircuitBreaker::default())).unwrap();
        let source = FredSource::new(fetcher, settings.fred_base_url.clone());
        assert_eq!(
            source.series_url(" DGS10 "),
            "https://fred.stlouisfed.org/graph/fredgraph.csv?id=DGS10"
        );
        assert_eq!(source.name(), "fred");
    }
}
