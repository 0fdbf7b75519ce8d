//! Generic CSV endpoint addressed by a URL template.
//!
//! Providers without a public API (Investing.com, YCharts) are reached
//! through a user-configured export endpoint that serves date/value CSV.

use super::parse_date_value_csv;
use crate::data::http::HttpFetcher;
use crate::data::provider::{RawSeries, SourceCapability, SourceError};
use crate::data::settings::TICKER_PLACEHOLDER;

pub struct CsvEndpointSource {
    name: String,
    template: String,
    fetcher: HttpFetcher,
}

impl CsvEndpointSource {
    /// Fails when the template has no `{ticker}` placeholder.
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        fetcher: HttpFetcher,
    ) -> Result<Self, SourceError> {
        let name = name.into();
        let template = template.into();
        if !template.contains(TICKER_PLACEHOLDER) {
            return Err(SourceError::Misconfigured(format!(
                "{name} URL template must contain {TICKER_PLACEHOLDER}"
            )));
        }
        Ok(Self {
            name,
            template,
            fetcher,
        })
    }

    fn url_for(&self, ticker: &str) -> String {
        self.template.replace(TICKER_PLACEHOLDER, ticker.trim())
    }
}

impl SourceCapability for CsvEndpointSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, ticker: &str, header: &str) -> Result<RawSeries, SourceError> {
        let body = self.fetcher.get_text(&self.url_for(ticker)).map_err(|e| match e {
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

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&SourceSettings::default(), Arc::new(CircuitBreaker::default())).unwrap()
    }

    #[test]
    fn substitutes_ticker() {
        let source = CsvEndpointSource::new(
            "investing",
            "https://mirror.example.com/investing/{ticker}.csv",
            fetcher(),
        )
        .unwrap();
        assert_eq!(
            source.url_for("ism-manufacturing-pmi"),
            "https://mirror.example.com/investing/ism-manufacturing-pmi.csv"
        );
        assert_eq!(source.name(), "investing");
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let result = CsvEndpointSource::new("ycharts", "https://example.com/data.csv", fetcher());
        assert!(matches!(result, Err(SourceError::Misconfigured(_))));
    }
}
