//! Yahoo Finance daily closes via the v8 chart API.
//!
//! Yahoo has no official API and is subject to unannounced format changes;
//! anything unexpected in the payload surfaces as `ResponseFormatChanged`.

use crate::data::http::HttpFetcher;
use crate::data::provider::{RawDate, RawSeries, SourceCapability, SourceError, Value};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds.
    #[serde(default)]
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
}

pub struct YahooSource {
    fetcher: HttpFetcher,
    base_url: String,
}

impl YahooSource {
    pub fn new(fetcher: HttpFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    fn chart_url(&self, ticker: &str) -> String {
        format!(
            "{}/{}?range=max&interval=1d",
            self.base_url.trim_end_matches('/'),
            ticker.trim()
        )
    }
}

/// Turn a chart payload into close-price observations.
///
/// Days without a close (holidays, halted sessions) are skipped. Timestamps
/// are moved by the exchange's UTC offset so each bar keeps its local
/// trading date.
fn parse_chart(ticker: &str, header: &str, body: &str) -> Result<RawSeries, SourceError> {
    let resp: ChartResponse = serde_json::from_str(body).map_err(|e| {
        SourceError::ResponseFormatChanged(format!("failed to parse chart for {ticker}: {e}"))
    })?;

    let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
        Some(err) if err.code == "Not Found" => SourceError::TickerNotFound {
            ticker: ticker.to_string(),
        },
        Some(err) => SourceError::ResponseFormatChanged(format!("{}: {}", err.code, err.description)),
        None => SourceError::ResponseFormatChanged("empty result with no error".into()),
    })?;

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::ResponseFormatChanged("result array is empty".into()))?;

    let gmtoffset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    // A listed ticker with no history has no timestamp array at all.
    let timestamps = data.timestamp.unwrap_or_default();

    let closes = data
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let mut series = RawSeries::new(header);
    for (i, ts) in timestamps.into_iter().enumerate() {
        if let Some(close) = closes.get(i).copied().flatten() {
            series.push(RawDate::Unix(ts.saturating_add(gmtoffset)), Some(Value::Number(close)));
        }
    }
    Ok(series)
}

impl SourceCapability for YahooSource {
    fn name(&self) -> &str {
        "yfinance"
    }

    fn fetch(&self, ticker: &str, header: &str) -> Result<RawSeries, SourceError> {
        let body = self
            .fetcher
            .get_text(&self.chart_url(ticker))
            .map_err(|e| match e {
                SourceError::NotFound { .. } => SourceError::TickerNotFound {
                    ticker: ticker.to_string(),
                },
                other => other,
            })?;
        parse_chart(ticker, header, &body)
    }
}
