//! SEC identifier listings (e.g. the EDGAR ticker/CIK file).
//!
//! The ticker is the URL of a plain-text listing. Each non-empty line
//! becomes a text observation dated on the fetch day; the listing is a
//! snapshot, not a time series.

use crate::data::http::HttpFetcher;
use crate::data::provider::{RawSeries, SourceCapability, SourceError, Value};
use chrono::NaiveDate;

pub struct SecSource {
    fetcher: HttpFetcher,
    anchor: Option<NaiveDate>,
}

impl SecSource {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self {
            fetcher,
            anchor: None,
        }
    }

    pub fn anchored_at(mut self, date: NaiveDate) -> Self {
        self.anchor = Some(date);
        self
    }

    fn today(&self) -> NaiveDate {
        self.anchor
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

fn parse_listing(body: &str, header: &str, date: NaiveDate) -> Result<RawSeries, SourceError> {
    if body.trim_start().starts_with('<') {
        return Err(SourceError::ResponseFormatChanged(
            "expected a plain-text listing, received HTML".into(),
        ));
    }
    let mut series = RawSeries::new(header);
    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        series.push(date, Some(Value::Text(line.to_string())));
    }
    Ok(series)
}

impl SourceCapability for SecSource {
    fn name(&self) -> &str {
        "sec"
    }

    fn fetch(&self, ticker: &str, header: &str) -> Result<RawSeries, SourceError> {
        let body = self.fetcher.get_text(ticker.trim())?;
        parse_listing(&body, header, self.today())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::RawDate;

    #[test]
    fn every_line_is_a_text_row_on_the_fetch_day() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 16).unwrap();
        let series = parse_listing("aapl\t320193\n\nmsft\t789019\n", "CIK", day).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.observations[0].date, RawDate::Date(day));
        assert_eq!(
            series.observations[1].value,
            Some(Value::Text("msft\t789019".into()))
        );
    }

    #[test]
    fn html_is_rejected() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 16).unwrap();
        assert!(parse_listing("<html>blocked</html>", "CIK", day).is_err());
    }
}
