//! Built-in source implementations.
//!
//! Most providers deliver a two-column CSV (date, value); they share
//! `parse_date_value_csv`. Yahoo and SEC have their own formats.

pub mod cftc;
pub mod empty;
pub mod endpoint;
pub mod fred;
pub mod sec;
pub mod yahoo;

pub use cftc::CftcSource;
pub use empty::EmptySource;
pub use endpoint::CsvEndpointSource;
pub use fred::FredSource;
pub use sec::SecSource;
pub use yahoo::YahooSource;

use super::provider::{RawDate, RawSeries, SourceError, Value};

/// Parse a CSV body whose first column is a date and second a value.
///
/// The first line is a header and is ignored. Unparseable values become
/// null; dates are kept as text for the normalizer to coerce.
pub fn parse_date_value_csv(body: &str, header: &str) -> Result<RawSeries, SourceError> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('<') {
        return Err(SourceError::ResponseFormatChanged(
            "expected CSV, received HTML".into(),
        ));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(trimmed.as_bytes());

    let mut series = RawSeries::new(header);
    for record in reader.records() {
        let record = record
            .map_err(|e| SourceError::ResponseFormatChanged(format!("malformed CSV: {e}")))?;
        let Some(date) = record.get(0) else {
            continue;
        };
        if date.is_empty() && record.iter().all(str::is_empty) {
            continue;
        }
        let value = record.get(1).and_then(parse_number).map(Value::Number);
        series.push(RawDate::Text(date.to_string()), value);
    }
    Ok(series)
}

/// Parse a provider-formatted number.
///
/// Accepts thousands separators, a trailing `%` (kept as the plain number)
/// and `K`/`M`/`B` magnitude suffixes. Missing-value markers yield `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || matches!(s, "." | "-" | "--" | "N/A" | "NA" | "n/a" | "null") {
        return None;
    }

    let cleaned: String = s.chars().filter(|c| *c != ',').collect();
    let (digits, scale) = match cleaned.chars().last() {
        Some('%') => (&cleaned[..cleaned.len() - 1], 1.0),
        Some('K') | Some('k') => (&cleaned[..cleaned.len() - 1], 1e3),
        Some('M') => (&cleaned[..cleaned.len() - 1], 1e6),
        Some('B') => (&cleaned[..cleaned.len() - 1], 1e9),
        _ => (cleaned.as_str(), 1.0),
    };

    let n: f64 = digits.trim().parse().ok()?;
    if n.is_finite() {
        Some(n * scale)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fred_style_csv() {
        let body = "observation_date,DGS10\n2024-01-02,3.95\n2024-01-03,.\n2024-01-04,3.99\n";
        let series = parse_date_value_csv(body, "US10Y").unwrap();
        assert_eq!(series.header, "US10Y");
        assert_eq!(series.len(), 3);
        assert_eq!(series.observations[0].date, RawDate::Text("2024-01-02".into()));
        assert_eq!(series.observations[0].value, Some(Value::Number(3.95)));
        assert_eq!(series.observations[1].value, None);
    }

    #[test]
    fn rows_without_value_column_are_null() {
        let body = "date,value\n2024-01-02\n";
        let series = parse_date_value_csv(body, "X").unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.observations[0].value, None);
    }

    #[test]
    fn html_body_is_format_change() {
        let body = "<!DOCTYPE html><html></html>";
        assert!(matches!(
            parse_date_value_csv(body, "X"),
            Err(SourceError::ResponseFormatChanged(_))
        ));
    }

    #[test]
    fn header_only_body_is_empty_series() {
        let series = parse_date_value_csv("date,value\n", "X").unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn number_formats() {
        assert_eq!(parse_number("1,234.5"), Some(1234.5));
        assert_eq!(parse_number("52.3%"), Some(52.3));
        assert_eq!(parse_number("1.5K"), Some(1500.0));
        assert_eq!(parse_number("2M"), Some(2_000_000.0));
        assert_eq!(parse_number("-0.25"), Some(-0.25));
        assert_eq!(parse_number("."), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("NaN"), None);
    }
}
