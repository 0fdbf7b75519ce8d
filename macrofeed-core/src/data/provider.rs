//! Source capability trait and the raw series it returns.
//!
//! A source knows how to turn a ticker into a sequence of (date, value)
//! observations. It does not know about frequencies, offsets or categories;
//! that is the normalizer's job.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A date exactly as the provider delivered it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawDate {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Seconds since the Unix epoch (UTC).
    Unix(i64),
    /// Not yet parsed.
    Text(String),
}

impl From<NaiveDate> for RawDate {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<&str> for RawDate {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl fmt::Display for RawDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => write!(f, "{d}"),
            Self::DateTime(dt) => write!(f, "{dt}"),
            Self::Unix(ts) => write!(f, "@{ts}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// A single indicator value. Identifier-style categories carry text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    pub date: RawDate,
    pub value: Option<Value>,
}

/// Observations for one ticker, in arrival order.
///
/// Dates are not guaranteed unique, sorted, contiguous or parseable.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
    pub header: String,
    pub observations: Vec<RawObservation>,
}

impl RawSeries {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            observations: Vec::new(),
        }
    }

    pub fn push(&mut self, date: impl Into<RawDate>, value: Option<Value>) {
        self.observations.push(RawObservation {
            date: date.into(),
            value,
        });
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Structured errors from sources and their HTTP plumbing.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("ticker not found: {ticker}")]
    TickerNotFound { ticker: String },

    #[error("resource not found: {url}")]
    NotFound { url: String },

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("circuit breaker open for {host}: provider has blocked requests")]
    CircuitBreakerTripped { host: String },

    #[error("source misconfigured: {0}")]
    Misconfigured(String),

    #[error("source error: {0}")]
    Other(String),
}

/// A provider that can fetch one ticker.
///
/// Implementations must be shareable across threads so a pass can acquire
/// entries in parallel.
pub trait SourceCapability: Send + Sync {
    /// Registry name of this source (e.g. `fred`).
    fn name(&self) -> &str;

    /// Fetch all available observations for `ticker`, labelled `header`.
    fn fetch(&self, ticker: &str, header: &str) -> Result<RawSeries, SourceError>;
}
