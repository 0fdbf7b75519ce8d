//! Date normalization: coerce, shift, snap, offset, deduplicate.
//!
//! Every raw series passes through `DateNormalizer::normalize` before it is
//! merged into its category. The steps, in order:
//! 1. coerce each raw date to a calendar date (unparseable rows are dropped
//!    and reported, never fatal to the series)
//! 2. apply the entry's day-shift exception, if the (source, category) pair
//!    has one
//! 3. snap to the start of the period under the target frequency
//! 4. shift forward by the publication-lag offset in whole months
//! 5. deduplicate on date, keeping the last occurrence in arrival order

use super::provider::{RawDate, RawSeries, Value};
use super::shift::{DayShiftRule, ShiftTable};
use crate::catalog::Frequency;
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use thiserror::Error;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%b %d, %Y", "%d %b %Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// A row whose date could not be turned into a calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date {raw} at row {row}")]
pub struct InvalidDateError {
    pub row: usize,
    pub raw: String,
}

/// A series on the canonical date grid. Dates are unique.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSeries {
    pub header: String,
    pub rows: Vec<(NaiveDate, Option<Value>)>,
}

impl NormalizedSeries {
    pub fn new(header: impl Into<String>, rows: Vec<(NaiveDate, Option<Value>)>) -> Self {
        Self {
            header: header.into(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.iter().map(|(d, _)| *d)
    }

    pub fn value_on(&self, date: NaiveDate) -> Option<&Value> {
        self.rows
            .iter()
            .find(|(d, _)| *d == date)
            .and_then(|(_, v)| v.as_ref())
    }

    /// Whether any row holds text rather than a number.
    pub fn has_text(&self) -> bool {
        self.rows
            .iter()
            .any(|(_, v)| matches!(v, Some(Value::Text(_))))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOutcome {
    pub series: NormalizedSeries,
    pub rejected: Vec<InvalidDateError>,
}

/// Coerce a raw provider date to a calendar date, dropping time of day.
pub fn coerce_date(raw: &RawDate) -> Option<NaiveDate> {
    match raw {
        RawDate::Date(d) => Some(*d),
        RawDate::DateTime(dt) => Some(dt.date()),
        RawDate::Unix(ts) => DateTime::from_timestamp(*ts, 0).map(|dt| dt.date_naive()),
        RawDate::Text(s) => parse_date_text(s),
    }
}

fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(s, "%Y%m%d").ok();
    }
    None
}

/// Start of the period containing `date`.
///
/// Weeks start on Monday; months, quarters and years on the 1st of their
/// first month. Daily periods are the date itself.
pub fn period_start(date: NaiveDate, frequency: Frequency) -> NaiveDate {
    let start = match frequency {
        Frequency::Daily => Some(date),
        Frequency::Weekly => {
            let back = u64::from(date.weekday().num_days_from_monday());
            date.checked_sub_days(Days::new(back))
        }
        Frequency::Monthly => NaiveDate::from_ymd_opt(date.year(), date.month(), 1),
        Frequency::Quarterly => {
            let first_month = (date.month() - 1) / 3 * 3 + 1;
            NaiveDate::from_ymd_opt(date.year(), first_month, 1)
        }
        Frequency::Yearly => NaiveDate::from_ymd_opt(date.year(), 1, 1),
    };
    start.unwrap_or(date)
}

/// Shift by whole calendar months; days past the target month's end clamp
/// to its last day. `None` only when the result leaves chrono's range.
pub fn shift_months(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    if months >= 0 {
        date.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    }
}

/// Normalizer for one catalog entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateNormalizer {
    shift: Option<&'static DayShiftRule>,
}

impl DateNormalizer {
    /// A normalizer with no day-shift exception.
    pub fn new() -> Self {
        Self { shift: None }
    }

    /// A normalizer carrying the exception registered for this pair, if any.
    pub fn for_entry(table: &ShiftTable, source: &str, category: &str) -> Self {
        Self {
            shift: table.rule_for(source, category),
        }
    }

    pub fn shift_rule(&self) -> Option<&'static DayShiftRule> {
        self.shift
    }

    pub fn normalize(
        &self,
        raw: RawSeries,
        frequency: Option<Frequency>,
        offset: Option<i32>,
    ) -> NormalizeOutcome {
        let RawSeries {
            header,
            observations,
        } = raw;

        let mut rejected = Vec::new();
        let mut snapped: Vec<(NaiveDate, Option<Value>)> = Vec::with_capacity(observations.len());

        for (row, obs) in observations.into_iter().enumerate() {
            let Some(date) = self.place(&obs.date, frequency, offset) else {
                rejected.push(InvalidDateError {
                    row,
                    raw: obs.date.to_string(),
                });
                continue;
            };
            snapped.push((date, obs.value));
        }

        NormalizeOutcome {
            series: NormalizedSeries {
                header,
                rows: keep_last(snapped),
            },
            rejected,
        }
    }

    fn place(
        &self,
        raw: &RawDate,
        frequency: Option<Frequency>,
        offset: Option<i32>,
    ) -> Option<NaiveDate> {
        let mut date = coerce_date(raw)?;
        if let Some(rule) = self.shift {
            date = rule.apply(date)?;
        }
        if let Some(freq) = frequency {
            date = period_start(date, freq);
        }
        if let Some(months) = offset {
            date = shift_months(date, months)?;
        }
        Some(date)
    }
}

/// Drop earlier rows that share a date with a later one. Survivors keep the
/// relative order of their (last) occurrences.
fn keep_last(rows: Vec<(NaiveDate, Option<Value>)>) -> Vec<(NaiveDate, Option<Value>)> {
    let mut seen = HashSet::with_capacity(rows.len());
    let mut kept: Vec<_> = rows
        .into_iter()
        .rev()
        .filter(|(date, _)| seen.insert(*date))
        .collect();
    kept.reverse();
    kept
}
