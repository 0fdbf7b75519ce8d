//! Category merger: full outer join of normalized series on `date`.
//!
//! Series are folded in catalog column order, not arrival order, and the
//! result is sorted by date under the category's fixed policy. Given the same
//! set of inputs the output table is identical whatever order they came in.

use super::normalize::NormalizedSeries;
use super::provider::Value;
use super::table::{CategoryTable, SortOrder, TableColumn, DATE_COLUMN};
use crate::catalog::Category;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;
use tracing::debug;

/// Category sorted oldest-first when no policy is configured.
pub const DEFAULT_ASCENDING_CATEGORY: &str = "SEC_CIK";

/// 1970-01-01 counted from 0001-01-01 (CE day 1).
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("header '{0}' collides with the date column")]
    ReservedHeader(String),

    #[error("header '{0}' appears more than once in the category")]
    DuplicateHeader(String),

    #[error("series '{header}' has more than one row for {date}")]
    DuplicateDate { header: String, date: NaiveDate },

    #[error("merged table has a row without a date")]
    MissingDate,

    #[error("dataframe error: {0}")]
    Frame(#[from] PolarsError),
}

/// Which categories sort ascending; everything else sorts descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortPolicy {
    ascending: BTreeSet<String>,
}

impl SortPolicy {
    pub fn new<I, S>(ascending: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ascending: ascending.into_iter().map(Into::into).collect(),
        }
    }

    pub fn order_for(&self, category: &str) -> SortOrder {
        if self.ascending.contains(category) {
            SortOrder::Ascending
        } else {
            SortOrder::Descending
        }
    }
}

impl Default for SortPolicy {
    fn default() -> Self {
        Self::new([DEFAULT_ASCENDING_CATEGORY])
    }
}

#[derive(Debug, Clone)]
pub struct CategoryMerger {
    name: String,
    columns: Vec<String>,
    order: SortOrder,
}

impl CategoryMerger {
    /// `columns` fixes the output column order; headers not listed go last,
    /// alphabetically.
    pub fn new(name: impl Into<String>, columns: Vec<String>, order: SortOrder) -> Self {
        Self {
            name: name.into(),
            columns,
            order,
        }
    }

    pub fn for_category(category: &Category, policy: &SortPolicy) -> Self {
        Self::new(
            category.name.clone(),
            category.headers().into_iter().map(str::to_string).collect(),
            policy.order_for(&category.name),
        )
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// Merge into one table. `Ok(None)` means the category has nothing to
    /// publish: no series at all, or no rows across all of them.
    pub fn merge(
        &self,
        mut series: Vec<NormalizedSeries>,
    ) -> Result<Option<CategoryTable>, MergeError> {
        if series.is_empty() {
            return Ok(None);
        }
        self.validate(&series)?;

        series.sort_by(|a, b| {
            self.rank(&a.header)
                .cmp(&self.rank(&b.header))
                .then_with(|| a.header.cmp(&b.header))
        });
        let headers: Vec<String> = series.iter().map(|s| s.header.clone()).collect();

        let mut frames = series.iter().map(series_frame);
        let mut joined = match frames.next() {
            Some(first) => first?,
            None => return Ok(None),
        };
        for frame in frames {
            joined = joined.join(
                frame?,
                [col(DATE_COLUMN)],
                [col(DATE_COLUMN)],
                JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
            );
        }

        let df = joined
            .sort(
                [DATE_COLUMN],
                SortMultipleOptions::default()
                    .with_order_descending(self.order.is_descending())
                    .with_maintain_order(true),
            )
            .collect()?;

        if df.height() == 0 {
            return Ok(None);
        }

        let table = extract_table(&self.name, self.order, &df, &headers)?;
        debug!(
            category = %self.name,
            rows = table.height(),
            columns = table.width(),
            "merged category"
        );
        Ok(Some(table))
    }

    fn rank(&self, header: &str) -> usize {
        self.columns
            .iter()
            .position(|c| c == header)
            .unwrap_or(usize::MAX)
    }

    fn validate(&self, series: &[NormalizedSeries]) -> Result<(), MergeError> {
        let mut seen = HashSet::new();
        for s in series {
            if s.header == DATE_COLUMN {
                return Err(MergeError::ReservedHeader(s.header.clone()));
            }
            if !seen.insert(s.header.as_str()) {
                return Err(MergeError::DuplicateHeader(s.header.clone()));
            }
            let mut dates = HashSet::with_capacity(s.len());
            for date in s.dates() {
                if !dates.insert(date) {
                    return Err(MergeError::DuplicateDate {
                        header: s.header.clone(),
                        date,
                    });
                }
            }
        }
        Ok(())
    }
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

fn date_from_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(EPOCH_DAYS_FROM_CE)?)
}

/// Two-column (date, header) frame. Series holding any text become a string
/// column; otherwise the column is Float64.
fn series_frame(series: &NormalizedSeries) -> Result<LazyFrame, MergeError> {
    let days: Vec<i32> = series.dates().map(days_since_epoch).collect();
    let dates = Series::new(DATE_COLUMN.into(), days).cast(&DataType::Date)?;

    let values = if series.has_text() {
        let cells: Vec<Option<String>> = series
            .rows
            .iter()
            .map(|(_, v)| v.as_ref().map(|v| v.to_string()))
            .collect();
        Series::new(series.header.as_str().into(), cells)
    } else {
        let cells: Vec<Option<f64>> = series
            .rows
            .iter()
            .map(|(_, v)| v.as_ref().and_then(Value::as_number))
            .collect();
        Series::new(series.header.as_str().into(), cells)
    };

    let df = DataFrame::new(vec![dates.into(), values.into()])?;
    Ok(df.lazy())
}

fn extract_table(
    name: &str,
    order: SortOrder,
    df: &DataFrame,
    headers: &[String],
) -> Result<CategoryTable, MergeError> {
    let days = df
        .column(DATE_COLUMN)?
        .as_materialized_series()
        .cast(&DataType::Int32)?;
    let dates = days
        .i32()?
        .into_iter()
        .map(|d| d.and_then(date_from_days).ok_or(MergeError::MissingDate))
        .collect::<Result<Vec<_>, _>>()?;

    let mut columns = Vec::with_capacity(headers.len());
    for header in headers {
        let series = df.column(header)?.as_materialized_series();
        columns.push(TableColumn {
            header: header.clone(),
            cells: column_cells(series)?,
        });
    }

    Ok(CategoryTable {
        name: name.to_string(),
        order,
        dates,
        columns,
    })
}

fn column_cells(series: &Series) -> Result<Vec<Option<Value>>, MergeError> {
    if matches!(series.dtype(), DataType::String) {
        let cells = series
            .str()?
            .into_iter()
            .map(|c| c.map(|t| Value::Text(t.to_string())))
            .collect();
        return Ok(cells);
    }
    let numbers = series.cast(&DataType::Float64)?;
    let cells = numbers
        .f64()?
        .into_iter()
        .map(|c| c.map(Value::Number))
        .collect();
    Ok(cells)
}
