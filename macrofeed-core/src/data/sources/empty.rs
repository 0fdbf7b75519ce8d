//! Placeholder source producing an all-null column.
//!
//! Used for indicators that are planned but have no provider yet, so the
//! column still appears in the category table. The ticker names the grid
//! (`D`, `W`, `M`, `Q`, `Y`; monthly when blank or unknown).

use crate::catalog::Frequency;
use crate::data::normalize::{period_start, shift_months};
use crate::data::provider::{RawSeries, SourceCapability, SourceError};
use chrono::{Days, NaiveDate};

const PERIODS: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct EmptySource {
    anchor: Option<NaiveDate>,
}

impl EmptySource {
    pub fn new() -> Self {
        Self { anchor: None }
    }

    /// Pin "today" for deterministic output.
    pub fn anchored_at(date: NaiveDate) -> Self {
        Self { anchor: Some(date) }
    }

    fn today(&self) -> NaiveDate {
        self.anchor
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

fn step_back(date: NaiveDate, frequency: Frequency) -> Option<NaiveDate> {
    match frequency {
        Frequency::Daily => date.checked_sub_days(Days::new(1)),
        Frequency::Weekly => date.checked_sub_days(Days::new(7)),
        Frequency::Monthly => shift_months(date, -1),
        Frequency::Quarterly => shift_months(date, -3),
        Frequency::Yearly => shift_months(date, -12),
    }
}

impl SourceCapability for EmptySource {
    fn name(&self) -> &str {
        "empty"
    }

    fn fetch(&self, ticker: &str, header: &str) -> Result<RawSeries, SourceError> {
        let frequency = ticker.parse::<Frequency>().unwrap_or(Frequency::Monthly);

        let mut dates = Vec::with_capacity(PERIODS);
        let mut cursor = Some(period_start(self.today(), frequency));
        while let Some(date) = cursor {
            if dates.len() == PERIODS {
                break;
            }
            dates.push(date);
            cursor = step_back(date, frequency);
        }
        dates.reverse();

        let mut series = RawSeries::new(header);
        for date in dates {
            series.push(date, None);
        }
        Ok(series)
    }
}
