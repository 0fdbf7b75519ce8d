//! Day-shift exceptions applied before period snapping.
//!
//! Some survey indices are released on a date that snaps into the wrong
//! period. Those corrections are domain knowledge, so they live in this
//! explicit table keyed by (source, category) instead of in the normalizer.

use chrono::{Datelike, Duration, NaiveDate};

/// When a rule fires, relative to the day of month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayCondition {
    After(u32),
    Before(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayShiftRule {
    pub source: &'static str,
    pub categories: &'static [&'static str],
    pub condition: DayCondition,
    pub shift_days: i64,
}

impl DayShiftRule {
    pub fn matches(&self, source: &str, category: &str) -> bool {
        self.source == source && self.categories.iter().any(|c| *c == category)
    }

    /// `None` when the shifted date leaves chrono's range.
    pub fn apply(&self, date: NaiveDate) -> Option<NaiveDate> {
        let fires = match self.condition {
            DayCondition::After(day) => date.day() > day,
            DayCondition::Before(day) => date.day() < day,
        };
        if fires {
            date.checked_add_signed(Duration::days(self.shift_days))
        } else {
            Some(date)
        }
    }
}

pub const STANDARD_RULES: &[DayShiftRule] = &[
    DayShiftRule {
        source: "investing",
        categories: &["USA_PMI", "USA_NMI", "WORLD_PMI", "WORLD_NMI"],
        condition: DayCondition::After(15),
        shift_days: 15,
    },
    DayShiftRule {
        source: "investing",
        categories: &["EUROPE_ESI"],
        condition: DayCondition::Before(15),
        shift_days: -15,
    },
    DayShiftRule {
        source: "investing",
        categories: &["USA_UMCSI"],
        condition: DayCondition::Before(15),
        shift_days: -15,
    },
];

/// Lookup table of day-shift rules.
#[derive(Debug, Clone, Copy)]
pub struct ShiftTable {
    rules: &'static [DayShiftRule],
}

impl ShiftTable {
    pub const fn new(rules: &'static [DayShiftRule]) -> Self {
        Self { rules }
    }

    pub const fn standard() -> Self {
        Self::new(STANDARD_RULES)
    }

    /// A table with no exceptions.
    pub const fn empty() -> Self {
        Self::new(&[])
    }

    pub fn rule_for(&self, source: &str, category: &str) -> Option<&'static DayShiftRule> {
        self.rules.iter().find(|r| r.matches(source, category))
    }

    pub fn rules(&self) -> &'static [DayShiftRule] {
        self.rules
    }
}

impl Default for ShiftTable {
    fn default() -> Self {
        Self::standard()
    }
}
