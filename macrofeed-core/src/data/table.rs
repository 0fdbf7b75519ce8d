//! The merged, date-keyed table for one category.

use super::provider::Value;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the key column in every published table.
pub const DATE_COLUMN: &str = "date";

/// Row order of a published table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest first.
    Ascending,
    /// Newest first.
    Descending,
}

impl SortOrder {
    pub fn is_descending(&self) -> bool {
        matches!(self, SortOrder::Descending)
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => write!(f, "ascending"),
            SortOrder::Descending => write!(f, "descending"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub header: String,
    pub cells: Vec<Option<Value>>,
}

impl TableColumn {
    pub fn non_null(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

/// One row per distinct date; every column has exactly `dates.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTable {
    pub name: String,
    pub order: SortOrder,
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<TableColumn>,
}

impl CategoryTable {
    pub fn height(&self) -> usize {
        self.dates.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.header.as_str()).collect()
    }

    pub fn column(&self, header: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.header == header)
    }

    /// Cell at `(date, header)`; `None` when the row, the column or the value is absent.
    pub fn value(&self, date: NaiveDate, header: &str) -> Option<&Value> {
        let row = self.dates.iter().position(|d| *d == date)?;
        self.column(header)?.cells.get(row)?.as_ref()
    }

    /// The row at position `index` (0 = first row in output order).
    pub fn row(&self, index: usize) -> Option<(NaiveDate, Vec<Option<&Value>>)> {
        let date = *self.dates.get(index)?;
        let cells = self
            .columns
            .iter()
            .map(|c| c.cells.get(index).and_then(Option::as_ref))
            .collect();
        Some((date, cells))
    }

    pub fn rows(&self) -> impl Iterator<Item = (NaiveDate, Vec<Option<&Value>>)> + '_ {
        (0..self.height()).filter_map(move |i| self.row(i))
    }

    /// Date range covered, as (oldest, newest).
    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.dates.iter().min()?;
        let max = self.dates.iter().max()?;
        Some((*min, *max))
    }

    /// BLAKE3 hash over headers and every cell in output order.
    ///
    /// Identical tables hash identically regardless of how they were built.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.name.as_bytes());
        hasher.update(self.order.to_string().as_bytes());
        for header in self.headers() {
            hasher.update(&[0x1f]);
            hasher.update(header.as_bytes());
        }
        for (date, cells) in self.rows() {
            hasher.update(&[0x1e]);
            hasher.update(date.to_string().as_bytes());
            for cell in cells {
                match cell {
                    None => hasher.update(&[0x00]),
                    Some(Value::Number(n)) => hasher.update(&[0x01]).update(&n.to_le_bytes()),
                    Some(Value::Text(s)) => hasher.update(&[0x02]).update(s.as_bytes()),
                };
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample() -> CategoryTable {
        CategoryTable {
            name: "USA_RATES".into(),
            order: SortOrder::Descending,
            dates: vec![d(2024, 3, 1), d(2024, 2, 1)],
            columns: vec![
                TableColumn {
                    header: "US10Y".into(),
                    cells: vec![Some(Value::Number(4.2)), None],
                },
                TableColumn {
                    header: "US2Y".into(),
                    cells: vec![Some(Value::Number(4.6)), Some(Value::Number(4.5))],
                },
            ],
        }
    }

    #[test]
    fn accessors() {
        let table = sample();
        assert_eq!(table.height(), 2);
        assert_eq!(table.width(), 2);
        assert_eq!(table.headers(), vec!["US10Y", "US2Y"]);
        assert_eq!(table.value(d(2024, 2, 1), "US2Y"), Some(&Value::Number(4.5)));
        assert_eq!(table.value(d(2024, 2, 1), "US10Y"), None);
        assert_eq!(table.column("US10Y").unwrap().non_null(), 1);
        assert_eq!(table.span(), Some((d(2024, 2, 1), d(2024, 3, 1))));

        let (date, cells) = table.row(0).unwrap();
        assert_eq!(date, d(2024, 3, 1));
        assert_eq!(cells, vec![Some(&Value::Number(4.2)), Some(&Value::Number(4.6))]);
        assert!(table.row(2).is_none());
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = sample();
        let b = sample();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let mut c = sample();
        c.columns[0].cells[1] = Some(Value::Number(4.1));
        assert_ne!(a.fingerprint(), c.fingerprint());

        let mut e = sample();
        e.order = SortOrder::Ascending;
        assert_ne!(a.fingerprint(), e.fingerprint());
    }

    #[test]
    fn null_and_text_cells_hash_differently() {
        let mut a = sample();
        a.columns[0].cells[1] = Some(Value::Text(String::new()));
        assert_ne!(a.fingerprint(), sample().fingerprint());
    }
}
