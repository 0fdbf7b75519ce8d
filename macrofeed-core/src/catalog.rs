//! Indicator catalog: categories of ticker specs.
//!
//! The catalog is a JSON document mapping category names to arrays of
//! ticker specs. Category order is document order (serde_json is built with
//! `preserve_order`), and entry order inside a category is the column order
//! of that category's output table.

use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Target calendar grid for an indicator.
///
/// Deserialized through `FromStr`, so catalog codes are case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Frequency {
    #[serde(rename = "D")]
    Daily,
    #[serde(rename = "W")]
    Weekly,
    #[serde(rename = "M")]
    Monthly,
    #[serde(rename = "Q")]
    Quarterly,
    #[serde(rename = "Y")]
    Yearly,
}

impl Frequency {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Daily => "D",
            Self::Weekly => "W",
            Self::Monthly => "M",
            Self::Quarterly => "Q",
            Self::Yearly => "Y",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Frequency {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "D" => Ok(Self::Daily),
            "W" => Ok(Self::Weekly),
            "M" => Ok(Self::Monthly),
            "Q" => Ok(Self::Quarterly),
            "Y" => Ok(Self::Yearly),
            other => Err(CatalogError::UnknownFrequency(other.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Frequency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        code.parse().map_err(de::Error::custom)
    }
}

/// One indicator to acquire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerSpec {
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Header")]
    pub header: String,
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Frequency", default)]
    pub frequency: Option<Frequency>,
    /// Publication lag in whole months.
    #[serde(rename = "Offset", default)]
    pub offset: Option<i32>,
}

/// A named group of indicators merged into one output table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub entries: Vec<TickerSpec>,
}

impl Category {
    pub fn new(name: impl Into<String>, entries: Vec<TickerSpec>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    /// Column headers in catalog order.
    pub fn headers(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.header.as_str()).collect()
    }

    /// Headers that occur more than once in this category.
    pub fn duplicate_headers(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        let mut dupes = BTreeSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.header.as_str()) {
                dupes.insert(entry.header.as_str());
            }
        }
        dupes.into_iter().collect()
    }
}

/// An entry that could not be parsed and was left out of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub category: String,
    pub index: usize,
    pub reason: String,
}

/// The parsed indicator catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub categories: Vec<Category>,
    pub skipped: Vec<SkippedEntry>,
}

impl Catalog {
    pub fn from_categories(categories: Vec<Category>) -> Self {
        Self {
            categories,
            skipped: Vec::new(),
        }
    }

    /// Parse the JSON catalog document.
    ///
    /// The top level must be an object and every category value an array;
    /// anything else rejects the whole document. A single entry that fails
    /// to deserialize is recorded in `skipped` and left out.
    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        let doc: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(content).map_err(|e| CatalogError::Parse(e.to_string()))?;

        let mut categories = Vec::with_capacity(doc.len());
        let mut skipped = Vec::new();

        for (name, value) in doc {
            let serde_json::Value::Array(items) = value else {
                return Err(CatalogError::NotASequence { category: name });
            };

            let mut entries = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                match serde_json::from_value::<TickerSpec>(item) {
                    Ok(spec) => entries.push(spec),
                    Err(e) => skipped.push(SkippedEntry {
                        category: name.clone(),
                        index,
                        reason: e.to_string(),
                    }),
                }
            }
            categories.push(Category { name, entries });
        }

        Ok(Self {
            categories,
            skipped,
        })
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn entry_count(&self) -> usize {
        self.categories.iter().map(|c| c.entries.len()).sum()
    }

    /// Distinct source names referenced by the catalog, sorted.
    pub fn source_names(&self) -> BTreeSet<&str> {
        self.categories
            .iter()
            .flat_map(|c| c.entries.iter().map(|e| e.source.as_str()))
            .collect()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog is not a valid JSON object: {0}")]
    Parse(String),

    #[error("category '{category}' is not an array of ticker specs")]
    NotASequence { category: String },

    #[error("unknown frequency '{0}' (expected D, W, M, Q or Y)")]
    UnknownFrequency(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "USA_RATES": [
            {"Source": "fred", "Header": "US10Y", "Ticker": "DGS10", "Frequency": "D", "Offset": null},
            {"Source": "fred", "Header": "US02Y", "Ticker": "DGS2", "Frequency": null, "Offset": null}
        ],
        "USA_PMI": [
            {"Source": "investing", "Header": "ISM", "Ticker": "ism-manufacturing", "Frequency": "M", "Offset": 1}
        ],
        "SEC_CIK": [
            {"Source": "sec", "Header": "CIK", "Ticker": "https://www.sec.gov/include/ticker.txt"}
        ]
    }"#;

    #[test]
    fn parses_categories_in_document_order() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.category_names(), vec!["USA_RATES", "USA_PMI", "SEC_CIK"]);
        assert_eq!(catalog.entry_count(), 4);
        assert!(catalog.skipped.is_empty());
    }

    #[test]
    fn parses_frequency_and_offset() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        let pmi = &catalog.category("USA_PMI").unwrap().entries[0];
        assert_eq!(pmi.frequency, Some(Frequency::Monthly));
        assert_eq!(pmi.offset, Some(1));

        let us02 = &catalog.category("USA_RATES").unwrap().entries[1];
        assert_eq!(us02.frequency, None);
        assert_eq!(us02.offset, None);
    }

    #[test]
    fn missing_optional_fields_default_to_none() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        let cik = &catalog.category("SEC_CIK").unwrap().entries[0];
        assert_eq!(cik.frequency, None);
        assert_eq!(cik.offset, None);
    }

    #[test]
    fn malformed_entry_is_skipped_not_fatal() {
        let doc = r#"{
            "FX": [
                {"Source": "yfinance", "Header": "EURUSD", "Ticker": "EURUSD=X", "Frequency": "D"},
                {"Source": "yfinance", "Header": "BAD", "Ticker": "X", "Frequency": "H"},
                {"Header": "NOSOURCE", "Ticker": "Y"}
            ]
        }"#;
        let catalog = Catalog::from_json(doc).unwrap();
        assert_eq!(catalog.entry_count(), 1);
        assert_eq!(catalog.skipped.len(), 2);
        assert_eq!(catalog.skipped[0].index, 1);
        assert_eq!(catalog.skipped[1].index, 2);
    }

    #[test]
    fn non_object_document_is_rejected() {
        assert!(matches!(
            Catalog::from_json("[1, 2, 3]"),
            Err(CatalogError::Parse(_))
        ));
        assert!(matches!(
            Catalog::from_json("not json"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn non_array_category_is_rejected() {
        let err = Catalog::from_json(r#"{"X": {"Source": "fred"}}"#).unwrap_err();
        assert_eq!(
            err,
            CatalogError::NotASequence {
                category: "X".into()
            }
        );
    }

    #[test]
    fn frequency_from_str_is_case_insensitive() {
        assert_eq!("w".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert_eq!(" Q ".parse::<Frequency>().unwrap(), Frequency::Quarterly);
        assert!("H".parse::<Frequency>().is_err());
    }

    #[test]
    fn catalog_frequency_codes_are_case_insensitive() {
        let doc = r#"{"X": [
            {"Source": "fred", "Header": "A", "Ticker": "A", "Frequency": "m"},
            {"Source": "fred", "Header": "B", "Ticker": "B", "Frequency": "Q"},
            {"Source": "fred", "Header": "C", "Ticker": "C", "Frequency": "h"}
        ]}"#;
        let catalog = Catalog::from_json(doc).unwrap();
        let entries = &catalog.category("X").unwrap().entries;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].frequency, Some(Frequency::Monthly));
        assert_eq!(entries[1].frequency, Some(Frequency::Quarterly));
        assert_eq!(catalog.skipped.len(), 1);
        assert!(catalog.skipped[0].reason.contains("H"));
    }

    #[test]
    fn duplicate_headers_are_reported() {
        let spec = |h: &str| TickerSpec {
            source: "fred".into(),
            header: h.into(),
            ticker: h.into(),
            frequency: None,
            offset: None,
        };
        let cat = Category::new("X", vec![spec("A"), spec("B"), spec("A")]);
        assert_eq!(cat.duplicate_headers(), vec!["A"]);
        assert_eq!(cat.headers(), vec!["A", "B", "A"]);
    }

    #[test]
    fn source_names_are_distinct() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        let names: Vec<&str> = catalog.source_names().into_iter().collect();
        assert_eq!(names, vec!["fred", "investing", "sec"]);
    }
}
