//! Macrofeed Core: catalog, sources, date normalization, category merge.
//!
//! This crate holds everything that turns a catalog entry into aligned data:
//! - The indicator catalog (categories of ticker specs)
//! - Source capabilities and the name → factory registry
//! - Date normalization onto a canonical period grid, with the day-shift table
//! - The category merger that outer-joins series into one date-keyed table
//!
//! Scheduling, configuration and publishing live in `macrofeed-runner`.

pub mod catalog;
pub mod data;

pub use catalog::{Catalog, CatalogError, Category, Frequency, SkippedEntry, TickerSpec};
