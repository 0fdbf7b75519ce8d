//! One pass over the catalog: acquire, normalize, merge, publish.
//!
//! Failure is contained at the narrowest scope that can absorb it: a bad
//! row is dropped by the normalizer, a failing entry contributes nothing to
//! its category, an empty category is left out of the batch, and only an
//! unloadable catalog abandons the pass.

use crate::catalog_loader::CatalogLoadError;
use crate::context::RunContext;
use crate::publish::PublishBatch;
use macrofeed_core::data::{
    CategoryMerger, CategoryTable, DateNormalizer, NormalizeOutcome, RegistryError, SourceError,
};
use macrofeed_core::{Category, TickerSpec};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Why an entry contributed nothing to its category.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("unsupported source '{0}'")]
    UnsupportedSource(String),

    #[error("source '{name}' unavailable: {reason}")]
    SourceUnavailable { name: String, reason: String },

    #[error("{source_name} failed for '{ticker}': {error}")]
    Acquisition {
        source_name: String,
        ticker: String,
        #[source]
        error: SourceError,
    },

    #[error("{source_name} panicked fetching '{ticker}': {message}")]
    Panicked {
        source_name: String,
        ticker: String,
        message: String,
    },
}

impl From<RegistryError> for EntryError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::Unsupported { name } => EntryError::UnsupportedSource(name),
            RegistryError::Unavailable { name, source } => EntryError::SourceUnavailable {
                name,
                reason: source.to_string(),
            },
        }
    }
}

/// What happened to one category in a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryStatus {
    Built { rows: usize, fingerprint: String },
    /// No entry produced usable rows.
    Empty,
    MergeFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFailure {
    pub header: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryReport {
    pub name: String,
    pub entries: usize,
    pub failures: Vec<EntryFailure>,
    pub rejected_rows: usize,
    pub status: CategoryStatus,
}

impl CategoryReport {
    pub fn is_built(&self) -> bool {
        matches!(self.status, CategoryStatus::Built { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishStatus {
    Published { tables: usize },
    NothingToPublish,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub pass: u64,
    pub categories: Vec<CategoryReport>,
    /// Catalog entries that failed to parse.
    pub skipped_entries: usize,
    pub publish: PublishStatus,
}

impl PassReport {
    pub fn category(&self, name: &str) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn built_categories(&self) -> Vec<&str> {
        self.categories
            .iter()
            .filter(|c| c.is_built())
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn failed_entries(&self) -> usize {
        self.categories.iter().map(|c| c.failures.len()).sum()
    }
}

#[derive(Debug)]
pub enum PassOutcome {
    Completed(PassReport),
    /// The catalog could not be loaded; nothing was acquired or published.
    Abandoned(CatalogLoadError),
}

impl PassOutcome {
    pub fn report(&self) -> Option<&PassReport> {
        match self {
            PassOutcome::Completed(report) => Some(report),
            PassOutcome::Abandoned(_) => None,
        }
    }
}

/// Resolve, fetch and normalize one entry.
///
/// A panicking source is treated exactly like a failing one.
pub fn acquire_entry(
    ctx: &RunContext,
    category: &str,
    entry: &TickerSpec,
) -> Result<NormalizeOutcome, EntryError> {
    let source = ctx.registry.resolve(&entry.source)?;

    let fetched = panic::catch_unwind(AssertUnwindSafe(|| {
        source.fetch(&entry.ticker, &entry.header)
    }));
    let mut raw = match fetched {
        Ok(Ok(raw)) => raw,
        Ok(Err(error)) => {
            return Err(EntryError::Acquisition {
                source_name: entry.source.clone(),
                ticker: entry.ticker.clone(),
                error,
            })
        }
        Err(payload) => {
            return Err(EntryError::Panicked {
                source_name: entry.source.clone(),
                ticker: entry.ticker.clone(),
                message: panic_message(payload.as_ref()),
            })
        }
    };
    raw.header = entry.header.clone();

    let normalizer = DateNormalizer::for_entry(&ctx.shifts, &entry.source, category);
    Ok(normalizer.normalize(raw, entry.frequency, entry.offset))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Acquire every entry of `category` and merge the results.
///
/// Entry results are kept in catalog order whether they were fetched
/// sequentially or on the rayon pool.
pub fn build_category(
    ctx: &RunContext,
    category: &Category,
) -> (CategoryReport, Option<CategoryTable>) {
    let results: Vec<Result<NormalizeOutcome, EntryError>> = if ctx.config.parallel_acquisition {
        category
            .entries
            .par_iter()
            .map(|entry| acquire_entry(ctx, &category.name, entry))
            .collect()
    } else {
        category
            .entries
            .iter()
            .map(|entry| acquire_entry(ctx, &category.name, entry))
            .collect()
    };

    let mut series = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    let mut rejected_rows = 0;

    for (entry, result) in category.entries.iter().zip(results) {
        match result {
            Ok(outcome) => {
                if !outcome.rejected.is_empty() {
                    debug!(
                        category = %category.name,
                        header = %entry.header,
                        rejected = outcome.rejected.len(),
                        first = %outcome.rejected[0],
                        "dropped rows with invalid dates"
                    );
                }
                rejected_rows += outcome.rejected.len();
                series.push(outcome.series);
            }
            Err(e) => {
                warn!(
                    category = %category.name,
                    header = %entry.header,
                    source = %entry.source,
                    error = %e,
                    "entry failed"
                );
                failures.push(EntryFailure {
                    header: entry.header.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    let merger = CategoryMerger::for_category(category, &ctx.sort_policy);
    let (status, table) = match merger.merge(series) {
        Ok(Some(table)) => {
            let fingerprint = table.fingerprint();
            info!(
                category = %category.name,
                rows = table.height(),
                columns = table.width(),
                failed = failures.len(),
                fingerprint = %&fingerprint[..12],
                "category built"
            );
            (
                CategoryStatus::Built {
                    rows: table.height(),
                    fingerprint,
                },
                Some(table),
            )
        }
        Ok(None) => {
            warn!(category = %category.name, "category produced no rows, skipping");
            (CategoryStatus::Empty, None)
        }
        Err(e) => {
            error!(category = %category.name, error = %e, "category merge failed, skipping");
            (CategoryStatus::MergeFailed(e.to_string()), None)
        }
    };

    let report = CategoryReport {
        name: category.name.clone(),
        entries: category.entries.len(),
        failures,
        rejected_rows,
        status,
    };
    (report, table)
}

/// Run one full pass and hand the batch to the publisher.
pub fn run_pass(ctx: &RunContext, pass: u64) -> PassOutcome {
    info!(pass, catalog = %ctx.catalog.location(), "starting pass");

    let catalog = match ctx.catalog.load() {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(pass, error = %e, "catalog load failed, abandoning pass");
            return PassOutcome::Abandoned(e);
        }
    };

    for skipped in &catalog.skipped {
        warn!(
            category = %skipped.category,
            index = skipped.index,
            reason = %skipped.reason,
            "skipping malformed catalog entry"
        );
    }

    let mut categories = Vec::with_capacity(catalog.categories.len());
    let mut tables = Vec::new();
    for category in &catalog.categories {
        let (report, table) = build_category(ctx, category);
        categories.push(report);
        tables.extend(table);
    }

    let batch = PublishBatch::new(tables);
    let publish = if batch.is_empty() {
        warn!(pass, "no category produced a table, nothing to publish");
        PublishStatus::NothingToPublish
    } else {
        match ctx.publisher.publish(&batch) {
            Ok(()) => {
                info!(pass, tables = batch.len(), "published batch");
                PublishStatus::Published {
                    tables: batch.len(),
                }
            }
            Err(e) => {
                error!(pass, error = %e, "publish failed");
                PublishStatus::Failed(e.to_string())
            }
        }
    };

    PassOutcome::Completed(PassReport {
        pass,
        categories,
        skipped_entries: catalog.skipped.len(),
        publish,
    })
}
