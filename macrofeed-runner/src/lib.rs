//! Macrofeed Runner: configuration, passes, publishing, scheduling.
//!
//! This crate builds on `macrofeed-core` to provide:
//! - TOML configuration with validation
//! - Catalog loading from a URL or a local file, fresh every pass
//! - Pass execution with per-entry failure isolation and optional rayon fan-out
//! - Batch publishing to a directory (CSV or JSON) with a staging swap
//! - The pass / idle scheduler with seeded jitter

pub mod catalog_loader;
pub mod config;
pub mod context;
pub mod pass;
pub mod publish;
pub mod scheduler;

pub use catalog_loader::{CatalogLoadError, CatalogLocation, CatalogProvider, CatalogSource};
pub use config::{ConfigError, FeedConfig, OutputFormat, MAX_RETRIES};
pub use context::RunContext;
pub use pass::{
    acquire_entry, build_category, run_pass, CategoryReport, CategoryStatus, EntryError,
    EntryFailure, PassOutcome, PassReport, PublishStatus,
};
pub use publish::{DirectoryPublisher, PublishBatch, PublishError, Publisher};
pub use scheduler::{JitterPolicy, Scheduler, SchedulerState, Sleeper, ThreadSleeper};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn run_context_is_send_sync() {
        assert_send::<RunContext>();
        assert_sync::<RunContext>();
    }

    #[test]
    fn reports_are_send_sync() {
        assert_send::<PassReport>();
        assert_sync::<PassReport>();
        assert_send::<PublishBatch>();
        assert_sync::<PublishBatch>();
        assert_send::<EntryError>();
        assert_sync::<EntryError>();
    }
}
