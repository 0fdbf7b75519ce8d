//! Run context: everything a pass needs, built once per process.

use crate::catalog_loader::{CatalogProvider, CatalogSource};
use crate::config::FeedConfig;
use crate::publish::{DirectoryPublisher, Publisher};
use macrofeed_core::data::{CircuitBreaker, ShiftTable, SortPolicy, SourceRegistry};
use std::sync::Arc;
use std::time::Duration;

/// Explicit collaborators for the scheduler. Nothing in the pipeline reads
/// process-global state; swap any field to redirect it (tests use in-memory
/// catalogs, sources and publishers).
pub struct RunContext {
    pub config: FeedConfig,
    pub registry: SourceRegistry,
    pub shifts: ShiftTable,
    pub sort_policy: SortPolicy,
    pub catalog: Box<dyn CatalogProvider>,
    pub publisher: Box<dyn Publisher>,
}

impl RunContext {
    /// The production wiring: standard sources sharing one circuit breaker,
    /// the configured catalog location, and a directory publisher.
    pub fn from_config(config: FeedConfig) -> Self {
        let breaker = Arc::new(CircuitBreaker::default_provider());
        let registry = SourceRegistry::standard(config.sources.clone(), breaker);
        let catalog = CatalogSource::new(
            &config.catalog,
            Duration::from_secs(config.sources.http_timeout_secs),
            config.sources.user_agent.clone(),
        );
        let publisher = DirectoryPublisher::new(config.output_dir.clone(), config.format);
        let sort_policy = config.sort_policy();

        Self {
            config,
            registry,
            shifts: ShiftTable::standard(),
            sort_policy,
            catalog: Box::new(catalog),
            publisher: Box::new(publisher),
        }
    }

    pub fn with_registry(mut self, registry: SourceRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_catalog(mut self, catalog: impl CatalogProvider + 'static) -> Self {
        self.catalog = Box::new(catalog);
        self
    }

    pub fn with_publisher(mut self, publisher: impl Publisher + 'static) -> Self {
        self.publisher = Box::new(publisher);
        self
    }

    pub fn with_shifts(mut self, shifts: ShiftTable) -> Self {
        self.shifts = shifts;
        self
    }
}
