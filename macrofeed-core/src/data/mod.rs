//! Acquisition and alignment: sources, registry, normalizer, merger.

pub mod circuit_breaker;
pub mod http;
pub mod merge;
pub mod normalize;
pub mod provider;
pub mod registry;
pub mod settings;
pub mod shift;
pub mod sources;
pub mod table;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use http::HttpFetcher;
pub use merge::{CategoryMerger, MergeError, SortPolicy, DEFAULT_ASCENDING_CATEGORY};
pub use normalize::{DateNormalizer, InvalidDateError, NormalizeOutcome, NormalizedSeries};
pub use provider::{RawDate, RawObservation, RawSeries, SourceCapability, SourceError, Value};
pub use registry::{RegistryError, SourceFactory, SourceRegistry, STANDARD_SOURCES};
pub use settings::SourceSettings;
pub use shift::{DayCondition, DayShiftRule, ShiftTable};
pub use table::{CategoryTable, SortOrder, TableColumn, DATE_COLUMN};
