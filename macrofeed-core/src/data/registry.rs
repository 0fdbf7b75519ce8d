//! Source registry: a table mapping source names to factories.
//!
//! The source set is small and fixed, so dispatch is a table of factory
//! functions rather than an open type hierarchy. The standard HTTP sources
//! are built on first `resolve` and shared afterwards, so every entry of a
//! source reuses one client and connection pool. Construction failures (bad
//! endpoint, missing credentials, HTTP client setup) surface as
//! `RegistryError::Unavailable` and are retried on the next `resolve`.

use super::circuit_breaker::CircuitBreaker;
use super::http::HttpFetcher;
use super::provider::{SourceCapability, SourceError};
use super::settings::SourceSettings;
use super::sources::{
    CftcSource, CsvEndpointSource, EmptySource, FredSource, SecSource, YahooSource,
};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Builds a source capability on demand.
pub type SourceFactory =
    Arc<dyn Fn() -> Result<Arc<dyn SourceCapability>, SourceError> + Send + Sync>;

/// Names registered by `SourceRegistry::standard`.
pub const STANDARD_SOURCES: &[&str] = &[
    "cftc",
    "empty",
    "fred",
    "investing",
    "sec",
    "ycharts",
    "yfinance",
];

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unsupported source '{name}'")]
    Unsupported { name: String },

    #[error("source '{name}' unavailable: {source}")]
    Unavailable {
        name: String,
        #[source]
        source: SourceError,
    },
}

#[derive(Clone, Default)]
pub struct SourceRegistry {
    factories: BTreeMap<String, SourceFactory>,
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.names())
            .finish()
    }
}

impl SourceRegistry {
    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in providers, sharing one circuit breaker.
    pub fn standard(settings: SourceSettings, breaker: Arc<CircuitBreaker>) -> Self {
        let settings = Arc::new(settings);
        let mut registry = Self::empty();

        registry.register_http(&settings, &breaker, "fred", |s, fetcher| {
            Ok(Arc::new(FredSource::new(fetcher, s.fred_base_url.clone())))
        });
        registry.register_http(&settings, &breaker, "yfinance", |s, fetcher| {
            Ok(Arc::new(YahooSource::new(fetcher, s.yahoo_base_url.clone())))
        });
        registry.register_http(&settings, &breaker, "cftc", |s, fetcher| {
            Ok(Arc::new(CftcSource::new(fetcher, s.cftc_base_url.clone())))
        });
        registry.register_http(&settings, &breaker, "investing", |s, fetcher| {
            let template = s.investing_url_template.clone().ok_or_else(|| {
                SourceError::Misconfigured("investing_url_template is not configured".into())
            })?;
            Ok(Arc::new(CsvEndpointSource::new("investing", template, fetcher)?))
        });
        registry.register_http(&settings, &breaker, "ycharts", |s, fetcher| {
            let template = s.ycharts_url_template.clone().ok_or_else(|| {
                SourceError::Misconfigured("ycharts_url_template is not configured".into())
            })?;
            Ok(Arc::new(CsvEndpointSource::new("ycharts", template, fetcher)?))
        });

        {
            let settings = Arc::clone(&settings);
            let breaker = Arc::clone(&breaker);
            registry.register_cached("sec", move || {
                let agent = settings.sec_user_agent.as_deref().ok_or_else(|| {
                    SourceError::AuthenticationRequired(
                        "SEC requires sec_user_agent with a contact address".into(),
                    )
                })?;
                let fetcher = HttpFetcher::with_user_agent(&settings, Arc::clone(&breaker), agent)?;
                Ok(Arc::new(SecSource::new(fetcher)))
            });
        }

        registry.register("empty", || Ok(Arc::new(EmptySource::new())));

        registry
    }

    fn register_http<F>(
        &mut self,
        settings: &Arc<SourceSettings>,
        breaker: &Arc<CircuitBreaker>,
        name: &str,
        build: F,
    ) where
        F: Fn(&SourceSettings, HttpFetcher) -> Result<Arc<dyn SourceCapability>, SourceError>
            + Send
            + Sync
            + 'static,
    {
        let settings = Arc::clone(settings);
        let breaker = Arc::clone(breaker);
        self.register_cached(name, move || {
            let fetcher = HttpFetcher::new(&settings, Arc::clone(&breaker))?;
            build(&settings, fetcher)
        });
    }

    /// Register a factory whose first successful result is reused by every
    /// later `resolve`. Failures are not cached.
    pub fn register_cached<F>(&mut self, name: &str, build: F) -> &mut Self
    where
        F: Fn() -> Result<Arc<dyn SourceCapability>, SourceError> + Send + Sync + 'static,
    {
        let cell: OnceLock<Arc<dyn SourceCapability>> = OnceLock::new();
        self.register(name, move || {
            if let Some(source) = cell.get() {
                return Ok(Arc::clone(source));
            }
            let built = build()?;
            Ok(Arc::clone(cell.get_or_init(|| built)))
        })
    }

    /// Register (or replace) a factory under `name`.
    pub fn register<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Result<Arc<dyn SourceCapability>, SourceError> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
        self
    }

    /// Register an already-built capability, shared across resolves.
    pub fn register_instance(&mut self, name: &str, source: Arc<dyn SourceCapability>) -> &mut Self {
        self.register(name, move || Ok(Arc::clone(&source)))
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn SourceCapability>, RegistryError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RegistryError::Unsupported {
                name: name.to_string(),
            })?;
        factory().map_err(|source| RegistryError::Unavailable {
            name: name.to_string(),
            source,
        })
    }

    pub fn is_supported(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::RawSeries;

    struct Fixed;

    impl SourceCapability for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch(&self, _ticker: &str, header: &str) -> Result<RawSeries, SourceError> {
            Ok(RawSeries::new(header))
        }
    }

    fn standard() -> SourceRegistry {
        SourceRegistry::standard(SourceSettings::default(), Arc::new(CircuitBreaker::default()))
    }

    #[test]
    fn standard_registry_knows_the_fixed_set() {
        assert_eq!(standard().names(), STANDARD_SOURCES.to_vec());
    }

    #[test]
    fn unknown_name_is_unsupported() {
        match standard().resolve("bloomberg") {
            Err(RegistryError::Unsupported { name }) => assert_eq!(name, "bloomberg"),
            other => panic!("expected Unsupported, got {:?}", other.map(|s| s.name().to_string())),
        }
        assert!(!standard().is_supported("bloomberg"));
    }

    #[test]
    fn resolves_http_sources_without_network() {
        let registry = standard();
        assert_eq!(registry.resolve("fred").unwrap().name(), "fred");
        assert_eq!(registry.resolve("yfinance").unwrap().name(), "yfinance");
        assert_eq!(registry.resolve("cftc").unwrap().name(), "cftc");
        assert_eq!(registry.resolve("empty").unwrap().name(), "empty");
    }

    #[test]
    fn http_sources_are_built_once_and_shared() {
        let registry = standard();
        for name in ["fred", "yfinance", "cftc"] {
            let first = registry.resolve(name).unwrap();
            let second = registry.resolve(name).unwrap();
            assert!(Arc::ptr_eq(&first, &second), "{name} was rebuilt");
        }
    }

    #[test]
    fn cached_factory_retries_after_failure() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let mut registry = SourceRegistry::empty();
        registry.register_cached("flaky", move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(SourceError::Misconfigured("not yet".into()))
            } else {
                Ok(Arc::new(Fixed))
            }
        });

        assert!(matches!(
            registry.resolve("flaky"),
            Err(RegistryError::Unavailable { .. })
        ));
        let a = registry.resolve("flaky").unwrap();
        let b = registry.resolve("flaky").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unconfigured_endpoints_are_unavailable() {
        let registry = standard();
        for name in ["investing", "ycharts", "sec"] {
            assert!(
                matches!(registry.resolve(name), Err(RegistryError::Unavailable { .. })),
                "{name} should be unavailable without configuration"
            );
        }
    }

    #[test]
    fn configured_endpoints_resolve() {
        let settings = SourceSettings {
            investing_url_template: Some("https://mirror.example.com/{ticker}.csv".into()),
            sec_user_agent: Some("Research contact@example.com".into()),
            ..Default::default()
        };
        let registry = SourceRegistry::standard(settings, Arc::new(CircuitBreaker::default()));
        assert_eq!(registry.resolve("investing").unwrap().name(), "investing");
        assert_eq!(registry.resolve("sec").unwrap().name(), "sec");
    }

    #[test]
    fn custom_registration_and_override() {
        let mut registry = SourceRegistry::empty();
        registry.register_instance("fixed", Arc::new(Fixed));
        assert!(registry.is_supported("fixed"));
        let series = registry.resolve("fixed").unwrap().fetch("T", "H").unwrap();
        assert_eq!(series.header, "H");

        registry.register("fixed", || Err(SourceError::Misconfigured("broken".into())));
        assert!(matches!(
            registry.resolve("fixed"),
            Err(RegistryError::Unavailable { .. })
        ));
    }
}
