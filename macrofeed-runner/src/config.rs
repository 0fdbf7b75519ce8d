//! Feed configuration, loaded from TOML.

use macrofeed_core::data::{SortPolicy, SourceSettings, DEFAULT_ASCENDING_CATEGORY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Largest accepted `sources.max_retries`.
pub const MAX_RETRIES: u32 = 10;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("catalog location is empty")]
    EmptyCatalog,

    #[error("jitter_secs ({jitter}) must not exceed interval_secs ({interval})")]
    JitterExceedsInterval { jitter: u64, interval: u64 },

    #[error("{field} must contain the {{ticker}} placeholder")]
    MissingPlaceholder { field: &'static str },

    #[error("sources.max_retries ({0}) must not exceed {max}", max = MAX_RETRIES)]
    TooManyRetries(u32),
}

/// On-disk format of published tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

/// Complete feed configuration. Every field has a default, so an empty
/// file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    // ── Catalog ──
    /// `http(s)://` URL or local path of the JSON catalog.
    pub catalog: String,

    // ── Output ──
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    /// Categories published oldest-first; all others are newest-first.
    pub ascending_categories: Vec<String>,

    // ── Schedule ──
    pub interval_secs: u64,
    pub jitter_secs: u64,
    /// Stop after this many passes; 0 runs forever.
    pub max_passes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    // ── Acquisition ──
    pub parallel_acquisition: bool,
    pub sources: SourceSettings,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            catalog: "tickers.json".into(),
            output_dir: PathBuf::from("data"),
            format: OutputFormat::Csv,
            ascending_categories: vec![DEFAULT_ASCENDING_CATEGORY.into()],
            interval_secs: 6 * 60 * 60,
            jitter_secs: 15 * 60,
            max_passes: 0,
            seed: None,
            parallel_acquisition: false,
            sources: SourceSettings::default(),
        }
    }
}

impl FeedConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.trim().is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        if self.jitter_secs > self.interval_secs {
            return Err(ConfigError::JitterExceedsInterval {
                jitter: self.jitter_secs,
                interval: self.interval_secs,
            });
        }
        if self.sources.max_retries > MAX_RETRIES {
            return Err(ConfigError::TooManyRetries(self.sources.max_retries));
        }
        if let Some(field) = self.sources.invalid_templates().into_iter().next() {
            return Err(ConfigError::MissingPlaceholder { field });
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn max_passes(&self) -> Option<u64> {
        (self.max_passes > 0).then_some(self.max_passes)
    }

    pub fn sort_policy(&self) -> SortPolicy {
        SortPolicy::new(self.ascending_categories.iter().cloned())
    }

    /// BLAKE3 hash of the effective configuration, logged at startup so
    /// deployments can be told apart.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
