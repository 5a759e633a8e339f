//! Query engine configuration
//!
//! Loaded from a JSON file. Every field is optional; missing fields take
//! their defaults.
//!
//! ```json
//! {
//!   "resolver_concurrency": 64,
//!   "log_level": "warn",
//!   "indexed_fields": ["age", "address.city"]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::executor::DEFAULT_MAX_IN_FLIGHT;
use crate::observability::{Logger, Severity};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Tunables for `QueryEngine`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Maximum point lookups in flight per query (default 64)
    #[serde(default = "default_resolver_concurrency")]
    pub resolver_concurrency: usize,

    /// Minimum log severity (default "warn")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Fields the reference index engine maintains indexes for
    #[serde(default)]
    pub indexed_fields: Vec<String>,
}

fn default_resolver_concurrency() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            resolver_concurrency: default_resolver_concurrency(),
            log_level: default_log_level(),
            indexed_fields: Vec::new(),
        }
    }
}

impl QueryConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: QueryConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the resolver window
    pub fn with_resolver_concurrency(mut self, resolver_concurrency: usize) -> Self {
        self.resolver_concurrency = resolver_concurrency;
        self
    }

    /// Set the indexed fields
    pub fn with_indexed_fields(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.indexed_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.resolver_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "resolver_concurrency must be > 0".to_string(),
            ));
        }

        self.severity()?;

        if let Some(field) = self.indexed_fields.iter().find(|f| f.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "indexed_fields contains an empty path: '{}'",
                field
            )));
        }

        Ok(())
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> ConfigResult<Severity> {
        Severity::parse(&self.log_level).ok_or_else(|| {
            ConfigError::Invalid(format!("Unknown log_level: '{}'", self.log_level))
        })
    }

    /// Installs `log_level` as the process-wide minimum severity
    pub fn apply_log_level(&self) -> ConfigResult<()> {
        Logger::set_min_severity(self.severity()?);
        Ok(())
    }
}
