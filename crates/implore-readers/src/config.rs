//! Reader configuration
//!
//! Loaded from TOML with the following structure:
//!
//! ```toml
//! [discover]
//! rows = 10
//!
//! [retry]
//! max_tries = 10
//! ```
//!
//! `IMPLORE_DISCOVER_ROWS` and `IMPLORE_RETRY_MAX_TRIES` override the file.
//! The installed configuration supplies defaults for `discover()` and for new
//! `Retry` readers.

use std::path::Path;
use std::sync::{OnceLock, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{ReaderError, ReaderResult};

/// Retry budgets below this are raised to it
pub const MIN_RETRY_TRIES: u32 = 2;

pub const DISCOVER_ROWS_ENV: &str = "IMPLORE_DISCOVER_ROWS";
pub const RETRY_MAX_TRIES_ENV: &str = "IMPLORE_RETRY_MAX_TRIES";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverConfig {
    /// Rows materialized by `discover()`
    pub rows: usize,
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        Self { rows: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts a `Retry` reader makes before giving up
    pub max_tries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_tries: 10 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadersConfig {
    pub discover: DiscoverConfig,
    pub retry: RetryConfig,
}

impl ReadersConfig {
    /// Parse from TOML text, then apply environment overrides
    pub fn from_toml_str(text: &str) -> ReaderResult<Self> {
        let config: ReadersConfig =
            toml::from_str(text).map_err(|e| ReaderError::Config(e.to_string()))?;
        config.with_env_overrides()
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> ReaderResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ReaderError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Apply `IMPLORE_*` environment overrides
    pub fn with_env_overrides(mut self) -> ReaderResult<Self> {
        if let Ok(rows) = std::env::var(DISCOVER_ROWS_ENV) {
            self.discover.rows = rows
                .parse()
                .map_err(|_| ReaderError::Config(format!("{}={}", DISCOVER_ROWS_ENV, rows)))?;
        }
        if let Ok(tries) = std::env::var(RETRY_MAX_TRIES_ENV) {
            self.retry.max_tries = tries
                .parse()
                .map_err(|_| ReaderError::Config(format!("{}={}", RETRY_MAX_TRIES_ENV, tries)))?;
        }
        Ok(self)
    }

    /// Retry budget with the lower bound applied
    pub fn retry_max_tries(&self) -> u32 {
        self.retry.max_tries.max(MIN_RETRY_TRIES)
    }

    pub fn discover_rows(&self) -> usize {
        self.discover.rows
    }
}

fn installed() -> &'static RwLock<ReadersConfig> {
    static CONFIG: OnceLock<RwLock<ReadersConfig>> = OnceLock::new();
    CONFIG.get_or_init(|| RwLock::new(ReadersConfig::default()))
}

/// Install a process-wide configuration
pub fn install(config: ReadersConfig) {
    tracing::debug!(?config, "installing readers config");
    *installed().write().unwrap_or_else(|e| e.into_inner()) = config;
}

/// The currently installed configuration
pub fn current() -> ReadersConfig {
    installed().read().unwrap_or_else(|e| e.into_inner()).clone()
}
