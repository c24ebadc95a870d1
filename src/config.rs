//! Configuration layer: typed settings with file -> environment precedence.

use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Error;

const ENV_PREFIX: &str = "TIDECACHE";
const ENV_SEPARATOR: &str = "__";

const DEFAULT_CAPACITY: usize = 200;
const DEFAULT_TTL_SECS: u64 = 60;
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Top-level settings for a host embedding the cache.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
}

impl Settings {
    /// Load settings from an optional TOML file, layered under environment
    /// variables prefixed with `TIDECACHE__` (e.g. `TIDECACHE__CACHE__CAPACITY`).
    pub fn load(config_file: Option<&Path>) -> Result<Self, Error> {
        let mut builder = Config::builder();
        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path));
        }
        builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR))
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|err| Error::configuration(err.to_string()))
    }
}

/// Cache store and middleware settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// When false the middleware forwards every request untouched.
    pub enabled: bool,
    /// Maximum number of cached responses.
    pub capacity: usize,
    /// Fallback TTL when a policy supplies none.
    pub default_ttl_secs: u64,
    /// Responses with bodies larger than this are returned but never stored.
    pub max_body_bytes: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_CAPACITY,
            default_ttl_secs: DEFAULT_TTL_SECS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl CacheSettings {
    /// Returns the capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

/// Logging settings consumed by [`crate::telemetry::init`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default level directive when `RUST_LOG` is unset (e.g. "info", "tidecache=debug").
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Compact,
}
