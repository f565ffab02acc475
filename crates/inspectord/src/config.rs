//! inspector.toml configuration parser.

use std::path::{Path, PathBuf};
use std::time::Duration;

use inspector_crawler::{CrawlOptions, RollbackPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_INTERVAL: &str = "60s";
pub const DEFAULT_CALL_TIMEOUT: &str = "10s";
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:8545";
pub const DEFAULT_DATA_DIR: &str = "/var/lib/colony-inspector";

/// File name of the store inside the data directory.
pub const DB_FILE: &str = "inspector.redb";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InspectorConfig {
    pub crawler: CrawlerConfig,
    pub source: SourceConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrawlerConfig {
    pub interval: String,
    pub concurrency: usize,
    pub call_timeout: String,
    pub rollback: RollbackPolicy,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            call_timeout: DEFAULT_CALL_TIMEOUT.to_string(),
            rollback: RollbackPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Registry gateway address, `host:port`.
    pub endpoint: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

/// A configuration value that prevents the daemon from starting.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid duration for {field}: {value:?}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("source endpoint is empty")]
    EmptyEndpoint,
}

/// Validated, typed settings derived from [`InspectorConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub interval: Duration,
    pub crawl: CrawlOptions,
    pub endpoint: String,
    pub data_dir: PathBuf,
}

impl Settings {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }
}

impl InspectorConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: InspectorConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if given, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let interval = duration_field("crawler.interval", &self.crawler.interval)?;
        let call_timeout = duration_field("crawler.call_timeout", &self.crawler.call_timeout)?;
        if self.crawler.concurrency == 0 {
            return Err(ConfigError::Zero("crawler.concurrency"));
        }
        if self.source.endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }

        Ok(Settings {
            interval,
            crawl: CrawlOptions {
                concurrency: self.crawler.concurrency,
                call_timeout,
                rollback: self.crawler.rollback,
            },
            endpoint: self.source.endpoint.trim().to_string(),
            data_dir: self.store.data_dir.clone(),
        })
    }
}

fn duration_field(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match parse_duration(value) {
        Some(d) if d.is_zero() => Err(ConfigError::Zero(field)),
        Some(d) => Ok(d),
        None => Err(ConfigError::InvalidDuration {
            field,
            value: value.to_string(),
        }),
    }
}

/// Parse `"500ms"`, `"30s"`, `"2m"` or a bare number of seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
