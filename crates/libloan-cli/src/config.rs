//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global configuration for libloan
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub batch: BatchConfig,
    pub download: DownloadConfig,
    pub aggregate: AggregateConfig,
    pub logging: LoggingConfig,
    /// File this config was read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub path: PathBuf,
    /// Origin prepended to relative links when building a dataset
    pub url_prefix: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("datasource.csv"),
            url_prefix: libloan_core::catalog::DEFAULT_URL_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Per-row ETA guess before any timing exists
    pub placeholder_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            placeholder_secs: libloan_core::batcher::DEFAULT_PLACEHOLDER.as_secs(),
        }
    }
}

impl BatchConfig {
    pub fn placeholder(&self) -> Duration {
        Duration::from_secs(self.placeholder_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub charset: String,
    pub window: usize,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub user_agent: Option<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        let http = libloan_core::HttpConfig::default();
        Self {
            charset: libloan_core::stream::DEFAULT_CHARSET.to_string(),
            window: libloan_download::Config::default().window,
            connect_timeout_secs: http.connect_timeout.as_secs(),
            timeout_secs: http.timeout.as_secs(),
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    pub sum_columns: Vec<String>,
    /// 0 disables intermediate checkpoints
    pub checkpoint_every: usize,
    pub output_stem: String,
    pub output_dir: Option<PathBuf>,
    pub window: usize,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        let defaults = libloan_aggregate::Config::default();
        Self {
            sum_columns: defaults.sum_columns,
            checkpoint_every: defaults.checkpoint_every.map_or(0, |n| n.get()),
            output_stem: defaults.output_stem,
            output_dir: defaults.output_dir,
            window: defaults.window,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Append log lines to this file as well
    pub file: Option<PathBuf>,
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./libloan.toml (current directory)
    /// 2. ~/.config/libloan/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("libloan.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "libloan") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }
}
