use crate::core::error::ConfigError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.apilayer.com/exchangerates_data";
pub const CACHE_FILE_NAME: &str = "exchange_rate_cache.json";
pub const CHART_FILE_NAME: &str = "exchange_rate.png";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub initial_delay_secs: u64,
    pub max_delay_secs: u64,
    pub throttle_multiplier: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 5,
            initial_delay_secs: 10,
            max_delay_secs: 60,
            throttle_multiplier: 2,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(alias = "API_KEY")]
    pub api_key: String,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub cache_path: Option<String>,
    pub chart_path: Option<String>,
    pub data_path: Option<String>,
}

fn project_dirs() -> Result<ProjectDirs, ConfigError> {
    ProjectDirs::from("in", "codito", "fxr").ok_or(ConfigError::NoProjectDirs)
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        Ok(project_dirs()?.config_dir().join("config.yaml"))
    }

    /// Location of the persisted rate cache: `cache_path`, else under
    /// `data_path`, else relative to the working directory.
    pub fn cache_file(&self) -> PathBuf {
        match (&self.cache_path, &self.data_path) {
            (Some(path), _) => PathBuf::from(path),
            (None, Some(dir)) => PathBuf::from(dir).join(CACHE_FILE_NAME),
            (None, None) => PathBuf::from(CACHE_FILE_NAME),
        }
    }

    /// Where rendered charts are written, relative to the working directory by default.
    pub fn chart_file(&self) -> PathBuf {
        self.chart_path
            .as_deref()
            .map_or_else(|| PathBuf::from(CHART_FILE_NAME), PathBuf::from)
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = serde_yaml::from_str(&config_str).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if config.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey(path.to_path_buf()));
        }
        debug!("Successfully loaded config");
        Ok(config)
    }
}
