use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::pricing::cache::MAX_BATCH_SIZE;

pub const APP_DIR_NAME: &str = "falgen";
pub const CACHE_FILE_NAME: &str = "pricing-cache.json";
pub const HISTORY_FILE_NAME: &str = "history.json";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub pricing: PricingConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.fal.ai".to_string(),
            timeout_seconds: 30,
            api_key_env: "FAL_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PricingConfig {
    pub cache_ttl_hours: u64,
    pub batch_size: usize,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            cache_ttl_hours: 6,
            batch_size: MAX_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides the platform config directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Config {
    pub fn storage_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage.dir {
            Some(dir) => Ok(dir.clone()),
            None => default_config_dir().ok_or(ConfigError::NoConfigDir),
        }
    }

    pub fn cache_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.storage_dir()?.join(CACHE_FILE_NAME))
    }

    pub fn history_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.storage_dir()?.join(HISTORY_FILE_NAME))
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.pricing.cache_ttl_hours as i64)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds)
    }
}

/// `$XDG_CONFIG_HOME/falgen` (or the platform equivalent)
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME))
}

/// Load configuration: defaults, then the config file, then `FALGEN__*`
/// environment variables.
///
/// An explicitly passed file must exist; the default `config.toml` in the
/// config directory is optional.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    match path {
        Some(path) => {
            builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
        }
        None => {
            if let Some(dir) = default_config_dir() {
                builder = builder
                    .add_source(config::File::from(dir.join("config.toml")).required(false));
            }
        }
    }

    let settings = builder
        .add_source(config::Environment::with_prefix("FALGEN").separator("__"))
        .build()?;

    let cfg: Config = settings.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.api.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("api.base_url cannot be empty".to_string()));
    }

    if cfg.api.timeout_seconds == 0 {
        return Err(ConfigError::Invalid(
            "api.timeout_seconds must be greater than 0".to_string(),
        ));
    }

    if cfg.pricing.cache_ttl_hours == 0 {
        return Err(ConfigError::Invalid(
            "pricing.cache_ttl_hours must be greater than 0".to_string(),
        ));
    }

    if cfg.pricing.batch_size == 0 || cfg.pricing.batch_size > MAX_BATCH_SIZE {
        return Err(ConfigError::Invalid(format!(
            "pricing.batch_size must be between 1 and {}",
            MAX_BATCH_SIZE
        )));
    }

    Ok(())
}
