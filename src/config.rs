//! Configuration system
//!
//! Centralized configuration with:
//! - Environment variable support
//! - Config file loading (optional)
//! - Runtime defaults
//! - Validation and type safety

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Cache and log paths
    pub paths: PathsConfig,

    /// Analysis defaults
    pub analysis: AnalysisConfig,

    /// Analytics API access
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub log_directory: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Buckets with fewer samples than this are dropped from reports.
    pub min_count: usize,
    /// Keep only fights with `fightPercentage` at or below this value.
    pub max_percentage: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub url: String,
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
    pub page_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "ERROR".to_string(),
                format: "pretty".to_string(),
                output: "console".to_string(),
            },
            paths: PathsConfig {
                data_dir: dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("cast-stats"),
                log_directory: PathBuf::from("logs"),
            },
            analysis: AnalysisConfig {
                min_count: 0,
                max_percentage: None,
            },
            api: ApiConfig {
                url: "https://www.warcraftlogs.com/api/v2/client".to_string(),
                token_url: "https://www.warcraftlogs.com/oauth/token".to_string(),
                client_id: None,
                client_secret: None,
                max_retries: 3,
                retry_delay_ms: 2_000,
                page_limit: 100,
            },
        }
    }
}

impl Config {
    /// Load configuration from environment, file, and defaults
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        // Try to load from config file if it exists
        let config_paths = [
            PathBuf::from("cast-stats.toml"),
            PathBuf::from(".cast-stats.toml"),
            dirs::config_dir()
                .map(|d| d.join("cast-stats").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.exists() {
                info!(config_file = %path.display(), "Loading configuration from file");
                config = Self::load_from_file(path)?;
                break;
            }
        }

        // Override with environment variables
        config.apply_env_overrides()?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        // Logging overrides
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("LOG_OUTPUT") {
            self.logging.output = val;
        }

        // Path overrides
        if let Ok(val) = env::var("CAST_STATS_DATA_DIR") {
            self.paths.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = env::var("CAST_STATS_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }

        // Analysis overrides
        if let Ok(val) = env::var("CAST_STATS_MIN_COUNT") {
            self.analysis.min_count = val.parse().context("Invalid CAST_STATS_MIN_COUNT")?;
        }

        // API credentials, same variable names the upstream scripts used
        if let Ok(val) = env::var("CLIENT_ID") {
            self.api.client_id = Some(val);
        }
        if let Ok(val) = env::var("CLIENT_SECRET") {
            self.api.client_secret = Some(val);
        }
        if let Ok(val) = env::var("CAST_STATS_API_URL") {
            self.api.url = val;
        }
        if let Ok(val) = env::var("CAST_STATS_MAX_RETRIES") {
            self.api.max_retries = val.parse().context("Invalid CAST_STATS_MAX_RETRIES")?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if let Some(percentage) = self.analysis.max_percentage {
            if !(0.0..=100.0).contains(&percentage) {
                return Err(anyhow::anyhow!(
                    "max_percentage must be between 0 and 100, got {}",
                    percentage
                ));
            }
        }

        if self.api.page_limit == 0 {
            return Err(anyhow::anyhow!("API page limit must be greater than 0"));
        }

        if self.api.max_retries > 10 {
            warn!(
                max_retries = self.api.max_retries,
                "Very high retry count, rate-limited requests may stall for a long time"
            );
        }

        // Validate paths exist (create if needed)
        if !self.paths.log_directory.exists() {
            fs::create_dir_all(&self.paths.log_directory)
                .context("Failed to create log directory")?;
        }

        Ok(())
    }
}

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration instance
pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(|| Config::load().expect("Failed to load configuration"))
}
