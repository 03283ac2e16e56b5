//! Application configuration
//!
//! Settings are layered: built-in defaults, then an optional config file
//! (`cpucoolerchart.toml`/`.json`, or the path in `CPUCOOLERCHART_CONFIG`),
//! then environment variables such as `CPUCOOLERCHART__UPDATE__INTERVAL_SECS`.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite database URL
    pub database_url: String,
    pub update: UpdateConfig,
    pub cache: CacheConfig,
    pub crawler: CrawlerConfig,
    pub danawa: DanawaConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Update cycle timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Minimum time between two update cycles
    pub interval_secs: u64,

    /// How long the running flag stays set if a cycle never clears it
    pub lock_timeout_secs: u64,

    /// Cached upstream responses expire this much earlier than the update
    /// interval so the next cycle always refetches
    pub fetch_cache_margin_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Entries in the application database; shared by every process using it
    Sqlite,
    /// Process-local entries
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,

    /// Prepended to every cache key
    pub key_prefix: String,
}

/// Chart crawler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Chart page URL with `{noise}` and `{power}` placeholders for the grid codes
    pub chart_url: String,
    pub user_agent: String,
    pub request_timeout_seconds: u64,

    /// Delay between two consecutive upstream requests
    pub request_delay_ms: u64,
}

/// Danawa price API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DanawaConfig {
    pub product_info_url: String,
    pub search_url: String,

    /// Without this key prices are not fetched
    pub product_info_api_key: Option<String>,
    pub search_api_key: Option<String>,

    /// Danawa category code for CPU coolers
    pub search_category: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Value of the `Access-Control-Allow-Origin` header, if any
    pub access_control_allow_origin: Option<String>,

    /// Whether `POST /update` may start an update cycle
    pub allow_remote_update: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted file logs
    pub json_format: bool,

    pub console_output: bool,
    pub file_output: bool,

    /// Directory for log files, relative to the working directory
    pub directory: String,
    pub file_name: String,

    /// Module-specific log level filters (e.g., "sqlx": "warn", "reqwest": "info")
    pub module_filters: HashMap<String, String>,
}

pub mod defaults {
    pub const DATABASE_URL: &str = "sqlite://cpucoolerchart.db";

    pub const UPDATE_INTERVAL_SECS: u64 = 259_200;
    pub const UPDATE_LOCK_TIMEOUT_SECS: u64 = 3600;
    pub const FETCH_CACHE_MARGIN_SECS: u64 = 600;

    pub const CACHE_KEY_PREFIX: &str = "cpucoolerchart:";

    pub const CHART_URL: &str =
        "http://www.coolenjoy.net/cooln_db/cpucooler_charts.php?dd={noise}&test={power}";
    pub const USER_AGENT: &str = "cpucoolerchart/0.2 (+https://github.com/clee704/cpucoolerchart)";
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;
    pub const REQUEST_DELAY_MS: u64 = 500;

    pub const DANAWA_PRODUCT_INFO_URL: &str = "http://api.danawa.com/api/main/product/info";
    pub const DANAWA_SEARCH_URL: &str = "http://api.danawa.com/api/search/product/info";
    pub const DANAWA_SEARCH_CATEGORY: u32 = 862;

    pub const SERVER_HOST: &str = "127.0.0.1";
    pub const SERVER_PORT: u16 = 5000;

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_DIRECTORY: &str = "logs";
    pub const LOG_FILE_NAME: &str = "cpucoolerchart.log";
}

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "CPUCOOLERCHART_CONFIG";
const DEFAULT_CONFIG_NAME: &str = "cpucoolerchart";
const ENV_PREFIX: &str = "CPUCOOLERCHART";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: defaults::DATABASE_URL.to_string(),
            update: UpdateConfig::default(),
            cache: CacheConfig::default(),
            crawler: CrawlerConfig::default(),
            danawa: DanawaConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::UPDATE_INTERVAL_SECS,
            lock_timeout_secs: defaults::UPDATE_LOCK_TIMEOUT_SECS,
            fetch_cache_margin_secs: defaults::FETCH_CACHE_MARGIN_SECS,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Sqlite,
            key_prefix: defaults::CACHE_KEY_PREFIX.to_string(),
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            chart_url: defaults::CHART_URL.to_string(),
            user_agent: defaults::USER_AGENT.to_string(),
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            request_delay_ms: defaults::REQUEST_DELAY_MS,
        }
    }
}

impl Default for DanawaConfig {
    fn default() -> Self {
        Self {
            product_info_url: defaults::DANAWA_PRODUCT_INFO_URL.to_string(),
            search_url: defaults::DANAWA_SEARCH_URL.to_string(),
            product_info_api_key: None,
            search_api_key: None,
            search_category: defaults::DANAWA_SEARCH_CATEGORY,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            access_control_allow_origin: Some("*".to_string()),
            allow_remote_update: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            directory: defaults::LOG_DIRECTORY.to_string(),
            file_name: defaults::LOG_FILE_NAME.to_string(),
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("sqlx".to_string(), "warn".to_string());
                filters.insert("reqwest".to_string(), "info".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("actix_server".to_string(), "info".to_string());
                filters
            },
        }
    }
}

impl UpdateConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    /// Lifetime of cached upstream responses
    pub fn fetch_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.interval_secs.saturating_sub(self.fetch_cache_margin_secs))
    }
}

impl AppConfig {
    /// Load configuration from the default file location and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).ok();
        let required = path.is_some();
        let path = path.unwrap_or_else(|| DEFAULT_CONFIG_NAME.to_string());
        Self::from_source(&path, required)
    }

    /// Load configuration from `path` (extension optional) and the environment
    pub fn from_source(path: &str, required: bool) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(required))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.update.interval_secs == 0 {
            return Err(ConfigError::Validation {
                message: "update.interval_secs must be positive".to_string(),
            });
        }
        if self.update.fetch_cache_margin_secs >= self.update.interval_secs {
            return Err(ConfigError::Validation {
                message: "update.fetch_cache_margin_secs must be shorter than update.interval_secs"
                    .to_string(),
            });
        }
        if !(self.crawler.chart_url.contains("{noise}") && self.crawler.chart_url.contains("{power}")) {
            return Err(ConfigError::Validation {
                message: "crawler.chart_url needs {noise} and {power} placeholders".to_string(),
            });
        }
        Ok(())
    }
}
