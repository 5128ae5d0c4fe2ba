//! Configuration management for cachetrigger
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from a YAML file and `CACHETRIGGER_*` environment
//! variables. The resulting [`Config`] is built once at startup and passed
//! explicitly into every component.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Topic consumed when none is configured.
pub const DEFAULT_TOPIC: &str = "api";

/// Trigger phrase used when none is configured.
pub const DEFAULT_TRIGGER_MESSAGE: &str = "refresh_cache";

/// Errors that can occur while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for [`Config`].
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A required value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// A value is present but unusable.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure for cachetrigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Topic to consume trigger messages from (`"api"` when absent or empty)
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Phrase whose case-insensitive presence triggers a refresh
    /// (`"refresh_cache"` when absent or empty)
    #[serde(default = "default_trigger_message")]
    pub trigger_message: String,

    /// Kafka connection settings
    #[serde(default)]
    pub kafka: KafkaConfig,

    /// Topic administration API settings
    #[serde(default)]
    pub admin: AdminConfig,

    /// Downstream cache service settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Kafka connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    /// Kafka brokers (comma-separated)
    #[serde(default)]
    pub brokers: String,

    /// SASL username
    #[serde(default)]
    pub username: String,

    /// SASL password (prefer `CACHETRIGGER_KAFKA_PASSWORD`)
    #[serde(default)]
    pub password: String,

    /// Where the credential descriptor is written (defaults to `<temp>/jaas.conf`)
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,

    /// Upper bound on messages returned by a single poll
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// How long the startup connectivity check may take
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

/// Topic administration API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Base URL of the admin REST API
    #[serde(default)]
    pub url: String,

    /// API key sent with every admin request
    #[serde(default)]
    pub api_key: String,

    /// Partition count requested when the topic has to be created
    #[serde(default = "default_partitions")]
    pub partitions: u32,

    /// Request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,
}

/// Downstream cache service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Endpoint that refreshes the cache when POSTed to
    #[serde(default)]
    pub refresh_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,

    /// What the poll loop does when a refresh call fails
    #[serde(default)]
    pub on_failure: RefreshFailureMode,

    /// Attempts per trigger under the `retry` mode
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay between attempts, multiplied by the attempt number
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

/// Behaviour of the poll loop when the cache refresh call fails
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshFailureMode {
    /// Stop consuming and exit with a non-zero status
    #[default]
    Abort,
    /// Log the failure and keep consuming
    Skip,
    /// Retry with linear backoff, abort once attempts are exhausted
    Retry,
}

impl std::str::FromStr for RefreshFailureMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "skip" => Ok(Self::Skip),
            "retry" => Ok(Self::Retry),
            other => Err(ConfigError::Invalid(format!(
                "Invalid refresh failure policy: {}. Must be one of: abort, skip, retry",
                other
            ))),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable JSON-formatted logs
    #[serde(default)]
    pub json_format: bool,

    /// Log file path (if None, STDOUT only)
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

fn default_trigger_message() -> String {
    DEFAULT_TRIGGER_MESSAGE.to_string()
}

fn default_max_batch_size() -> usize {
    500
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_partitions() -> u32 {
    1
}

fn default_http_timeout() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: String::new(),
            username: String::new(),
            password: String::new(),
            credentials_path: None,
            max_batch_size: default_max_batch_size(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            partitions: default_partitions(),
            timeout_seconds: default_http_timeout(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_url: String::new(),
            timeout_seconds: default_http_timeout(),
            on_failure: RefreshFailureMode::default(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from file with environment overrides
    ///
    /// A missing file is not an error: defaults are used and the
    /// environment fills in the rest.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file exists but cannot be read and
    /// `ConfigError::Parse` if it is not valid YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path.display());
            Self::default_config()
        };

        config.apply_env_vars();
        config.apply_defaults();

        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yaml::from_str(contents)?;
        config.apply_defaults();
        Ok(config)
    }

    fn default_config() -> Self {
        Self {
            topic: default_topic(),
            trigger_message: default_trigger_message(),
            kafka: KafkaConfig::default(),
            admin: AdminConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Empty topic or trigger values fall back to their defaults.
    fn apply_defaults(&mut self) {
        if self.topic.trim().is_empty() {
            self.topic = default_topic();
        }
        if self.trigger_message.trim().is_empty() {
            self.trigger_message = default_trigger_message();
        }
    }

    fn apply_env_vars(&mut self) {
        if let Ok(topic) = std::env::var("CACHETRIGGER_TOPIC") {
            tracing::debug!(topic = %topic, "Env override: CACHETRIGGER_TOPIC");
            self.topic = topic;
        }

        if let Ok(trigger) = std::env::var("CACHETRIGGER_TRIGGER_MESSAGE") {
            tracing::debug!(trigger = %trigger, "Env override: CACHETRIGGER_TRIGGER_MESSAGE");
            self.trigger_message = trigger;
        }

        // Kafka connection
        if let Ok(brokers) = std::env::var("CACHETRIGGER_KAFKA_BROKERS") {
            tracing::debug!(brokers = %brokers, "Env override: CACHETRIGGER_KAFKA_BROKERS");
            self.kafka.brokers = brokers;
        }

        if let Ok(username) = std::env::var("CACHETRIGGER_KAFKA_USERNAME") {
            tracing::debug!("Env override: CACHETRIGGER_KAFKA_USERNAME");
            self.kafka.username = username;
        }

        if let Ok(password) = std::env::var("CACHETRIGGER_KAFKA_PASSWORD") {
            tracing::debug!("Env override: CACHETRIGGER_KAFKA_PASSWORD");
            self.kafka.password = password;
        }

        if let Ok(path) = std::env::var("CACHETRIGGER_CREDENTIALS_PATH") {
            tracing::debug!(path = %path, "Env override: CACHETRIGGER_CREDENTIALS_PATH");
            self.kafka.credentials_path = Some(PathBuf::from(path));
        }

        // Admin API
        if let Ok(url) = std::env::var("CACHETRIGGER_ADMIN_URL") {
            tracing::debug!(url = %url, "Env override: CACHETRIGGER_ADMIN_URL");
            self.admin.url = url;
        }

        if let Ok(api_key) = std::env::var("CACHETRIGGER_ADMIN_API_KEY") {
            tracing::debug!("Env override: CACHETRIGGER_ADMIN_API_KEY");
            self.admin.api_key = api_key;
        }

        // Cache service
        if let Ok(url) = std::env::var("CACHETRIGGER_CACHE_REFRESH_URL") {
            tracing::debug!(url = %url, "Env override: CACHETRIGGER_CACHE_REFRESH_URL");
            self.cache.refresh_url = url;
        }

        if let Ok(policy) = std::env::var("CACHETRIGGER_REFRESH_FAILURE_POLICY") {
            match policy.parse::<RefreshFailureMode>() {
                Ok(mode) => {
                    self.cache.on_failure = mode;
                    tracing::debug!(
                        on_failure = ?mode,
                        "Env override: CACHETRIGGER_REFRESH_FAILURE_POLICY"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for CACHETRIGGER_REFRESH_FAILURE_POLICY: {}",
                        policy
                    );
                }
            }
        }

        // Logging
        if let Ok(level) = std::env::var("CACHETRIGGER_LOG_LEVEL") {
            tracing::debug!(level = %level, "Env override: CACHETRIGGER_LOG_LEVEL");
            self.logging.level = level;
        }

        if let Ok(json_logs) = std::env::var("CACHETRIGGER_JSON_LOGS") {
            match json_logs.parse::<bool>() {
                Ok(v) => {
                    self.logging.json_format = v;
                    tracing::debug!(json_logs = v, "Env override: CACHETRIGGER_JSON_LOGS");
                }
                Err(_) => {
                    tracing::warn!("Invalid value for CACHETRIGGER_JSON_LOGS: {}", json_logs);
                }
            }
        }
    }

    /// Location of the credential descriptor file.
    pub fn credentials_path(&self) -> PathBuf {
        self.kafka
            .credentials_path
            .clone()
            .unwrap_or_else(crate::credentials::default_descriptor_path)
    }

    /// Validate the settings needed to reach the admin API.
    ///
    /// The `provision` command only needs this subset.
    pub fn validate_admin(&self) -> Result<(), ConfigError> {
        if self.admin.url.trim().is_empty() {
            return Err(ConfigError::Missing("admin.url".to_string()));
        }

        url::Url::parse(&self.admin.url).map_err(|e| {
            ConfigError::Invalid(format!("admin.url is not a valid URL ({}): {}", e, self.admin.url))
        })?;

        if self.admin.api_key.is_empty() {
            return Err(ConfigError::Missing("admin.api_key".to_string()));
        }

        if self.admin.partitions == 0 {
            return Err(ConfigError::Invalid(
                "admin.partitions must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate the settings needed to write the credential descriptor.
    pub fn validate_credentials(&self) -> Result<(), ConfigError> {
        if self.kafka.username.is_empty() {
            return Err(ConfigError::Missing("kafka.username".to_string()));
        }

        if self.kafka.password.is_empty() {
            return Err(ConfigError::Missing("kafka.password".to_string()));
        }

        Ok(())
    }

    /// Validate the configuration
    ///
    /// Ensures every value the consumer needs is present and usable.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as `ConfigError::Missing` or
    /// `ConfigError::Invalid`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kafka.brokers.trim().is_empty() {
            return Err(ConfigError::Missing("kafka.brokers".to_string()));
        }

        self.validate_credentials()?;

        if self.kafka.max_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "kafka.max_batch_size must be greater than 0".to_string(),
            ));
        }

        if self.kafka.connect_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "kafka.connect_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        self.validate_admin()?;

        if self.cache.refresh_url.trim().is_empty() {
            return Err(ConfigError::Missing("cache.refresh_url".to_string()));
        }

        url::Url::parse(&self.cache.refresh_url).map_err(|e| {
            ConfigError::Invalid(format!(
                "cache.refresh_url is not a valid URL ({}): {}",
                e, self.cache.refresh_url
            ))
        })?;

        if self.cache.on_failure == RefreshFailureMode::Retry && self.cache.retry_attempts == 0 {
            return Err(ConfigError::Invalid(
                "cache.retry_attempts must be greater than 0 when on_failure is retry".to_string(),
            ));
        }

        Ok(())
    }
}
