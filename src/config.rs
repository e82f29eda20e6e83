//! Configuration management for Octowatt
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files with support for environment variable overrides.

use crate::error::{OctowattError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

/// Environment variable pointing at an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "OCTOWATT_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Octopus Energy API endpoints and paging
    pub provider: ProviderConfig,

    /// Retry policy applied to every provider fetch
    pub retry: RetryConfig,

    /// Response cache bounds
    pub cache: CacheConfig,

    /// Billing period and report settings
    pub billing: BillingConfig,

    /// Credential store backend
    pub store: StoreConfig,

    /// Web server binding configuration
    pub web: WebConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Provider API endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// GraphQL endpoint (token and account queries)
    pub graphql_url: String,

    /// REST base URL, with trailing slash
    pub rest_url: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Page size requested from paginated REST endpoints
    pub page_size: u32,

    /// Upper bound on pages followed for one series
    pub max_pages: u32,
}

/// Exponential backoff settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one)
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_delay_ms: u64,

    /// Multiplier applied to the delay after each retry
    pub backoff_multiplier: f64,

    /// Cap on a single delay
    pub max_delay_ms: u64,

    /// Total time budget for one fetch across all attempts
    pub total_budget_ms: u64,
}

/// Response cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time-to-live of a cached response in seconds
    pub ttl_secs: u64,

    /// Maximum number of cached responses per series kind
    pub capacity: usize,
}

/// Billing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// IANA timezone used to find the last full day
    pub timezone: String,

    /// Symbol printed in front of currency values
    pub currency_symbol: String,
}

/// Credential store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend: "memory" or "json"
    pub backend: String,

    /// Path of the JSON file for the "json" backend
    pub path: String,
}

/// Web server binding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Directory or file path for the rolling log file; empty disables file logging
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from `OCTOWATT_CONFIG` or the default locations
    pub fn load() -> Result<Self> {
        if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
            if !explicit.trim().is_empty() {
                return Self::from_file(explicit.trim());
            }
        }

        let default_paths = [
            "octowatt.yaml",
            "/data/octowatt.yaml",
            "/etc/octowatt/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parsed billing timezone
    pub fn timezone(&self) -> Result<chrono_tz::Tz> {
        self.billing.timezone.parse::<chrono_tz::Tz>().map_err(|_| {
            OctowattError::validation(
                "billing.timezone".to_string(),
                format!("Unknown timezone: {}", self.billing.timezone),
            )
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.provider.graphql_url.trim().is_empty() {
            return Err(OctowattError::validation(
                "provider.graphql_url",
                "URL cannot be empty",
            ));
        }

        if self.provider.rest_url.trim().is_empty() {
            return Err(OctowattError::validation(
                "provider.rest_url",
                "URL cannot be empty",
            ));
        }

        if self.provider.request_timeout_secs == 0 {
            return Err(OctowattError::validation(
                "provider.request_timeout_secs",
                "Must be greater than 0",
            ));
        }

        if self.provider.page_size == 0 || self.provider.max_pages == 0 {
            return Err(OctowattError::validation(
                "provider.page_size",
                "Paging limits must be greater than 0",
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(OctowattError::validation(
                "retry.max_attempts",
                "Must be greater than 0",
            ));
        }

        if self.retry.backoff_multiplier < 1.0 {
            return Err(OctowattError::validation(
                "retry.backoff_multiplier",
                "Must be at least 1.0",
            ));
        }

        if self.cache.capacity == 0 {
            return Err(OctowattError::validation(
                "cache.capacity",
                "Must be greater than 0",
            ));
        }

        self.timezone()?;

        if !matches!(self.store.backend.as_str(), "memory" | "json") {
            return Err(OctowattError::validation(
                "store.backend".to_string(),
                format!("Unknown backend: {}", self.store.backend),
            ));
        }

        if self.store.backend == "json" && self.store.path.trim().is_empty() {
            return Err(OctowattError::validation(
                "store.path",
                "Path is required for the json backend",
            ));
        }

        if self.web.port == 0 {
            return Err(OctowattError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.web.port, 8088);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.billing.timezone, "Europe/London");
        assert_eq!(config.billing.currency_symbol, "£");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.provider.rest_url = String::new();
        assert!(config.validate().is_err());

        config = Config::default();
        config.billing.timezone = "Mars/Olympus".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.store.backend = "sqlite".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "web:\n  port: 9000\nbilling:\n  currency_symbol: \"$\"\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.web.port, 9000);
        assert_eq!(config.web.host, "127.0.0.1");
        assert_eq!(config.billing.currency_symbol, "$");
        assert_eq!(config.billing.timezone, "Europe/London");
    }
}
