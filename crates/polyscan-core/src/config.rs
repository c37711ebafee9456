use crate::error::{PolyscanError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Default remote service root
pub const DEFAULT_BASE_URL: &str = "https://api.data-axle.com/v1";

/// Smallest vertex budget that still describes a closed triangle
pub const MIN_MAX_POINTS: usize = 4;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for Polyscan
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub base_url: ConfigValue<String>,
    pub api_token: ConfigValue<Option<String>>,
    pub rate_limit: ConfigValue<u32>,
    pub rate_window_secs: ConfigValue<u64>,
    pub max_points: ConfigValue<usize>,
    pub page_delay_ms: ConfigValue<u64>,
    pub retry_delay_ms: ConfigValue<u64>,
    pub max_retries: ConfigValue<u32>,
    pub request_timeout_secs: ConfigValue<u64>,
    pub places_package: ConfigValue<String>,
    pub people_package: ConfigValue<String>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            base_url: ConfigValue::new(DEFAULT_BASE_URL.to_string(), ConfigSource::Default),
            api_token: ConfigValue::new(None, ConfigSource::Default),
            rate_limit: ConfigValue::new(150, ConfigSource::Default),
            rate_window_secs: ConfigValue::new(10, ConfigSource::Default),
            max_points: ConfigValue::new(500, ConfigSource::Default),
            page_delay_ms: ConfigValue::new(100, ConfigSource::Default),
            retry_delay_ms: ConfigValue::new(2000, ConfigSource::Default),
            max_retries: ConfigValue::new(3, ConfigSource::Default),
            request_timeout_secs: ConfigValue::new(60, ConfigSource::Default),
            places_package: ConfigValue::new("enhanced_v2".to_string(), ConfigSource::Default),
            people_package: ConfigValue::new("enhanced".to_string(), ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| PolyscanError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| PolyscanError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(base_url) = file_config.base_url {
            self.base_url.update(base_url, ConfigSource::File);
        }
        if let Some(token) = file_config.api_token {
            self.api_token.update(Some(token), ConfigSource::File);
        }
        if let Some(limit) = file_config.rate_limit {
            self.rate_limit.update(positive("rate_limit", limit)?, ConfigSource::File);
        }
        if let Some(secs) = file_config.rate_window_secs {
            self.rate_window_secs.update(positive("rate_window_secs", secs)?, ConfigSource::File);
        }
        if let Some(max_points) = file_config.max_points {
            self.max_points.update(parse_max_points(max_points)?, ConfigSource::File);
        }
        if let Some(ms) = file_config.page_delay_ms {
            self.page_delay_ms.update(ms, ConfigSource::File);
        }
        if let Some(ms) = file_config.retry_delay_ms {
            self.retry_delay_ms.update(ms, ConfigSource::File);
        }
        if let Some(retries) = file_config.max_retries {
            self.max_retries.update(retries, ConfigSource::File);
        }
        if let Some(secs) = file_config.request_timeout_secs {
            self.request_timeout_secs
                .update(positive("request_timeout_secs", secs)?, ConfigSource::File);
        }
        if let Some(package) = file_config.places_package {
            self.places_package.update(package, ConfigSource::File);
        }
        if let Some(package) = file_config.people_package {
            self.people_package.update(package, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from `POLYSCAN_*` environment variables
    pub fn load_from_env(mut self) -> Self {
        if let Ok(url) = env::var("POLYSCAN_BASE_URL") {
            self.base_url.update(url, ConfigSource::Environment);
        }

        if let Ok(token) = env::var("POLYSCAN_API_TOKEN") {
            if !token.trim().is_empty() {
                self.api_token.update(Some(token), ConfigSource::Environment);
            }
        }

        if let Some(limit) = env_number::<u32>("POLYSCAN_RATE_LIMIT", "positive integer") {
            match positive("rate_limit", limit) {
                Ok(limit) => self.rate_limit.update(limit, ConfigSource::Environment),
                Err(e) => tracing::warn!("Ignoring POLYSCAN_RATE_LIMIT: {}", e),
            }
        }

        if let Some(secs) = env_number::<u64>("POLYSCAN_RATE_WINDOW_SECS", "positive integer") {
            match positive("rate_window_secs", secs) {
                Ok(secs) => self.rate_window_secs.update(secs, ConfigSource::Environment),
                Err(e) => tracing::warn!("Ignoring POLYSCAN_RATE_WINDOW_SECS: {}", e),
            }
        }

        if let Some(max_points) = env_number::<usize>("POLYSCAN_MAX_POINTS", "integer >= 4") {
            match parse_max_points(max_points) {
                Ok(max_points) => self.max_points.update(max_points, ConfigSource::Environment),
                Err(e) => tracing::warn!("Ignoring POLYSCAN_MAX_POINTS: {}", e),
            }
        }

        if let Some(ms) = env_number::<u64>("POLYSCAN_PAGE_DELAY_MS", "milliseconds") {
            self.page_delay_ms.update(ms, ConfigSource::Environment);
        }

        if let Some(ms) = env_number::<u64>("POLYSCAN_RETRY_DELAY_MS", "milliseconds") {
            self.retry_delay_ms.update(ms, ConfigSource::Environment);
        }

        if let Some(retries) = env_number::<u32>("POLYSCAN_MAX_RETRIES", "integer") {
            self.max_retries.update(retries, ConfigSource::Environment);
        }

        if let Some(secs) = env_number::<u64>("POLYSCAN_REQUEST_TIMEOUT_SECS", "seconds") {
            match positive("request_timeout_secs", secs) {
                Ok(secs) => self.request_timeout_secs.update(secs, ConfigSource::Environment),
                Err(e) => tracing::warn!("Ignoring POLYSCAN_REQUEST_TIMEOUT_SECS: {}", e),
            }
        }

        if let Ok(package) = env::var("POLYSCAN_PLACES_PACKAGE") {
            self.places_package.update(package, ConfigSource::Environment);
        }

        if let Ok(package) = env::var("POLYSCAN_PEOPLE_PACKAGE") {
            self.people_package.update(package, ConfigSource::Environment);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(base_url) = overrides.base_url {
            self.base_url.update(base_url, ConfigSource::Cli);
        }

        if let Some(token) = overrides.api_token {
            self.api_token.update(Some(token), ConfigSource::Cli);
        }

        if let Some(max_points) = overrides.max_points {
            self.max_points.update(max_points.max(MIN_MAX_POINTS), ConfigSource::Cli);
        }

        if let Some(limit) = overrides.rate_limit {
            self.rate_limit.update(limit.max(1), ConfigSource::Cli);
        }
    }

    /// Token required by every remote call
    pub fn require_token(&self) -> Result<&str> {
        self.api_token
            .value
            .as_deref()
            .ok_or_else(|| PolyscanError::ConfigMissing { key: "api_token".to_string() })
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs.value)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms.value)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms.value)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.value)
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert("base_url".to_string(), (self.base_url.value.clone(), self.base_url.source));

        let token = match &self.api_token.value {
            Some(_) => "********".to_string(),
            None => "(not set)".to_string(),
        };
        map.insert("api_token".to_string(), (token, self.api_token.source));

        map.insert(
            "rate_limit".to_string(),
            (
                format!("{} requests / {}s", self.rate_limit.value, self.rate_window_secs.value),
                self.rate_limit.source,
            ),
        );
        map.insert(
            "rate_window_secs".to_string(),
            (self.rate_window_secs.value.to_string(), self.rate_window_secs.source),
        );
        map.insert(
            "max_points".to_string(),
            (self.max_points.value.to_string(), self.max_points.source),
        );
        map.insert(
            "page_delay_ms".to_string(),
            (self.page_delay_ms.value.to_string(), self.page_delay_ms.source),
        );
        map.insert(
            "retry_delay_ms".to_string(),
            (self.retry_delay_ms.value.to_string(), self.retry_delay_ms.source),
        );
        map.insert(
            "max_retries".to_string(),
            (self.max_retries.value.to_string(), self.max_retries.source),
        );
        map.insert(
            "request_timeout_secs".to_string(),
            (self.request_timeout_secs.value.to_string(), self.request_timeout_secs.source),
        );
        map.insert(
            "places_package".to_string(),
            (self.places_package.value.clone(), self.places_package.source),
        );
        map.insert(
            "people_package".to_string(),
            (self.people_package.value.clone(), self.people_package.source),
        );

        map
    }
}

impl Default for LayeredConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    base_url: Option<String>,
    api_token: Option<String>,
    rate_limit: Option<u32>,
    rate_window_secs: Option<u64>,
    max_points: Option<usize>,
    page_delay_ms: Option<u64>,
    retry_delay_ms: Option<u64>,
    max_retries: Option<u32>,
    request_timeout_secs: Option<u64>,
    places_package: Option<String>,
    people_package: Option<String>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub base_url: Option<String>,
    pub api_token: Option<String>,
    pub max_points: Option<usize>,
    pub rate_limit: Option<u32>,
}

/// Validate a vertex budget
pub fn parse_max_points(max_points: usize) -> Result<usize> {
    if max_points < MIN_MAX_POINTS {
        return Err(PolyscanError::ConfigInvalid {
            key: "max_points".to_string(),
            reason: format!("{} is below the minimum of {}", max_points, MIN_MAX_POINTS),
        });
    }
    Ok(max_points)
}

fn positive<T: PartialEq + Default + std::fmt::Display>(key: &str, value: T) -> Result<T> {
    if value == T::default() {
        return Err(PolyscanError::ConfigInvalid {
            key: key.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

fn env_number<T: FromStr>(name: &str, expected: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {} value '{}': expected {}", name, raw, expected);
            None
        }
    }
}
