use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Longest cache TTL accepted for either cache, one day
pub const MAX_CACHE_TTL_SECS: i64 = 24 * 60 * 60;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Weather provider settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Generative-text provider settings
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeather API key (can be set via OPENWEATHER_API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Provider base URL
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,

    /// Per-attempt request timeout in seconds
    #[serde(default = "default_weather_timeout_secs")]
    pub timeout_secs: u64,

    /// How long geocoding results stay cached
    #[serde(default = "default_cache_ttl_secs")]
    pub geocode_ttl_secs: i64,

    /// How long weather snapshots stay cached
    #[serde(default = "default_cache_ttl_secs")]
    pub weather_ttl_secs: i64,

    /// Transport retries per endpoint (429, 5xx, timeouts)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay, doubled per retry
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,

    /// Upper bound on a single backoff delay
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_weather_timeout_secs() -> u64 {
    5
}

fn default_cache_ttl_secs() -> i64 {
    90
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_initial_delay_ms() -> u64 {
    500
}

fn default_retry_max_delay_ms() -> u64 {
    4000
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            timeout_secs: default_weather_timeout_secs(),
            geocode_ttl_secs: default_cache_ttl_secs(),
            weather_ttl_secs: default_cache_ttl_secs(),
            max_retries: default_max_retries(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl WeatherConfig {
    /// The API key, if one is set and not blank.
    pub fn api_key(&self) -> Option<&str> {
        non_blank(self.api_key.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// OpenAI API key (can be set via OPENAI_API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,

    /// Model used for summaries
    #[serde(default = "default_model")]
    pub summary_model: String,

    /// Model used for alerts; falls back to `summary_model`
    #[serde(default)]
    pub alerts_model: Option<String>,

    /// Model used for chat; falls back to `summary_model`
    #[serde(default)]
    pub chat_model: Option<String>,

    /// Per-attempt request timeout in seconds
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_ai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_ai_timeout_secs() -> u64 {
    10
}

fn default_temperature() -> f32 {
    0.3
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_ai_base_url(),
            summary_model: default_model(),
            alerts_model: None,
            chat_model: None,
            timeout_secs: default_ai_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

impl AiConfig {
    /// The API key, if one is set and not blank.
    pub fn api_key(&self) -> Option<&str> {
        non_blank(self.api_key.as_deref())
    }

    pub fn alerts_model(&self) -> &str {
        non_blank(self.alerts_model.as_deref()).unwrap_or(&self.summary_model)
    }

    pub fn chat_model(&self) -> &str {
        non_blank(self.chat_model.as_deref()).unwrap_or(&self.summary_model)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Mask a secret for logging, keeping only the last four characters.
pub fn mask_secret(value: Option<&str>) -> String {
    match non_blank(value) {
        None => "(not set)".to_string(),
        Some(v) if v.chars().count() <= 4 => "****".to_string(),
        Some(v) => {
            let tail: String = v
                .chars()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("****{}", tail)
        }
    }
}

impl Config {
    /// Load configuration from the default location, then apply environment overrides.
    ///
    /// A missing file is not an error; defaults are used.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file. No environment overrides are applied.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult), ConfigError> {
        Self::load()?.into_validated()
    }

    /// Validate an already loaded configuration, logging its warnings.
    pub fn into_validated(self) -> Result<(Self, ValidationResult), ConfigError> {
        let validation = self.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        if !validation.warnings.is_empty() {
            for warning in &validation.warnings {
                tracing::warn!("Config warning: {}", warning);
            }
        }

        Ok((self, validation))
    }

    /// Apply overrides from a key lookup (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENWEATHER_API_KEY") {
            self.weather.api_key = Some(key.trim().to_string());
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.ai.api_key = Some(key.trim().to_string());
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.ai.base_url = url;
        }
        if let Some(model) = get("OPENAI_SUMMARY_MODEL") {
            self.ai.summary_model = model;
        }
        if let Some(model) = get("OPENAI_ALERTS_MODEL") {
            self.ai.alerts_model = Some(model);
        }
        if let Some(model) = get("OPENAI_CHAT_MODEL") {
            self.ai.chat_model = Some(model);
        }
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);
        self.validate_url(&self.ai.base_url, "ai.base_url", &mut result);

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        }
        if self.ai.timeout_secs == 0 {
            result.add_error("ai.timeout_secs", "Timeout must be greater than 0");
        }

        for (field, ttl) in [
            ("weather.geocode_ttl_secs", self.weather.geocode_ttl_secs),
            ("weather.weather_ttl_secs", self.weather.weather_ttl_secs),
        ] {
            if ttl > MAX_CACHE_TTL_SECS {
                result.add_error(
                    field,
                    format!("TTL must be at most {} seconds, got {}", MAX_CACHE_TTL_SECS, ttl),
                );
            }
        }

        if self.weather.weather_ttl_secs <= 0 {
            result.add_warning(
                "weather.weather_ttl_secs",
                "Weather caching disabled (TTL <= 0)",
            );
        } else if (601..=MAX_CACHE_TTL_SECS).contains(&self.weather.weather_ttl_secs) {
            result.add_warning(
                "weather.weather_ttl_secs",
                "Weather TTL is more than 10 minutes; data may be stale",
            );
        }

        if self.weather.max_retries > 5 {
            result.add_warning(
                "weather.max_retries",
                "More than 5 retries per endpoint may make requests very slow",
            );
        }

        if !(0.0..=2.0).contains(&self.ai.temperature) {
            result.add_error("ai.temperature", "Temperature must be between 0 and 2");
        }

        if self.ai.summary_model.trim().is_empty() {
            result.add_error("ai.summary_model", "Model name must not be empty");
        }

        // Missing credentials only disable features
        if self.weather.api_key().is_none() {
            result.add_warning(
                "weather.api_key",
                "OpenWeather API key not configured - weather lookups will fail",
            );
        }
        if self.ai.api_key().is_none() {
            result.add_warning(
                "ai.api_key",
                "OpenAI API key not configured - AI insights are disabled",
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join("wxagent");

        Ok(config_dir.join("config.toml"))
    }
}
