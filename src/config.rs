//! Configuration management for `Citycast`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::CitycastError;
use crate::models::{Location, TemperatureUnit};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for `Citycast`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CitycastConfig {
    /// Remote service endpoints
    #[serde(default)]
    pub api: ApiConfig,
    /// Free-text search behaviour
    #[serde(default)]
    pub search: SearchConfig,
    /// Country/city dropdown data source
    #[serde(default)]
    pub directory: DirectoryConfig,
    /// Start-up defaults
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// Fixed device position used by the geolocation path
    #[serde(default)]
    pub geolocation: GeolocationConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote service endpoints and HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the Open-Meteo geocoding service
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,
    /// Base URL of the Open-Meteo forecast service
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,
    /// Base URL of the CountriesNow country/city listing
    #[serde(default = "default_directory_url")]
    pub directory_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
}

/// Free-text search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Quiet period before a typed query is sent
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Minimum query length (in characters) that triggers a search
    #[serde(default = "default_min_query_chars")]
    pub min_query_chars: usize,
    /// Maximum number of candidates requested
    #[serde(default = "default_result_limit")]
    pub result_limit: u32,
}

/// Where the dropdown's countries and cities come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DirectorySource {
    #[default]
    Remote,
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub source: DirectorySource,
}

/// Default application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Location selected on start-up
    #[serde(default = "default_location")]
    pub location: Location,
    /// Initial display unit
    #[serde(default)]
    pub unit: TemperatureUnit,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeolocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com".to_string()
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com".to_string()
}

fn default_directory_url() -> String {
    "https://countriesnow.space".to_string()
}

fn default_timeout() -> u32 {
    10
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_min_query_chars() -> usize {
    2
}

fn default_result_limit() -> u32 {
    5
}

fn default_location() -> Location {
    Location {
        name: "Berlin".to_string(),
        country: Some("Germany".to_string()),
        latitude: 52.52,
        longitude: 13.41,
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            geocoding_url: default_geocoding_url(),
            forecast_url: default_forecast_url(),
            directory_url: default_directory_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_query_chars: default_min_query_chars(),
            result_limit: default_result_limit(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            location: default_location(),
            unit: TemperatureUnit::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl SearchConfig {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl ApiConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl GeolocationConfig {
    /// Both coordinates, if configured
    #[must_use]
    pub fn position(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

impl CitycastConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // CITYCAST_SEARCH__DEBOUNCE_MS=500 etc.
        builder = builder.add_source(
            Environment::with_prefix("CITYCAST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: CitycastConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("citycast").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.api.geocoding_url.is_empty() {
            self.api.geocoding_url = default_geocoding_url();
        }
        if self.api.forecast_url.is_empty() {
            self.api.forecast_url = default_forecast_url();
        }
        if self.api.directory_url.is_empty() {
            self.api.directory_url = default_directory_url();
        }
        if self.api.timeout_seconds == 0 {
            self.api.timeout_seconds = default_timeout();
        }
        if self.search.min_query_chars == 0 {
            self.search.min_query_chars = default_min_query_chars();
        }
        if self.search.result_limit == 0 {
            self.search.result_limit = default_result_limit();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.validate_locations()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.api.timeout_seconds > 300 {
            return Err(CitycastError::config("API timeout cannot exceed 300 seconds").into());
        }

        if self.search.debounce_ms > 5000 {
            return Err(CitycastError::config("Search debounce cannot exceed 5000 ms").into());
        }

        if self.search.min_query_chars < 2 {
            return Err(CitycastError::config(
                "Search needs at least 2 characters before querying",
            )
            .into());
        }

        if self.search.result_limit > 100 {
            return Err(CitycastError::config("Search result limit cannot exceed 100").into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(CitycastError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(CitycastError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("geocoding", &self.api.geocoding_url),
            ("forecast", &self.api.forecast_url),
            ("directory", &self.api.directory_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(CitycastError::config(format!(
                    "The {name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }

    fn validate_locations(&self) -> Result<()> {
        let location = &self.defaults.location;
        Location::try_new(
            location.name.clone(),
            location.country.clone(),
            location.latitude,
            location.longitude,
        )
        .with_context(|| "Invalid default location")?;

        if let Some((lat, lon)) = self.geolocation.position() {
            Location::from_device(lat, lon).with_context(|| "Invalid geolocation position")?;
        }

        Ok(())
    }
}
