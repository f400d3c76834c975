//! Error types and handling for `Citycast`

use thiserror::Error;

/// Main error type for the `Citycast` library
#[derive(Error, Debug)]
pub enum CitycastError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Remote service communication errors (network, status, parse)
    #[error("API error: {message}")]
    Api { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Device position could not be obtained
    #[error("Geolocation error: {message}")]
    Geolocation { message: String },
}

impl CitycastError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new geolocation error
    pub fn geolocation<S: Into<String>>(message: S) -> Self {
        Self::Geolocation {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            CitycastError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            CitycastError::Api { .. } => {
                "Unable to reach the weather services. Please check your internet connection."
                    .to_string()
            }
            CitycastError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            CitycastError::Geolocation { .. } => {
                "Your location is unavailable. Pass --lat/--lon or pick a city instead."
                    .to_string()
            }
        }
    }
}
