//! Weather snapshot model and temperature units

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Number of hourly values kept in a snapshot
pub const HOURLY_WINDOW: usize = 24;

/// Display unit for temperatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// The other unit
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Celsius => Self::Fahrenheit,
            Self::Fahrenheit => Self::Celsius,
        }
    }

    /// Single letter symbol ("C" or "F")
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Celsius => "C",
            Self::Fahrenheit => "F",
        }
    }

    /// Convert a Celsius reading to this unit, rounded to the nearest degree
    #[must_use]
    pub fn display_degrees(self, celsius: f64) -> i64 {
        match self {
            Self::Celsius => celsius.round() as i64,
            Self::Fahrenheit => celsius_to_fahrenheit(celsius).round() as i64,
        }
    }
}

impl std::str::FromStr for TemperatureUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" | "celsius" => Ok(Self::Celsius),
            "f" | "fahrenheit" => Ok(Self::Fahrenheit),
            other => Err(format!("unknown temperature unit '{other}'")),
        }
    }
}

#[must_use]
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

#[must_use]
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Weather for one location, produced wholesale by a single fetch
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherSnapshot {
    /// Current temperature in Celsius
    pub temperature_c: f64,
    /// WMO weather code of the current conditions
    pub weather_code: i32,
    /// Apparent ("feels like") temperature for the current hour in Celsius
    pub apparent_temperature_c: f64,
    /// Up to 24 hourly temperatures in Celsius, starting at local midnight
    pub hourly_temperatures_c: Vec<f64>,
    /// Today's sunrise, local wall-clock time
    pub sunrise: NaiveDateTime,
    /// Today's sunset, local wall-clock time
    pub sunset: NaiveDateTime,
    /// IANA time zone the times are expressed in
    pub timezone: String,
}
