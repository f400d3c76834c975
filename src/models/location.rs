//! Location model for geographic coordinates and metadata

use serde::{Deserialize, Serialize};

use crate::{CitycastError, Result};

/// Name given to locations reported by the device geolocator
pub const DEVICE_LOCATION_NAME: &str = "My Location";

/// A resolved place the weather can be fetched for
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Location name (city, region, etc.)
    pub name: String,
    /// Country name, when known
    pub country: Option<String>,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Location {
    /// Create a location, rejecting coordinates outside the valid range
    pub fn try_new(
        name: impl Into<String>,
        country: Option<String>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self> {
        validate_coordinates(latitude, longitude)?;
        Ok(Self {
            name: name.into(),
            country: country.filter(|c| !c.is_empty()),
            latitude,
            longitude,
        })
    }

    /// Location reported by the device, named "My Location" with no country
    pub fn from_device(latitude: f64, longitude: f64) -> Result<Self> {
        Self::try_new(DEVICE_LOCATION_NAME, None, latitude, longitude)
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    /// Human readable label, e.g. "Paris, France"
    #[must_use]
    pub fn label(&self) -> String {
        match &self.country {
            Some(country) => format!("{}, {}", self.name, country),
            None => self.name.clone(),
        }
    }
}

/// Check latitude is in [-90, 90] and longitude in [-180, 180]
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(CitycastError::validation(format!(
            "Latitude must be between -90 and 90, got: {latitude}"
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(CitycastError::validation(format!(
            "Longitude must be between -180 and 180, got: {longitude}"
        )));
    }
    Ok(())
}

/// A country offered by the city directory
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Country {
    pub name: String,
    /// ISO 3166-1 alpha-2 code
    pub iso2: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Country {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            iso2: None,
            latitude: None,
            longitude: None,
        }
    }
}
