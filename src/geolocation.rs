//! Device position lookup

use crate::models::validate_coordinates;
use crate::{CitycastError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Reports the device's current coordinates
#[async_trait]
pub trait Geolocator: Send + Sync {
    /// `(latitude, longitude)`, or a geolocation error when denied/unavailable
    async fn current_position(&self) -> Result<(f64, f64)>;
}

/// A position supplied up front, e.g. from `--lat/--lon` or the config file
#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocator {
    latitude: f64,
    longitude: f64,
}

impl FixedGeolocator {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        validate_coordinates(latitude, longitude)?;
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<(f64, f64)> {
        Ok((self.latitude, self.longitude))
    }
}

/// Always refuses, as a device without location access would
#[derive(Debug, Default, Clone, Copy)]
pub struct DeniedGeolocator;

#[async_trait]
impl Geolocator for DeniedGeolocator {
    async fn current_position(&self) -> Result<(f64, f64)> {
        Err(CitycastError::geolocation("Location permission denied"))
    }
}

/// Fixed geolocator when a position is known, denying otherwise
#[must_use]
pub fn from_position(position: Option<(f64, f64)>) -> Arc<dyn Geolocator> {
    match position.and_then(|(lat, lon)| FixedGeolocator::new(lat, lon).ok()) {
        Some(fixed) => Arc::new(fixed),
        None => Arc::new(DeniedGeolocator),
    }
}
