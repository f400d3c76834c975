//! Location Resolution Module
//!
//! Turns the three kinds of user input into a concrete [`Location`]:
//! free-text names (via geocoding), coordinate pairs, and the device's own
//! position. The debounced, incremental variant of the free-text path is
//! driven by the controller; the functions here are the one-shot building
//! blocks it and the CLI share.

use crate::api::{Geocoder, LocationInput, into_locations};
use crate::geolocation::Geolocator;
use crate::models::Location;
use crate::{CitycastError, Result};
use tracing::debug;

/// Whether `query` is long enough to be sent to the geocoder
#[must_use]
pub fn is_searchable(query: &str, min_chars: usize) -> bool {
    query.trim().chars().count() >= min_chars
}

/// Service for resolving location inputs
pub struct LocationResolver;

impl LocationResolver {
    /// Resolve a location input into a structured Location
    pub async fn resolve_location(
        geocoder: &dyn Geocoder,
        location_input: LocationInput,
    ) -> Result<Location> {
        debug!("Resolving location input: {:?}", location_input);

        let location = match location_input {
            LocationInput::Coordinates(lat, lon) => Self::resolve_coordinates(lat, lon)?,
            LocationInput::Name(name) => Self::resolve_name(geocoder, &name).await?,
        };

        debug!(
            "Resolved location: {} at ({}, {})",
            location.name, location.latitude, location.longitude
        );

        Ok(location)
    }

    /// Coordinates become a location named after themselves
    fn resolve_coordinates(lat: f64, lon: f64) -> Result<Location> {
        Location::try_new(format!("{lat:.4}, {lon:.4}"), None, lat, lon)
    }

    /// Resolve a location name to coordinates via geocoding, taking the best hit
    async fn resolve_name(geocoder: &dyn Geocoder, name: &str) -> Result<Location> {
        debug!("Geocoding location name: {}", name);

        into_locations(geocoder.search(name, 1).await?)
            .into_iter()
            .next()
            .ok_or_else(|| CitycastError::validation(format!("Location not found: {name}")))
    }

    /// Candidate locations for a typed query.
    ///
    /// Queries shorter than `min_chars` return no candidates without touching
    /// the network.
    pub async fn search(
        geocoder: &dyn Geocoder,
        query: &str,
        min_chars: usize,
        limit: u32,
    ) -> Result<Vec<Location>> {
        if !is_searchable(query, min_chars) {
            debug!("Query '{}' too short, not searching", query);
            return Ok(Vec::new());
        }
        Ok(into_locations(geocoder.search(query.trim(), limit).await?))
    }

    /// The device's position as a "My Location" location
    pub async fn locate_device(geolocator: &dyn Geolocator) -> Result<Location> {
        let (lat, lon) = geolocator.current_position().await?;
        debug!("Device reported ({}, {})", lat, lon);
        Location::from_device(lat, lon)
    }
}
