//! HTTP plumbing and the Open-Meteo geocoding client
//!
//! All remote services are reached through [`ApiClient`], which owns the
//! shared `reqwest` client and maps transport, status and decoding failures
//! into [`CitycastError::Api`].

use crate::config::ApiConfig;
use crate::models::Location;
use crate::{CitycastError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

const USER_AGENT: &str = concat!("citycast/", env!("CARGO_PKG_VERSION"));

/// Thin JSON-over-HTTP wrapper shared by every remote client
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
}

impl ApiClient {
    /// Create a client honouring the configured timeout
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CitycastError::api(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// GET `url` and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);
        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CitycastError::api(format!("Request to {url} failed: {e}")))?;
        Self::decode(response, url, start).await
    }

    /// POST `body` as JSON to `url` and decode the JSON response
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        debug!("POST {}", url);
        let start = Instant::now();
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| CitycastError::api(format!("Request to {url} failed: {e}")))?;
        Self::decode(response, url, start).await
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        url: &str,
        start: Instant,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            warn!("HTTP {} from {}", status, url);
            return Err(CitycastError::api(format!(
                "API request failed with status: {} - {}",
                status,
                status.canonical_reason().unwrap_or("Unknown error")
            )));
        }

        let body = response
            .json::<T>()
            .await
            .map_err(|e| CitycastError::api(format!("Invalid response from {url}: {e}")))?;

        debug!(
            "Response from {} decoded in {:.3}s",
            url,
            start.elapsed().as_secs_f64()
        );
        Ok(body)
    }
}

/// Resolves place names to candidate locations
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Look up `name`, returning at most `limit` candidates in ranking order
    async fn search(&self, name: &str, limit: u32) -> Result<Vec<GeocodingResult>>;
}

/// Open-Meteo geocoding API client (no API key required)
#[derive(Debug, Clone)]
pub struct OpenMeteoGeocoder {
    api: ApiClient,
    base_url: String,
}

impl OpenMeteoGeocoder {
    pub fn new(api: ApiClient, base_url: impl Into<String>) -> Self {
        Self {
            api,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn search_url(&self, name: &str, limit: u32) -> String {
        format!(
            "{}/v1/search?name={}&count={}&language=en&format=json",
            self.base_url,
            urlencoding::encode(name),
            limit
        )
    }
}

#[async_trait]
impl Geocoder for OpenMeteoGeocoder {
    #[instrument(skip(self), fields(location = name))]
    async fn search(&self, name: &str, limit: u32) -> Result<Vec<GeocodingResult>> {
        let start = Instant::now();
        let response: openmeteo::GeocodingResponse =
            self.api.get_json(&self.search_url(name, limit)).await?;

        let results: Vec<GeocodingResult> = response
            .results
            .unwrap_or_default()
            .into_iter()
            .take(limit as usize)
            .map(GeocodingResult::from)
            .collect();

        if results.is_empty() {
            warn!("No results found for location '{}'", name);
        } else {
            info!(
                "Found {} geocoding results for '{}' in {:.3}s",
                results.len(),
                name,
                start.elapsed().as_secs_f64()
            );
        }

        Ok(results)
    }
}

/// One geocoding candidate
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GeocodingResult {
    /// Upstream identifier
    pub id: Option<u64>,
    pub name: String,
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl TryFrom<GeocodingResult> for Location {
    type Error = CitycastError;

    fn try_from(result: GeocodingResult) -> Result<Self> {
        Location::try_new(result.name, result.country, result.latitude, result.longitude)
    }
}

/// Convert candidates to locations, dropping any with invalid coordinates
#[must_use]
pub fn into_locations(results: Vec<GeocodingResult>) -> Vec<Location> {
    results
        .into_iter()
        .filter_map(|result| match Location::try_from(result) {
            Ok(location) => Some(location),
            Err(e) => {
                warn!("Dropping geocoding candidate: {}", e);
                None
            }
        })
        .collect()
}

/// Location parsing utilities
pub struct LocationParser;

impl LocationParser {
    /// Parse location input (coordinates or place names)
    pub fn parse(input: &str) -> Result<LocationInput> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CitycastError::validation("Location cannot be empty"));
        }

        if let Ok((lat, lon)) = Self::parse_coordinates(input) {
            return Ok(LocationInput::Coordinates(lat, lon));
        }

        Ok(LocationInput::Name(input.to_string()))
    }

    /// Parse coordinates from string like "46.8182,8.2275" or "46.8182 8.2275"
    fn parse_coordinates(input: &str) -> Result<(f64, f64)> {
        let parts: Vec<&str> = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();

        if parts.len() != 2 {
            return Err(CitycastError::validation(
                "Coordinates must be in format 'lat,lon'",
            ));
        }

        let lat = parts[0]
            .parse::<f64>()
            .map_err(|_| CitycastError::validation(format!("Invalid latitude: {}", parts[0])))?;
        let lon = parts[1]
            .parse::<f64>()
            .map_err(|_| CitycastError::validation(format!("Invalid longitude: {}", parts[1])))?;

        crate::models::validate_coordinates(lat, lon)?;
        Ok((lat, lon))
    }
}

/// Types of location input
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    /// Coordinates (latitude, longitude)
    Coordinates(f64, f64),
    /// Location name (city, region, etc.)
    Name(String),
}

/// `OpenMeteo` geocoding wire format
mod openmeteo {
    use super::GeocodingResult;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct GeocodingResponse {
        pub results: Option<Vec<GeocodingEntry>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct GeocodingEntry {
        pub id: Option<u64>,
        pub name: String,
        pub latitude: f64,
        pub longitude: f64,
        pub country: Option<String>,
    }

    impl From<GeocodingEntry> for GeocodingResult {
        fn from(entry: GeocodingEntry) -> Self {
            Self {
                id: entry.id,
                name: entry.name,
                country: entry.country,
                latitude: entry.latitude,
                longitude: entry.longitude,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_parser_coordinates() {
        assert_eq!(
            LocationParser::parse("46.8182,8.2275").unwrap(),
            LocationInput::Coordinates(46.8182, 8.2275)
        );
        assert_eq!(
            LocationParser::parse("46.8182 8.2275").unwrap(),
            LocationInput::Coordinates(46.8182, 8.2275)
        );
        assert_eq!(
            LocationParser::parse(" -46.8182, -8.2275 ").unwrap(),
            LocationInput::Coordinates(-46.8182, -8.2275)
        );
    }

    #[test]
    fn test_location_parser_falls_back_to_name() {
        assert!(matches!(
            LocationParser::parse("91.0,8.0").unwrap(),
            LocationInput::Name(_)
        ));
        assert!(matches!(
            LocationParser::parse("46.0,181.0").unwrap(),
            LocationInput::Name(_)
        ));
        assert!(matches!(
            LocationParser::parse("46.0,8.0,0.0").unwrap(),
            LocationInput::Name(_)
        ));
        assert_eq!(
            LocationParser::parse("New York City").unwrap(),
            LocationInput::Name("New York City".to_string())
        );
    }

    #[test]
    fn test_location_parser_rejects_empty() {
        let err = LocationParser::parse("   ").unwrap_err();
        assert!(matches!(err, CitycastError::Validation { .. }));
    }

    #[test]
    fn test_geocoding_result_to_location() {
        let result = GeocodingResult {
            id: Some(2_950_159),
            name: "Berlin".to_string(),
            country: Some("Germany".to_string()),
            latitude: 52.524_37,
            longitude: 13.410_53,
        };

        let location = Location::try_from(result).unwrap();
        assert_eq!(location.name, "Berlin");
        assert_eq!(location.country.as_deref(), Some("Germany"));
    }

    #[test]
    fn test_into_locations_drops_invalid() {
        let results = vec![
            GeocodingResult {
                id: None,
                name: "Nowhere".into(),
                country: None,
                latitude: 95.0,
                longitude: 0.0,
            },
            GeocodingResult {
                id: None,
                name: "Paris".into(),
                country: Some("France".into()),
                latitude: 48.853_41,
                longitude: 2.3488,
            },
        ];
        let locations = into_locations(results);
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].name, "Paris");
    }

    #[test]
    fn test_search_url_encodes_name() {
        let api = ApiClient::new(&ApiConfig::default()).unwrap();
        let geocoder = OpenMeteoGeocoder::new(api, "https://geocoding-api.open-meteo.com/");
        assert_eq!(
            geocoder.search_url("São Paulo", 5),
            "https://geocoding-api.open-meteo.com/v1/search?name=S%C3%A3o%20Paulo&count=5&language=en&format=json"
        );
    }
}
