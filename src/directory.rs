//! Country and city listings for the two-level picker
//!
//! The remote directory lists countries and their cities from CountriesNow
//! and resolves a picked city through the geocoder. The static directory is
//! a fixed in-process table that needs no network.

use crate::api::{ApiClient, Geocoder};
use crate::models::{Country, Location};
use crate::{CitycastError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Source of the country/city dropdown contents
#[async_trait]
pub trait CityDirectory: Send + Sync {
    /// All selectable countries
    async fn countries(&self) -> Result<Vec<Country>>;

    /// Cities of one country, in display order
    async fn cities(&self, country: &str) -> Result<Vec<String>>;

    /// Turn a picked city into a location; `None` when it cannot be placed
    async fn resolve_city(&self, country: &str, city: &str) -> Result<Option<Location>>;
}

/// CountriesNow-backed directory
pub struct RemoteCityDirectory {
    api: ApiClient,
    base_url: String,
    geocoder: Arc<dyn Geocoder>,
}

impl RemoteCityDirectory {
    pub fn new(api: ApiClient, base_url: impl Into<String>, geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            api,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            geocoder,
        }
    }
}

impl std::fmt::Debug for RemoteCityDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCityDirectory")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CityDirectory for RemoteCityDirectory {
    #[instrument(skip(self))]
    async fn countries(&self) -> Result<Vec<Country>> {
        let url = format!("{}/api/v0.1/countries/positions", self.base_url);
        let response: countriesnow::Envelope<Vec<countriesnow::CountryPosition>> =
            self.api.get_json(&url).await?;
        let countries: Vec<Country> = response
            .into_data()?
            .into_iter()
            .map(Country::from)
            .collect();
        info!("Loaded {} countries", countries.len());
        Ok(countries)
    }

    #[instrument(skip(self))]
    async fn cities(&self, country: &str) -> Result<Vec<String>> {
        let url = format!("{}/api/v0.1/countries/cities", self.base_url);
        let body = countriesnow::CitiesRequest { country };
        let response: countriesnow::Envelope<Vec<String>> =
            self.api.post_json(&url, &body).await?;
        let cities = response.into_data()?;
        info!("Loaded {} cities for {}", cities.len(), country);
        Ok(cities)
    }

    #[instrument(skip(self))]
    async fn resolve_city(&self, country: &str, city: &str) -> Result<Option<Location>> {
        let Some(hit) = self.geocoder.search(city, 1).await?.into_iter().next() else {
            debug!("Geocoder has no match for {}", city);
            return Ok(None);
        };
        let country = hit.country.clone().or_else(|| Some(country.to_string()));
        Location::try_new(hit.name, country, hit.latitude, hit.longitude).map(Some)
    }
}

/// One row of the static table
#[derive(Debug, Clone, Copy)]
struct StaticCity {
    name: &'static str,
    latitude: f64,
    longitude: f64,
}

const fn city(name: &'static str, latitude: f64, longitude: f64) -> StaticCity {
    StaticCity {
        name,
        latitude,
        longitude,
    }
}

const STATIC_TABLE: [(&str, &str, [StaticCity; 4]); 5] = [
    (
        "Germany",
        "DE",
        [
            city("Berlin", 52.52, 13.41),
            city("Munich", 48.14, 11.58),
            city("Hamburg", 53.55, 9.99),
            city("Cologne", 50.94, 6.96),
        ],
    ),
    (
        "France",
        "FR",
        [
            city("Paris", 48.85, 2.35),
            city("Lyon", 45.76, 4.84),
            city("Marseille", 43.30, 5.37),
            city("Nice", 43.70, 7.27),
        ],
    ),
    (
        "United Kingdom",
        "GB",
        [
            city("London", 51.51, -0.13),
            city("Manchester", 53.48, -2.24),
            city("Edinburgh", 55.95, -3.19),
            city("Birmingham", 52.49, -1.89),
        ],
    ),
    (
        "United States",
        "US",
        [
            city("New York", 40.71, -74.01),
            city("Los Angeles", 34.05, -118.24),
            city("Chicago", 41.88, -87.63),
            city("Miami", 25.77, -80.19),
        ],
    ),
    (
        "Japan",
        "JP",
        [
            city("Tokyo", 35.68, 139.69),
            city("Osaka", 34.69, 135.50),
            city("Kyoto", 35.01, 135.77),
            city("Sapporo", 43.06, 141.35),
        ],
    ),
];

/// Fixed table of five countries with four cities each
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticCityDirectory;

impl StaticCityDirectory {
    fn entry(country: &str) -> Option<&'static (&'static str, &'static str, [StaticCity; 4])> {
        STATIC_TABLE
            .iter()
            .find(|(name, iso2, _)| name.eq_ignore_ascii_case(country) || iso2.eq_ignore_ascii_case(country))
    }
}

#[async_trait]
impl CityDirectory for StaticCityDirectory {
    async fn countries(&self) -> Result<Vec<Country>> {
        Ok(STATIC_TABLE
            .iter()
            .map(|(name, iso2, _)| Country {
                name: (*name).to_string(),
                iso2: Some((*iso2).to_string()),
                latitude: None,
                longitude: None,
            })
            .collect())
    }

    async fn cities(&self, country: &str) -> Result<Vec<String>> {
        let (_, _, cities) = Self::entry(country)
            .ok_or_else(|| CitycastError::validation(format!("Unknown country: {country}")))?;
        Ok(cities.iter().map(|c| c.name.to_string()).collect())
    }

    async fn resolve_city(&self, country: &str, city: &str) -> Result<Option<Location>> {
        let Some((country_name, _, cities)) = Self::entry(country) else {
            return Ok(None);
        };
        cities
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(city))
            .map(|c| {
                Location::try_new(
                    c.name,
                    Some((*country_name).to_string()),
                    c.latitude,
                    c.longitude,
                )
            })
            .transpose()
    }
}

/// CountriesNow wire format
mod countriesnow {
    use super::{CitycastError, Country, Deserialize, Result, Serialize};

    /// Every CountriesNow response is wrapped in this envelope
    #[derive(Debug, Deserialize)]
    pub struct Envelope<T> {
        #[serde(default)]
        pub error: bool,
        #[serde(default)]
        pub msg: String,
        pub data: Option<T>,
    }

    impl<T> Envelope<T> {
        pub fn into_data(self) -> Result<T> {
            if self.error {
                return Err(CitycastError::api(format!("CountriesNow error: {}", self.msg)));
            }
            self.data
                .ok_or_else(|| CitycastError::api("CountriesNow response has no data"))
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct CountryPosition {
        pub name: String,
        pub iso2: Option<String>,
        pub long: Option<f64>,
        pub lat: Option<f64>,
    }

    impl From<CountryPosition> for Country {
        fn from(position: CountryPosition) -> Self {
            Self {
                name: position.name,
                iso2: position.iso2,
                latitude: position.lat,
                longitude: position.long,
            }
        }
    }

    #[derive(Debug, Serialize)]
    pub struct CitiesRequest<'a> {
        pub country: &'a str,
    }
}
