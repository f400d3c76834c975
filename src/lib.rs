//! `Citycast` - a small city weather widget
//!
//! This library provides location search (free text, country/city picker and
//! device position), Open-Meteo weather fetching and the state machine plus
//! derived presentation values of the weather card.

pub mod api;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod directory;
pub mod error;
pub mod geolocation;
pub mod location_resolver;
pub mod models;
pub mod view;
pub mod weather;

// Re-export core types for public API
pub use api::{ApiClient, Geocoder, GeocodingResult, LocationInput, LocationParser, OpenMeteoGeocoder};
pub use config::CitycastConfig;
pub use controller::{AppState, Controller, Effect, Event, Services};
pub use directory::{CityDirectory, RemoteCityDirectory, StaticCityDirectory};
pub use error::CitycastError;
pub use geolocation::{DeniedGeolocator, FixedGeolocator, Geolocator};
pub use location_resolver::LocationResolver;
pub use models::{Country, Location, TemperatureUnit, WeatherSnapshot};
pub use view::{ActivityTip, WeatherIcon, WeatherView};
pub use weather::{ForecastProvider, OpenMeteoForecast};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, CitycastError>;
