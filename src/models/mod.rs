//! Data models for the Citycast application
//!
//! - Location: places, countries and coordinate validation
//! - Weather: the fetched weather snapshot and temperature units

pub mod location;
pub mod weather;

pub use location::{Country, DEVICE_LOCATION_NAME, Location, validate_coordinates};
pub use weather::{HOURLY_WINDOW, TemperatureUnit, WeatherSnapshot};
