//! Forecast retrieval from Open-Meteo
//!
//! Requests current conditions, the hourly temperature/apparent temperature
//! series and today's sunrise/sunset in the location's own time zone, and
//! folds the response into a single [`WeatherSnapshot`].

use crate::api::ApiClient;
use crate::models::{HOURLY_WINDOW, Location, WeatherSnapshot, validate_coordinates};
use crate::{CitycastError, Result};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sunrise::{Coordinates, SolarDay, SolarEvent};
use tracing::{debug, info, instrument};

/// Source of weather snapshots
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    async fn fetch(&self, location: &Location) -> Result<WeatherSnapshot>;
}

/// Open-Meteo forecast API client
#[derive(Debug, Clone)]
pub struct OpenMeteoForecast {
    api: ApiClient,
    base_url: String,
}

impl OpenMeteoForecast {
    pub fn new(api: ApiClient, base_url: impl Into<String>) -> Self {
        Self {
            api,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn forecast_url(&self, latitude: f64, longitude: f64) -> String {
        format!(
            "{}/v1/forecast?latitude={}&longitude={}&current_weather=true&hourly=temperature_2m,apparent_temperature&daily=sunrise,sunset&timezone=auto",
            self.base_url, latitude, longitude
        )
    }
}

#[async_trait]
impl ForecastProvider for OpenMeteoForecast {
    #[instrument(skip(self, location), fields(location = %location.name, lat = location.latitude, lon = location.longitude))]
    async fn fetch(&self, location: &Location) -> Result<WeatherSnapshot> {
        validate_coordinates(location.latitude, location.longitude)?;

        let url = self.forecast_url(location.latitude, location.longitude);
        let response: openmeteo::ForecastResponse = self.api.get_json(&url).await?;
        let snapshot = WeatherSnapshot::from_openmeteo(response, location)?;

        info!(
            "Weather for {}: {:.1}°C, code {}",
            location.name, snapshot.temperature_c, snapshot.weather_code
        );
        Ok(snapshot)
    }
}

/// Parse an Open-Meteo local timestamp (`2026-02-05T14:00`)
fn parse_local_datetime(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| CitycastError::api(format!("Invalid datetime format: {s}")))
}

/// Astronomical sunrise and sunset for `date`, in UTC
pub fn get_sunrise_sunset(
    location: &Location,
    date: NaiveDate,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let coordinates = Coordinates::new(location.latitude, location.longitude)
        .with_context(|| {
            format!(
                "Invalid coordinates: lat={}, lng={}",
                location.latitude, location.longitude
            )
        })
        .map_err(|e| CitycastError::validation(e.to_string()))?;

    let solar_day = SolarDay::new(coordinates, date);

    // Polar day/night has no events; fall back to a nominal 06:00-19:00 day.
    let sunrise = solar_day
        .event_time(SolarEvent::Sunrise)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN).and_utc() + Duration::hours(6));
    let sunset = solar_day
        .event_time(SolarEvent::Sunset)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN).and_utc() + Duration::hours(19));

    Ok((sunrise, sunset))
}

/// `OpenMeteo` forecast wire format and conversion
mod openmeteo {
    use super::{
        CitycastError, FixedOffset, HOURLY_WINDOW, Location, Result, Utc, WeatherSnapshot, debug,
        get_sunrise_sunset, parse_local_datetime,
    };
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        #[serde(default)]
        pub utc_offset_seconds: i32,
        #[serde(default)]
        pub timezone: Option<String>,
        pub current_weather: Option<CurrentWeather>,
        pub hourly: Option<HourlyData>,
        pub daily: Option<DailyData>,
    }

    #[derive(Debug, Deserialize)]
    pub struct CurrentWeather {
        pub time: Option<String>,
        pub temperature: f64,
        pub weathercode: i32,
    }

    #[derive(Debug, Deserialize)]
    pub struct HourlyData {
        #[serde(default)]
        pub time: Vec<String>,
        #[serde(default)]
        pub temperature_2m: Vec<Option<f64>>,
        #[serde(default)]
        pub apparent_temperature: Vec<Option<f64>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct DailyData {
        #[serde(default)]
        pub sunrise: Vec<String>,
        #[serde(default)]
        pub sunset: Vec<String>,
    }

    /// One value per hour slot. A null repeats the last known value, leading
    /// nulls take the first known one. Empty when no hour has a value.
    fn carry_forward(values: &[Option<f64>]) -> Vec<f64> {
        let Some(mut last) = values.iter().flatten().copied().next() else {
            return Vec::new();
        };
        values
            .iter()
            .map(|value| {
                if let Some(v) = value {
                    last = *v;
                }
                last
            })
            .collect()
    }

    impl WeatherSnapshot {
        /// Build a snapshot from an `OpenMeteo` forecast response
        pub fn from_openmeteo(response: ForecastResponse, location: &Location) -> Result<Self> {
            let current = response.current_weather.ok_or_else(|| {
                CitycastError::api("No current weather data in response")
            })?;

            let (hourly_temperatures_c, apparent_temperature_c) = match &response.hourly {
                Some(hourly) => {
                    let window = hourly.temperature_2m.len().min(HOURLY_WINDOW);
                    let temperatures = carry_forward(&hourly.temperature_2m[..window]);

                    let index = current
                        .time
                        .as_ref()
                        .and_then(|now| hourly.time.iter().position(|t| t == now))
                        .unwrap_or(0);
                    let apparent = hourly
                        .apparent_temperature
                        .get(index)
                        .copied()
                        .flatten()
                        .unwrap_or(current.temperature);

                    (temperatures, apparent)
                }
                None => (Vec::new(), current.temperature),
            };

            let offset = FixedOffset::east_opt(response.utc_offset_seconds)
                .ok_or_else(|| CitycastError::api("Invalid UTC offset in response"))?;

            let first_day = response
                .daily
                .as_ref()
                .and_then(|daily| Some((daily.sunrise.first()?, daily.sunset.first()?)));

            let (sunrise, sunset) = match first_day {
                Some((sunrise, sunset)) => {
                    (parse_local_datetime(sunrise)?, parse_local_datetime(sunset)?)
                }
                None => {
                    debug!("No daily block in response, computing sunrise/sunset");
                    let today = current
                        .time
                        .as_deref()
                        .and_then(|t| parse_local_datetime(t).ok())
                        .map(|t| t.date())
                        .unwrap_or_else(|| Utc::now().with_timezone(&offset).date_naive());
                    let (sunrise, sunset) = get_sunrise_sunset(location, today)?;
                    (
                        sunrise.with_timezone(&offset).naive_local(),
                        sunset.with_timezone(&offset).naive_local(),
                    )
                }
            };

            Ok(Self {
                temperature_c: current.temperature,
                weather_code: current.weathercode,
                apparent_temperature_c,
                hourly_temperatures_c,
                sunrise,
                sunset,
                timezone: response.timezone.unwrap_or_else(|| "UTC".to_string()),
            })
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn berlin() -> Location {
        Location::try_new("Berlin", Some("Germany".into()), 52.52, 13.41).unwrap()
    }

    fn parse(json: serde_json::Value) -> Result<WeatherSnapshot> {
        let response: openmeteo::ForecastResponse = serde_json::from_value(json).unwrap();
        WeatherSnapshot::from_openmeteo(response, &berlin())
    }

    #[test]
    fn test_forecast_url() {
        let api = ApiClient::new(&crate::config::ApiConfig::default()).unwrap();
        let client = OpenMeteoForecast::new(api, "https://api.open-meteo.com");
        assert_eq!(
            client.forecast_url(52.52, 13.41),
            "https://api.open-meteo.com/v1/forecast?latitude=52.52&longitude=13.41&current_weather=true&hourly=temperature_2m,apparent_temperature&daily=sunrise,sunset&timezone=auto"
        );
    }

    #[test]
    fn test_snapshot_from_full_response() {
        let hourly_time: Vec<String> = (0..48_u32).map(|h| format!("2026-10-19T{:02}:00", h % 24)).collect();
        let temps: Vec<f64> = (0..48_u32).map(|h| 10.0 + f64::from(h % 24)).collect();
        let apparent: Vec<f64> = (0..48_u32).map(|h| 8.0 + f64::from(h % 24)).collect();

        let snapshot = parse(serde_json::json!({
            "latitude": 52.52,
            "longitude": 13.41,
            "utc_offset_seconds": 7200,
            "timezone": "Europe/Berlin",
            "current_weather": { "time": "2026-10-19T12:00", "temperature": 22.0, "weathercode": 0 },
            "hourly": { "time": hourly_time, "temperature_2m": temps, "apparent_temperature": apparent },
            "daily": {
                "time": ["2026-10-19", "2026-10-20"],
                "sunrise": ["2026-10-19T07:31", "2026-10-20T07:33"],
                "sunset": ["2026-10-19T18:09", "2026-10-20T18:07"]
            }
        }))
        .unwrap();

        assert_eq!(snapshot.temperature_c, 22.0);
        assert_eq!(snapshot.weather_code, 0);
        assert_eq!(snapshot.hourly_temperatures_c.len(), 24);
        assert_eq!(snapshot.hourly_temperatures_c[23], 33.0);
        // apparent temperature at the current hour (index 12)
        assert_eq!(snapshot.apparent_temperature_c, 20.0);
        assert_eq!((snapshot.sunrise.hour(), snapshot.sunrise.minute()), (7, 31));
        assert_eq!((snapshot.sunset.hour(), snapshot.sunset.minute()), (18, 9));
        assert_eq!(snapshot.timezone, "Europe/Berlin");
    }

    #[test]
    fn test_snapshot_requires_current_weather() {
        let err = parse(serde_json::json!({ "utc_offset_seconds": 0 })).unwrap_err();
        assert!(matches!(err, CitycastError::Api { .. }));
    }

    #[test]
    fn test_snapshot_rejects_bad_sunrise() {
        let result = parse(serde_json::json!({
            "current_weather": { "time": "2026-10-19T12:00", "temperature": 5.0, "weathercode": 3 },
            "daily": { "sunrise": ["yesterday"], "sunset": ["2026-10-19T18:09"] }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_snapshot_without_hourly_or_daily() {
        let snapshot = parse(serde_json::json!({
            "utc_offset_seconds": 7200,
            "current_weather": { "time": "2026-06-21T12:00", "temperature": 18.5, "weathercode": 2 }
        }))
        .unwrap();

        assert!(snapshot.hourly_temperatures_c.is_empty());
        assert_eq!(snapshot.apparent_temperature_c, 18.5);
        assert_eq!(snapshot.timezone, "UTC");
        // Berlin midsummer: sunrise before 6 local, sunset after 21 local
        assert!(snapshot.sunrise < snapshot.sunset);
        assert!(snapshot.sunrise.hour() < 6);
        assert!(snapshot.sunset.hour() >= 21);
    }

    #[test]
    fn test_null_hourly_values_keep_their_slot() {
        let snapshot = parse(serde_json::json!({
            "current_weather": { "temperature": 1.0, "weathercode": 71 },
            "hourly": {
                "time": ["2026-01-01T00:00", "2026-01-01T01:00", "2026-01-01T02:00"],
                "temperature_2m": [1.0, null, 3.0],
                "apparent_temperature": [null, -2.0, -1.0]
            },
            "daily": { "sunrise": ["2026-01-01T08:17"], "sunset": ["2026-01-01T16:02"] }
        }))
        .unwrap();

        assert_eq!(snapshot.hourly_temperatures_c, vec![1.0, 1.0, 3.0]);
        // no current time: index 0 is null, so the current temperature is used
        assert_eq!(snapshot.apparent_temperature_c, 1.0);
    }

    #[test]
    fn test_leading_or_all_null_hourly_values() {
        let hourly = |temps: serde_json::Value| {
            parse(serde_json::json!({
                "current_weather": { "temperature": 5.0, "weathercode": 3 },
                "hourly": { "time": [], "temperature_2m": temps },
                "daily": { "sunrise": ["2026-01-01T08:17"], "sunset": ["2026-01-01T16:02"] }
            }))
            .unwrap()
            .hourly_temperatures_c
        };

        assert_eq!(hourly(serde_json::json!([null, null, 4.0, null])), vec![4.0; 4]);
        assert!(hourly(serde_json::json!([null, null])).is_empty());
    }

    #[test]
    fn test_sunrise_sunset_order() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
        let (sunrise, sunset) = get_sunrise_sunset(&berlin(), date).unwrap();
        assert!(sunrise < sunset);
        assert_eq!(sunrise.date_naive(), date);
    }
}
