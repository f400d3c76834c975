//! Application state and its transition function
//!
//! [`AppState`] is an immutable snapshot. [`AppState::apply`] consumes it
//! together with one [`Event`] and returns the next snapshot plus the
//! [`Effect`]s (network work) the runtime has to start. Nothing here does
//! I/O, so every flow can be exercised synchronously.

use crate::location_resolver::is_searchable;
use crate::models::{Country, Location, TemperatureUnit, WeatherSnapshot};
use tracing::debug;

/// Something that happened: a user action or a finished background task
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Make `Location` the active one
    SelectLocation(Location),
    ToggleUnit,
    /// Add or remove the active location from favorites
    ToggleFavorite,
    /// The search box now contains this text
    SetQuery(String),
    /// Pick the n-th search candidate
    PickSearchResult(usize),
    /// Pick a country in the dropdown; empty clears it
    SelectCountry(String),
    /// Pick a city of the selected country
    SelectCity(String),
    UseDeviceLocation,

    CountriesLoaded(Vec<Country>),
    SearchCompleted {
        generation: u64,
        results: Vec<Location>,
    },
    CitiesLoaded {
        country: String,
        cities: Vec<String>,
    },
    CityResolved {
        request: u64,
        location: Option<Location>,
    },
    /// Device position, `None` when denied or unavailable
    Geolocated {
        request: u64,
        position: Option<(f64, f64)>,
    },
    /// Result of a weather fetch; `None` when it failed
    WeatherLoaded {
        ticket: u64,
        weather: Option<WeatherSnapshot>,
    },
}

/// Work the runtime must start on behalf of the state
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    LoadCountries,
    /// Geocode `query` once the debounce delay passes without newer input
    ScheduleSearch { generation: u64, query: String },
    /// Drop any pending or running search
    CancelSearch,
    LoadCities { country: String },
    ResolveCity {
        request: u64,
        country: String,
        city: String,
    },
    LocateDevice { request: u64 },
    FetchWeather { ticket: u64, location: Location },
}

/// Everything the widget shows, as of one moment
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    /// The active location
    pub location: Location,
    /// Last successfully fetched weather; kept while a new fetch runs or after one fails
    pub weather: Option<WeatherSnapshot>,
    pub unit: TemperatureUnit,
    /// Favorites in insertion order, unique by name
    pub favorites: Vec<Location>,
    pub query: String,
    pub search_results: Vec<Location>,
    /// A search for the current query is scheduled or in flight
    pub searching: bool,
    pub countries: Vec<Country>,
    pub selected_country: Option<String>,
    pub cities: Vec<String>,
    fetching: bool,
    locating: bool,
    min_query_chars: usize,
    search_generation: u64,
    weather_ticket: u64,
    city_request: u64,
    device_request: u64,
}

impl AppState {
    pub fn new(location: Location, unit: TemperatureUnit, min_query_chars: usize) -> Self {
        Self {
            location,
            weather: None,
            unit,
            favorites: Vec::new(),
            query: String::new(),
            search_results: Vec::new(),
            searching: false,
            countries: Vec::new(),
            selected_country: None,
            cities: Vec::new(),
            fetching: false,
            locating: false,
            min_query_chars,
            search_generation: 0,
            weather_ticket: 0,
            city_request: 0,
            device_request: 0,
        }
    }

    /// Initial load: fetch the country list and the default location's weather
    #[must_use]
    pub fn start(self) -> (Self, Vec<Effect>) {
        let location = self.location.clone();
        let (state, mut effects) = self.select_location(location);
        effects.insert(0, Effect::LoadCountries);
        (state, effects)
    }

    /// A weather fetch or a device lookup is outstanding
    pub fn loading(&self) -> bool {
        self.fetching || self.locating
    }

    pub fn is_favorite(&self) -> bool {
        self.favorites.iter().any(|f| f.name == self.location.name)
    }

    /// Ticket of the weather fetch whose response will be accepted
    pub fn weather_ticket(&self) -> u64 {
        self.weather_ticket
    }

    /// Compute the next state for `event`
    #[must_use]
    pub fn apply(self, event: Event) -> (Self, Vec<Effect>) {
        match event {
            Event::SelectLocation(location) => self.select_location(location),
            Event::ToggleUnit => (
                Self {
                    unit: self.unit.toggled(),
                    ..self
                },
                Vec::new(),
            ),
            Event::ToggleFavorite => (self.toggle_favorite(), Vec::new()),
            Event::SetQuery(query) => self.set_query(query),
            Event::PickSearchResult(index) => self.pick_search_result(index),
            Event::SelectCountry(country) => self.select_country(country),
            Event::SelectCity(city) => self.select_city(city),
            Event::UseDeviceLocation => {
                let request = self.device_request + 1;
                (
                    Self {
                        locating: true,
                        device_request: request,
                        ..self
                    },
                    vec![Effect::LocateDevice { request }],
                )
            }
            Event::CountriesLoaded(countries) => (Self { countries, ..self }, Vec::new()),
            Event::SearchCompleted {
                generation,
                results,
            } => self.search_completed(generation, results),
            Event::CitiesLoaded { country, cities } => {
                if self.selected_country.as_deref() == Some(country.as_str()) {
                    (Self { cities, ..self }, Vec::new())
                } else {
                    debug!("Discarding cities for deselected country {}", country);
                    (self, Vec::new())
                }
            }
            Event::CityResolved { request, location } => match location {
                Some(location) if request == self.city_request => self.select_location(location),
                _ => (self, Vec::new()),
            },
            Event::Geolocated { request, position } => self.geolocated(request, position),
            Event::WeatherLoaded { ticket, weather } => self.weather_loaded(ticket, weather),
        }
    }

    /// Make `location` active. Any city or device lookup still in flight is
    /// superseded by this choice.
    fn select_location(self, location: Location) -> (Self, Vec<Effect>) {
        let ticket = self.weather_ticket + 1;
        let effect = Effect::FetchWeather {
            ticket,
            location: location.clone(),
        };
        (
            Self {
                location,
                fetching: true,
                locating: false,
                weather_ticket: ticket,
                city_request: self.city_request + 1,
                device_request: self.device_request + 1,
                ..self
            },
            vec![effect],
        )
    }

    fn toggle_favorite(mut self) -> Self {
        let name = self.location.name.clone();
        if self.favorites.iter().any(|f| f.name == name) {
            self.favorites.retain(|f| f.name != name);
        } else {
            self.favorites.push(self.location.clone());
        }
        self
    }

    fn set_query(self, query: String) -> (Self, Vec<Effect>) {
        let generation = self.search_generation + 1;
        if is_searchable(&query, self.min_query_chars) {
            let effect = Effect::ScheduleSearch {
                generation,
                query: query.trim().to_string(),
            };
            (
                Self {
                    query,
                    searching: true,
                    search_generation: generation,
                    ..self
                },
                vec![effect],
            )
        } else {
            (
                Self {
                    query,
                    search_results: Vec::new(),
                    searching: false,
                    search_generation: generation,
                    ..self
                },
                vec![Effect::CancelSearch],
            )
        }
    }

    fn pick_search_result(self, index: usize) -> (Self, Vec<Effect>) {
        let Some(location) = self.search_results.get(index).cloned() else {
            return (self, Vec::new());
        };
        let cleared = Self {
            query: String::new(),
            search_results: Vec::new(),
            searching: false,
            search_generation: self.search_generation + 1,
            ..self
        };
        let (state, mut effects) = cleared.select_location(location);
        effects.insert(0, Effect::CancelSearch);
        (state, effects)
    }

    fn search_completed(self, generation: u64, results: Vec<Location>) -> (Self, Vec<Effect>) {
        if generation != self.search_generation {
            debug!(
                "Discarding results of superseded search {} (current {})",
                generation, self.search_generation
            );
            return (self, Vec::new());
        }
        (
            Self {
                search_results: results,
                searching: false,
                ..self
            },
            Vec::new(),
        )
    }

    fn select_country(self, country: String) -> (Self, Vec<Effect>) {
        let country = country.trim().to_string();
        if country.is_empty() {
            return (
                Self {
                    selected_country: None,
                    cities: Vec::new(),
                    city_request: self.city_request + 1,
                    ..self
                },
                Vec::new(),
            );
        }
        (
            Self {
                selected_country: Some(country.clone()),
                cities: Vec::new(),
                city_request: self.city_request + 1,
                ..self
            },
            vec![Effect::LoadCities { country }],
        )
    }

    fn select_city(self, city: String) -> (Self, Vec<Effect>) {
        let city = city.trim().to_string();
        let Some(country) = self.selected_country.clone() else {
            debug!("City picked with no country selected");
            return (self, Vec::new());
        };
        if city.is_empty() {
            return (self, Vec::new());
        }
        let request = self.city_request + 1;
        (
            Self {
                city_request: request,
                ..self
            },
            vec![Effect::ResolveCity {
                request,
                country,
                city,
            }],
        )
    }

    fn geolocated(self, request: u64, position: Option<(f64, f64)>) -> (Self, Vec<Effect>) {
        if request != self.device_request {
            debug!("Discarding superseded device position {}", request);
            return (self, Vec::new());
        }
        let located = Self {
            locating: false,
            ..self
        };
        match position.and_then(|(lat, lon)| Location::from_device(lat, lon).ok()) {
            Some(location) => located.select_location(location),
            None => (located, Vec::new()),
        }
    }

    fn weather_loaded(self, ticket: u64, weather: Option<WeatherSnapshot>) -> (Self, Vec<Effect>) {
        if ticket != self.weather_ticket {
            debug!(
                "Discarding weather for superseded ticket {} (current {})",
                ticket, self.weather_ticket
            );
            return (self, Vec::new());
        }
        let weather = weather.or(self.weather.clone());
        (
            Self {
                weather,
                fetching: false,
                ..self
            },
            Vec::new(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn berlin() -> Location {
        Location::try_new("Berlin", Some("Germany".into()), 52.52, 13.41).unwrap()
    }

    fn paris() -> Location {
        Location::try_new("Paris", Some("France".into()), 48.85, 2.35).unwrap()
    }

    fn snapshot(temperature_c: f64, weather_code: i32) -> WeatherSnapshot {
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        WeatherSnapshot {
            temperature_c,
            weather_code,
            apparent_temperature_c: temperature_c,
            hourly_temperatures_c: vec![temperature_c; 24],
            sunrise: day.and_hms_opt(7, 31, 0).unwrap(),
            sunset: day.and_hms_opt(18, 9, 0).unwrap(),
            timezone: "Europe/Berlin".into(),
        }
    }

    fn started() -> AppState {
        AppState::new(berlin(), TemperatureUnit::Celsius, 2).start().0
    }

    #[test]
    fn test_start_fetches_default_location() {
        let (state, effects) = AppState::new(berlin(), TemperatureUnit::Celsius, 2).start();
        assert!(state.loading());
        assert_eq!(
            effects,
            vec![
                Effect::LoadCountries,
                Effect::FetchWeather {
                    ticket: 1,
                    location: berlin()
                }
            ]
        );
    }

    #[test]
    fn test_weather_loaded_clears_loading() {
        let (state, _) = started().apply(Event::WeatherLoaded {
            ticket: 1,
            weather: Some(snapshot(22.0, 0)),
        });
        assert!(!state.loading());
        assert_eq!(state.weather, Some(snapshot(22.0, 0)));
    }

    #[test]
    fn test_failed_fetch_keeps_previous_weather() {
        let (state, _) = started().apply(Event::WeatherLoaded {
            ticket: 1,
            weather: Some(snapshot(22.0, 0)),
        });
        let (state, _) = state.apply(Event::SelectLocation(paris()));
        assert!(state.loading());
        let (state, _) = state.apply(Event::WeatherLoaded {
            ticket: 2,
            weather: None,
        });
        assert!(!state.loading());
        assert_eq!(state.location, paris());
        assert_eq!(state.weather, Some(snapshot(22.0, 0)));
    }

    #[test]
    fn test_stale_weather_is_discarded() {
        let state = started();
        let (state, _) = state.apply(Event::SelectLocation(paris()));
        let (state, _) = state.apply(Event::WeatherLoaded {
            ticket: 2,
            weather: Some(snapshot(15.0, 3)),
        });
        // the Berlin response (ticket 1) resolves last
        let (state, _) = state.apply(Event::WeatherLoaded {
            ticket: 1,
            weather: Some(snapshot(22.0, 0)),
        });
        assert_eq!(state.weather, Some(snapshot(15.0, 3)));
        assert!(!state.loading());
    }

    #[test]
    fn test_toggle_unit_has_no_effects() {
        let (state, effects) = started().apply(Event::ToggleUnit);
        assert_eq!(state.unit, TemperatureUnit::Fahrenheit);
        assert!(effects.is_empty());
        let (state, _) = state.apply(Event::ToggleUnit);
        assert_eq!(state.unit, TemperatureUnit::Celsius);
    }

    #[test]
    fn test_toggle_favorite_twice_restores_set() {
        let (state, _) = started().apply(Event::SelectLocation(paris()));
        let before = state.favorites.clone();
        let (state, _) = state.apply(Event::ToggleFavorite);
        assert!(state.is_favorite());
        assert_eq!(state.favorites, vec![paris()]);
        let (state, _) = state.apply(Event::ToggleFavorite);
        assert!(!state.is_favorite());
        assert_eq!(state.favorites, before);
    }

    #[test]
    fn test_favorites_keep_insertion_order() {
        let state = started();
        let (state, _) = state.apply(Event::ToggleFavorite);
        let (state, _) = state.apply(Event::SelectLocation(paris()));
        let (state, _) = state.apply(Event::ToggleFavorite);
        let names: Vec<_> = state.favorites.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Berlin", "Paris"]);
    }

    #[test]
    fn test_short_query_clears_results_without_search() {
        let (state, effects) = started().apply(Event::SetQuery("Pa".into()));
        assert!(matches!(effects[0], Effect::ScheduleSearch { generation: 1, .. }));
        let (state, _) = state.apply(Event::SearchCompleted {
            generation: 1,
            results: vec![paris()],
        });
        assert_eq!(state.search_results.len(), 1);

        let (state, effects) = state.apply(Event::SetQuery("P".into()));
        assert_eq!(effects, vec![Effect::CancelSearch]);
        assert!(state.search_results.is_empty());
        assert!(!state.searching);
    }

    #[test]
    fn test_superseded_search_results_are_discarded() {
        let (state, _) = started().apply(Event::SetQuery("Lon".into()));
        let (state, effects) = state.apply(Event::SetQuery("London".into()));
        assert_eq!(
            effects,
            vec![Effect::ScheduleSearch {
                generation: 2,
                query: "London".into()
            }]
        );
        let (state, _) = state.apply(Event::SearchCompleted {
            generation: 1,
            results: vec![paris()],
        });
        assert!(state.search_results.is_empty());
        assert!(state.searching);
    }

    #[test]
    fn test_pick_search_result() {
        let (state, _) = started().apply(Event::SetQuery("Par".into()));
        let (state, _) = state.apply(Event::SearchCompleted {
            generation: 1,
            results: vec![paris()],
        });

        let (same, effects) = state.clone().apply(Event::PickSearchResult(3));
        assert_eq!(same, state);
        assert!(effects.is_empty());

        let (state, effects) = state.apply(Event::PickSearchResult(0));
        assert_eq!(state.location, paris());
        assert!(state.query.is_empty());
        assert!(state.search_results.is_empty());
        assert_eq!(
            effects,
            vec![
                Effect::CancelSearch,
                Effect::FetchWeather {
                    ticket: 2,
                    location: paris()
                }
            ]
        );
    }

    /// Request id carried by the single lookup effect in `effects`
    fn request_of(effects: &[Effect]) -> u64 {
        match effects {
            [Effect::ResolveCity { request, .. }] | [Effect::LocateDevice { request }] => *request,
            other => panic!("expected one lookup effect, got {other:?}"),
        }
    }

    #[test]
    fn test_dropdown_flow() {
        let (state, effects) = started().apply(Event::SelectCountry("France".into()));
        assert_eq!(
            effects,
            vec![Effect::LoadCities {
                country: "France".into()
            }]
        );

        // cities for a country that is no longer selected are ignored
        let (state, _) = state.apply(Event::CitiesLoaded {
            country: "Spain".into(),
            cities: vec!["Madrid".into()],
        });
        assert!(state.cities.is_empty());

        let (state, _) = state.apply(Event::CitiesLoaded {
            country: "France".into(),
            cities: vec!["Paris".into(), "Lyon".into()],
        });
        assert_eq!(state.cities.len(), 2);

        let (state, effects) = state.apply(Event::SelectCity("Paris".into()));
        let request = request_of(&effects);
        assert!(matches!(
            &effects[0],
            Effect::ResolveCity { country, city, .. } if country == "France" && city == "Paris"
        ));

        let (state, effects) = state.apply(Event::CityResolved {
            request,
            location: Some(paris()),
        });
        assert_eq!(state.location, paris());
        assert!(matches!(effects[0], Effect::FetchWeather { .. }));

        let (state, _) = state.apply(Event::SelectCountry(String::new()));
        assert!(state.selected_country.is_none());
        assert!(state.cities.is_empty());
    }

    #[test]
    fn test_city_without_country_is_ignored() {
        let (state, effects) = started().apply(Event::SelectCity("Paris".into()));
        assert!(effects.is_empty());
        assert_eq!(state.location, berlin());
    }

    #[test]
    fn test_unresolved_or_stale_city_keeps_location() {
        let (state, _) = started().apply(Event::SelectCountry("France".into()));
        let (state, effects) = state.apply(Event::SelectCity("Paris".into()));
        let paris_request = request_of(&effects);
        let (state, effects) = state.apply(Event::SelectCity("Lyon".into()));
        let lyon_request = request_of(&effects);

        let (state, effects) = state.apply(Event::CityResolved {
            request: paris_request,
            location: Some(paris()),
        });
        assert!(effects.is_empty());
        assert_eq!(state.location, berlin());

        let (state, effects) = state.apply(Event::CityResolved {
            request: lyon_request,
            location: None,
        });
        assert!(effects.is_empty());
        assert_eq!(state.location, berlin());
    }

    #[test]
    fn test_geolocation_denied_keeps_state() {
        let (state, _) = started().apply(Event::WeatherLoaded {
            ticket: 1,
            weather: Some(snapshot(22.0, 0)),
        });
        let (state, effects) = state.apply(Event::UseDeviceLocation);
        assert!(state.loading());
        let request = request_of(&effects);

        let (state, effects) = state.apply(Event::Geolocated {
            request,
            position: None,
        });
        assert!(effects.is_empty());
        assert!(!state.loading());
        assert_eq!(state.location, berlin());
        assert_eq!(state.weather, Some(snapshot(22.0, 0)));
    }

    #[test]
    fn test_geolocation_success_selects_my_location() {
        let (state, effects) = started().apply(Event::UseDeviceLocation);
        let (state, effects) = state.apply(Event::Geolocated {
            request: request_of(&effects),
            position: Some((40.42, -3.70)),
        });
        assert_eq!(state.location.name, "My Location");
        assert!(state.loading());
        assert!(matches!(effects[0], Effect::FetchWeather { ticket: 2, .. }));
    }

    #[test]
    fn test_late_city_does_not_replace_search_pick() {
        let (state, _) = started().apply(Event::SelectCountry("France".into()));
        let (state, effects) = state.apply(Event::SelectCity("Paris".into()));
        let request = request_of(&effects);
        let (state, _) = state.apply(Event::SetQuery("London".into()));
        let london = Location::try_new("London", None, 51.51, -0.13).unwrap();
        let (state, _) = state.apply(Event::SearchCompleted {
            generation: 1,
            results: vec![london.clone()],
        });
        let (state, _) = state.apply(Event::PickSearchResult(0));
        assert_eq!(state.location, london);

        let (state, effects) = state.apply(Event::CityResolved {
            request,
            location: Some(paris()),
        });
        assert!(effects.is_empty());
        assert_eq!(state.location, london);
    }

    #[test]
    fn test_city_from_previous_country_is_ignored() {
        let (state, _) = started().apply(Event::SelectCountry("France".into()));
        let (state, effects) = state.apply(Event::SelectCity("Paris".into()));
        let request = request_of(&effects);
        let (state, _) = state.apply(Event::SelectCountry("Germany".into()));

        let (state, effects) = state.apply(Event::CityResolved {
            request,
            location: Some(paris()),
        });
        assert!(effects.is_empty());
        assert_eq!(state.location, berlin());
    }

    #[test]
    fn test_late_device_position_does_not_replace_manual_pick() {
        let (state, effects) = started().apply(Event::UseDeviceLocation);
        let request = request_of(&effects);
        let (state, _) = state.apply(Event::SelectLocation(paris()));
        assert_eq!(state.location, paris());

        let (state, effects) = state.apply(Event::Geolocated {
            request,
            position: Some((41.9, 12.5)),
        });
        assert!(effects.is_empty());
        assert_eq!(state.location, paris());
    }

    #[test]
    fn test_manual_pick_clears_device_lookup() {
        let (state, _) = started().apply(Event::WeatherLoaded {
            ticket: 1,
            weather: Some(snapshot(22.0, 0)),
        });
        let (state, _) = state.apply(Event::UseDeviceLocation);
        let (state, _) = state.apply(Event::SelectLocation(paris()));
        let (state, _) = state.apply(Event::WeatherLoaded {
            ticket: 2,
            weather: Some(snapshot(15.0, 3)),
        });
        assert!(!state.loading());
    }

    #[test]
    fn test_repeated_device_request_keeps_latest() {
        let (state, effects) = started().apply(Event::UseDeviceLocation);
        let first = request_of(&effects);
        let (state, effects) = state.apply(Event::UseDeviceLocation);
        let second = request_of(&effects);
        assert_ne!(first, second);

        let (state, effects) = state.apply(Event::Geolocated {
            request: first,
            position: Some((41.9, 12.5)),
        });
        assert!(effects.is_empty());
        assert!(state.loading());

        let (state, _) = state.apply(Event::Geolocated {
            request: second,
            position: Some((40.42, -3.70)),
        });
        assert_eq!(state.location.name, "My Location");
        assert!((state.location.latitude - 40.42).abs() < 1e-9);
    }
}
