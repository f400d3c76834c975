//! Widget controller
//!
//! Owns the single [`AppState`] and runs the [`Effect`]s it asks for as
//! background tasks. Every task reports back through one channel, so state
//! is only ever changed here, one event at a time.

pub mod state;

pub use state::{AppState, Effect, Event};

use crate::Result;
use crate::api::{ApiClient, Geocoder, OpenMeteoGeocoder};
use crate::config::{CitycastConfig, DirectorySource};
use crate::debounce::Debouncer;
use crate::directory::{CityDirectory, RemoteCityDirectory, StaticCityDirectory};
use crate::geolocation::Geolocator;
use crate::location_resolver::LocationResolver;
use crate::models::Location;
use crate::weather::{ForecastProvider, OpenMeteoForecast};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// The remote collaborators the controller talks to
#[derive(Clone)]
pub struct Services {
    pub geocoder: Arc<dyn Geocoder>,
    pub forecast: Arc<dyn ForecastProvider>,
    pub directory: Arc<dyn CityDirectory>,
    pub geolocator: Arc<dyn Geolocator>,
}

impl Services {
    /// Open-Meteo clients plus the configured directory source
    pub fn from_config(config: &CitycastConfig, geolocator: Arc<dyn Geolocator>) -> Result<Self> {
        let api = ApiClient::new(&config.api)?;
        let geocoder: Arc<dyn Geocoder> =
            Arc::new(OpenMeteoGeocoder::new(api.clone(), &config.api.geocoding_url));
        let forecast = Arc::new(OpenMeteoForecast::new(api.clone(), &config.api.forecast_url));
        let directory: Arc<dyn CityDirectory> = match config.directory.source {
            DirectorySource::Remote => Arc::new(RemoteCityDirectory::new(
                api,
                &config.api.directory_url,
                Arc::clone(&geocoder),
            )),
            DirectorySource::Static => Arc::new(StaticCityDirectory),
        };
        Ok(Self {
            geocoder,
            forecast,
            directory,
            geolocator,
        })
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

/// A finished background task. Debounced searches are not tracked since
/// they may be aborted before reporting.
#[derive(Debug)]
struct Completion {
    event: Event,
    tracked: bool,
}

#[derive(Debug)]
pub struct Controller {
    state: AppState,
    services: Services,
    min_query_chars: usize,
    result_limit: u32,
    debouncer: Debouncer,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    outstanding: usize,
}

impl Controller {
    /// Controller for `location`, not yet started
    pub fn new(config: &CitycastConfig, location: Location, services: Services) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: AppState::new(
                location,
                config.defaults.unit,
                config.search.min_query_chars,
            ),
            services,
            min_query_chars: config.search.min_query_chars,
            result_limit: config.search.result_limit,
            debouncer: Debouncer::new(config.search.debounce()),
            tx,
            rx,
            outstanding: 0,
        }
    }

    /// Kick off the initial country list and weather loads
    pub fn start(&mut self) {
        let (state, effects) = self.state.clone().start();
        self.state = state;
        self.run_effects(effects);
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Apply a user event and start whatever work it implies
    pub fn dispatch(&mut self, event: Event) {
        debug!("Dispatching {:?}", event);
        let (state, effects) = self.state.clone().apply(event);
        self.state = state;
        self.run_effects(effects);
    }

    /// Whether any background work can still report back
    pub fn is_busy(&self) -> bool {
        self.outstanding > 0 || self.state.searching
    }

    /// Wait for the next background result and apply it.
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn process_next(&mut self) -> Option<Event> {
        if !self.is_busy() {
            return None;
        }
        let completion = self.rx.recv().await?;
        if completion.tracked {
            self.outstanding = self.outstanding.saturating_sub(1);
        }
        let (state, effects) = self.state.clone().apply(completion.event.clone());
        self.state = state;
        self.run_effects(effects);
        Some(completion.event)
    }

    /// Process results until no background work is left
    pub async fn settle(&mut self) {
        while self.process_next().await.is_some() {}
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.run_effect(effect);
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::LoadCountries => {
                let directory = Arc::clone(&self.services.directory);
                self.spawn_tracked(async move {
                    let countries = directory.countries().await.unwrap_or_else(|e| {
                        warn!("Failed to load countries: {}", e);
                        Vec::new()
                    });
                    Event::CountriesLoaded(countries)
                });
            }
            Effect::ScheduleSearch { generation, query } => {
                let geocoder = Arc::clone(&self.services.geocoder);
                let tx = self.tx.clone();
                let (min_chars, limit) = (self.min_query_chars, self.result_limit);
                self.debouncer.schedule(async move {
                    let results = LocationResolver::search(geocoder.as_ref(), &query, min_chars, limit)
                        .await
                        .unwrap_or_else(|e| {
                            warn!("Search for '{}' failed: {}", query, e);
                            Vec::new()
                        });
                    let _ = tx.send(Completion {
                        event: Event::SearchCompleted {
                            generation,
                            results,
                        },
                        tracked: false,
                    });
                });
            }
            Effect::CancelSearch => self.debouncer.cancel(),
            Effect::LoadCities { country } => {
                let directory = Arc::clone(&self.services.directory);
                self.spawn_tracked(async move {
                    let cities = directory.cities(&country).await.unwrap_or_else(|e| {
                        warn!("Failed to load cities of {}: {}", country, e);
                        Vec::new()
                    });
                    Event::CitiesLoaded { country, cities }
                });
            }
            Effect::ResolveCity {
                request,
                country,
                city,
            } => {
                let directory = Arc::clone(&self.services.directory);
                self.spawn_tracked(async move {
                    let location = directory
                        .resolve_city(&country, &city)
                        .await
                        .unwrap_or_else(|e| {
                            warn!("Failed to resolve {}, {}: {}", city, country, e);
                            None
                        });
                    Event::CityResolved { request, location }
                });
            }
            Effect::LocateDevice { request } => {
                let geolocator = Arc::clone(&self.services.geolocator);
                self.spawn_tracked(async move {
                    let position = geolocator
                        .current_position()
                        .await
                        .inspect_err(|e| warn!("Device location unavailable: {}", e))
                        .ok();
                    Event::Geolocated { request, position }
                });
            }
            Effect::FetchWeather { ticket, location } => {
                let forecast = Arc::clone(&self.services.forecast);
                self.spawn_tracked(async move {
                    let weather = forecast
                        .fetch(&location)
                        .await
                        .inspect_err(|e| warn!("Weather fetch for {} failed: {}", location.name, e))
                        .ok();
                    Event::WeatherLoaded { ticket, weather }
                });
            }
        }
    }

    fn spawn_tracked<F>(&mut self, task: F)
    where
        F: Future<Output = Event> + Send + 'static,
    {
        self.outstanding += 1;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = task.await;
            let _ = tx.send(Completion {
                event,
                tracked: true,
            });
        });
    }
}
