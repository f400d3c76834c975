//! Citycast CLI
//!
//! One-shot lookups plus an interactive session driving the widget controller.

#![allow(clippy::print_stdout)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use citycast::controller::{AppState, Controller, Event, Services};
use citycast::geolocation::{self, Geolocator};
use citycast::{
    CitycastConfig, CitycastError, LocationParser, LocationResolver, TemperatureUnit, WeatherView,
};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Citycast weather widget
#[derive(Parser)]
#[command(name = "citycast")]
#[command(author, version, about = "City weather lookup", long_about = None)]
struct Cli {
    /// Configuration file (defaults to <config dir>/citycast/config.toml)
    #[arg(short, long, global = true, env = "CITYCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the weather for a place
    ///
    /// Example: citycast weather "Paris"
    /// Example: citycast weather 48.85,2.35 --unit f
    Weather {
        /// Place name or "lat,lon" (the configured default when omitted)
        place: Option<String>,

        /// Display unit (c or f)
        #[arg(short, long)]
        unit: Option<TemperatureUnit>,
    },

    /// List geocoding candidates for a query
    Search {
        query: String,
    },

    /// List the countries of the city directory
    Countries,

    /// List the cities of one country
    Cities {
        country: String,
    },

    /// Show the weather at the device position
    Here {
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        #[arg(short, long)]
        unit: Option<TemperatureUnit>,
    },

    /// Line-driven widget session
    ///
    /// Plain lines are typed into the search box. Commands: /pick N,
    /// /country NAME, /city NAME, /here, /unit, /fav, /favs, /show, /quit
    Interactive {
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },
}

/// Determine log filter level from config and verbosity count
fn log_filter(configured: &str, verbose: u8) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn init_logging(config: &CitycastConfig, verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter(&config.logging.level, verbose)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn geolocator_for(config: &CitycastConfig, lat: Option<f64>, lon: Option<f64>) -> Arc<dyn Geolocator> {
    let position = lat.zip(lon).or_else(|| config.geolocation.position());
    geolocation::from_position(position)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<CitycastError>() {
            Some(error) => {
                debug!("{:?}", error);
                eprintln!("❌ {}", error.user_message());
            }
            None => eprintln!("❌ {e:#}"),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CitycastConfig::load_from_path(cli.config.clone())
        .context("Failed to load configuration")?;
    init_logging(&config, cli.verbose);
    info!("citycast {} starting", citycast::VERSION);

    match cli.command {
        Commands::Weather { place, unit } => {
            let services = Services::from_config(&config, geolocator_for(&config, None, None))?;
            let location = match place {
                Some(place) => {
                    LocationResolver::resolve_location(
                        services.geocoder.as_ref(),
                        LocationParser::parse(&place)?,
                    )
                    .await?
                }
                None => config.defaults.location.clone(),
            };
            let state = AppState::new(
                location,
                unit.unwrap_or(config.defaults.unit),
                config.search.min_query_chars,
            );
            show_weather(&services, state).await?;
        }

        Commands::Search { query } => {
            let services = Services::from_config(&config, geolocator_for(&config, None, None))?;
            let results = LocationResolver::search(
                services.geocoder.as_ref(),
                &query,
                config.search.min_query_chars,
                config.search.result_limit,
            )
            .await?;
            if results.is_empty() {
                println!("No matches for '{query}'");
            }
            for (i, location) in results.iter().enumerate() {
                println!("{i}: {} ({})", location.label(), location.format_coordinates());
            }
        }

        Commands::Countries => {
            let services = Services::from_config(&config, geolocator_for(&config, None, None))?;
            for country in services.directory.countries().await? {
                match country.iso2 {
                    Some(code) => println!("{} [{code}]", country.name),
                    None => println!("{}", country.name),
                }
            }
        }

        Commands::Cities { country } => {
            let services = Services::from_config(&config, geolocator_for(&config, None, None))?;
            for city in services.directory.cities(&country).await? {
                println!("{city}");
            }
        }

        Commands::Here { lat, lon, unit } => {
            let services = Services::from_config(&config, geolocator_for(&config, lat, lon))?;
            let location = LocationResolver::locate_device(services.geolocator.as_ref()).await?;
            let state = AppState::new(
                location,
                unit.unwrap_or(config.defaults.unit),
                config.search.min_query_chars,
            );
            show_weather(&services, state).await?;
        }

        Commands::Interactive { lat, lon } => {
            let services = Services::from_config(&config, geolocator_for(&config, lat, lon))?;
            let mut controller =
                Controller::new(&config, config.defaults.location.clone(), services);
            interactive(&mut controller).await?;
        }
    }

    Ok(())
}

/// Fetch the weather for the state's location and print the card
async fn show_weather(services: &Services, state: AppState) -> anyhow::Result<()> {
    let location = state.location.clone();
    let (state, _) = state.apply(Event::SelectLocation(location));
    let weather = services.forecast.fetch(&state.location).await?;
    let ticket = state.weather_ticket();
    let (state, _) = state.apply(Event::WeatherLoaded {
        ticket,
        weather: Some(weather),
    });
    if let Some(view) = WeatherView::derive(&state) {
        println!("{view}");
    }
    Ok(())
}

/// One line of interactive input
#[derive(Debug, PartialEq)]
enum Input {
    Dispatch(Event),
    Favorites,
    Show,
    Quit,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let Some(command) = line.strip_prefix('/') else {
        return Input::Dispatch(Event::SetQuery(line.to_string()));
    };
    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, arg)| (name, arg.trim()));
    match name {
        "pick" => match arg.parse::<usize>() {
            Ok(index) => Input::Dispatch(Event::PickSearchResult(index)),
            Err(_) => Input::Unknown(line.to_string()),
        },
        "country" => Input::Dispatch(Event::SelectCountry(arg.to_string())),
        "city" => Input::Dispatch(Event::SelectCity(arg.to_string())),
        "here" => Input::Dispatch(Event::UseDeviceLocation),
        "unit" => Input::Dispatch(Event::ToggleUnit),
        "fav" => Input::Dispatch(Event::ToggleFavorite),
        "favs" => Input::Favorites,
        "show" => Input::Show,
        "quit" | "exit" => Input::Quit,
        _ => Input::Unknown(line.to_string()),
    }
}

fn print_card(state: &AppState) {
    match WeatherView::derive(state) {
        Some(view) => println!("{view}\n"),
        None if state.loading() => println!("⏳ Loading weather for {}…", state.location.label()),
        None => println!("No weather for {} yet", state.location.label()),
    }
}

/// Report a background result that changed what the user sees
fn report(event: &Event, state: &AppState) {
    match event {
        Event::WeatherLoaded { .. } => print_card(state),
        Event::SearchCompleted { .. } if !state.searching => {
            if state.search_results.is_empty() {
                println!("No matches for '{}'", state.query.trim());
            }
            for (i, location) in state.search_results.iter().enumerate() {
                println!("  /pick {i}  {}", location.label());
            }
        }
        Event::CountriesLoaded(countries) => {
            println!("{} countries available (/country NAME)", countries.len());
        }
        Event::CitiesLoaded { country, .. } if state.selected_country.as_ref() == Some(country) => {
            println!("Cities in {country}: {}", state.cities.join(", "));
        }
        Event::Geolocated { position: None, .. } => println!("Location unavailable"),
        _ => {}
    }
}

async fn interactive(controller: &mut Controller) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    controller.start();
    println!("Type to search, /quit to leave");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                match parse_input(&line) {
                    Input::Dispatch(event) => {
                        let redraw = matches!(event, Event::ToggleUnit | Event::ToggleFavorite);
                        controller.dispatch(event);
                        if redraw {
                            print_card(controller.state());
                        }
                    }
                    Input::Favorites => {
                        let favorites = &controller.state().favorites;
                        if favorites.is_empty() {
                            println!("No favorites yet (/fav)");
                        }
                        for favorite in favorites {
                            println!("★ {}", favorite.label());
                        }
                    }
                    Input::Show => print_card(controller.state()),
                    Input::Quit => break,
                    Input::Unknown(line) => println!("Unknown command: {line}"),
                }
            }
            Some(event) = controller.process_next(), if controller.is_busy() => {
                report(&event, controller.state());
            }
        }
    }

    Ok(())
}
