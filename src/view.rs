//! Presentation values derived from an [`AppState`]
//!
//! Everything here is a pure function of the state; rendering a frame never
//! touches the network or mutates anything.

use crate::controller::AppState;
use crate::models::{HOURLY_WINDOW, TemperatureUnit};
use chrono::NaiveDateTime;
use std::fmt;

/// Horizontal step between sparkline points
pub const SPARKLINE_STEP: f64 = 8.6;
/// Baseline of the sparkline drawing area
pub const SPARKLINE_BASELINE: f64 = 40.0;
/// Padding below the coldest hour
pub const SPARKLINE_PADDING: f64 = 5.0;

const BAR_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Icon category for a WMO weather code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherIcon {
    Clear,
    Cloudy,
    Rain,
    Snow,
    Thunderstorm,
    DefaultCloud,
}

impl WeatherIcon {
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1..=3 => Self::Cloudy,
            51..=67 => Self::Rain,
            71..=77 => Self::Snow,
            95.. => Self::Thunderstorm,
            _ => Self::DefaultCloud,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Cloudy => "cloudy",
            Self::Rain => "rain",
            Self::Snow => "snow",
            Self::Thunderstorm => "thunderstorm",
            Self::DefaultCloud => "cloud",
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Self::Clear => "☀️",
            Self::Cloudy => "⛅",
            Self::Rain => "🌧️",
            Self::Snow => "❄️",
            Self::Thunderstorm => "⛈️",
            Self::DefaultCloud => "☁️",
        }
    }
}

/// Suggestion shown under the current conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityTip {
    Rain,
    Heat,
    Cold,
    Clear,
}

impl ActivityTip {
    /// Pick a tip for `temperature_c` and `code`; precipitation wins over temperature
    #[must_use]
    pub fn select(temperature_c: f64, code: i32) -> Self {
        if code >= 51 {
            Self::Rain
        } else if temperature_c > 28.0 {
            Self::Heat
        } else if temperature_c < 10.0 {
            Self::Cold
        } else {
            Self::Clear
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            Self::Rain => "Rainy vibes: Perfect for indoor productivity.",
            Self::Heat => "Heat alert: Stay hydrated and find some shade!",
            Self::Cold => "Chilly out there: Bundle up before heading out.",
            Self::Clear => "Weather is clear: Perfect for a light walk or run!",
        }
    }
}

/// Colour theme of the card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accent {
    Warm,
    Cool,
}

impl Accent {
    #[must_use]
    pub fn for_temperature(temperature_c: f64) -> Self {
        if temperature_c > 25.0 { Self::Warm } else { Self::Cool }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Warm => "warm",
            Self::Cool => "cool",
        }
    }
}

/// `"22°"` style label in the given unit
#[must_use]
pub fn format_temperature(celsius: f64, unit: TemperatureUnit) -> String {
    format!("{}°", unit.display_degrees(celsius))
}

/// Local wall-clock time as `HH:MM`
#[must_use]
pub fn format_clock(time: NaiveDateTime) -> String {
    time.format("%H:%M").to_string()
}

/// Sparkline coordinates for the first 24 hourly temperatures.
///
/// `x = i * 8.6`, `y = 40 - (t - (min - 5))`, so the coldest hour sits at
/// `y = 35` and warmer hours rise towards the top.
#[must_use]
pub fn sparkline_points(temperatures: &[f64]) -> Vec<(f64, f64)> {
    let window = &temperatures[..temperatures.len().min(HOURLY_WINDOW)];
    let Some(min) = window.iter().copied().reduce(f64::min) else {
        return Vec::new();
    };
    window
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let x = i as f64 * SPARKLINE_STEP;
            let y = SPARKLINE_BASELINE - (t - (min - SPARKLINE_PADDING));
            (x, y)
        })
        .collect()
}

/// Points formatted for an SVG `polyline` (`"x,y x,y ..."`)
#[must_use]
pub fn sparkline_svg_points(temperatures: &[f64]) -> String {
    sparkline_points(temperatures)
        .iter()
        .map(|(x, y)| format!("{x:.1},{y:.1}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Terminal rendition of the same window using block glyphs
#[must_use]
pub fn sparkline_bars(temperatures: &[f64]) -> String {
    let window = &temperatures[..temperatures.len().min(HOURLY_WINDOW)];
    let (Some(min), Some(max)) = (
        window.iter().copied().reduce(f64::min),
        window.iter().copied().reduce(f64::max),
    ) else {
        return String::new();
    };
    let span = max - min;
    let top = (BAR_GLYPHS.len() - 1) as f64;
    window
        .iter()
        .map(|t| {
            let level = if span > 0.0 { ((t - min) / span * top).round() } else { 0.0 };
            BAR_GLYPHS[(level as usize).min(BAR_GLYPHS.len() - 1)]
        })
        .collect()
}

/// What the weather card displays
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherView {
    pub location: String,
    pub temperature: String,
    pub feels_like: String,
    pub unit: TemperatureUnit,
    pub icon: WeatherIcon,
    pub tip: ActivityTip,
    pub sunrise: String,
    pub sunset: String,
    pub sparkline: String,
    pub bars: String,
    pub favorite: bool,
    pub loading: bool,
    pub accent: Accent,
}

impl WeatherView {
    /// Card contents, or `None` while no weather has been loaded yet
    #[must_use]
    pub fn derive(state: &AppState) -> Option<Self> {
        let weather = state.weather.as_ref()?;
        Some(Self {
            location: state.location.label(),
            temperature: format_temperature(weather.temperature_c, state.unit),
            feels_like: format_temperature(weather.apparent_temperature_c, state.unit),
            unit: state.unit,
            icon: WeatherIcon::from_code(weather.weather_code),
            tip: ActivityTip::select(weather.temperature_c, weather.weather_code),
            sunrise: format_clock(weather.sunrise),
            sunset: format_clock(weather.sunset),
            sparkline: sparkline_svg_points(&weather.hourly_temperatures_c),
            bars: sparkline_bars(&weather.hourly_temperatures_c),
            favorite: state.is_favorite(),
            loading: state.loading(),
            accent: Accent::for_temperature(weather.temperature_c),
        })
    }
}

impl fmt::Display for WeatherView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.loading {
            return write!(f, "⏳ Loading weather for {}…", self.location);
        }
        let star = if self.favorite { "★" } else { "☆" };
        writeln!(f, "{} {}", star, self.location)?;
        writeln!(
            f,
            "{} {}{} ({}), feels like {}{}",
            self.icon.glyph(),
            self.temperature,
            self.unit.symbol(),
            self.icon.name(),
            self.feels_like,
            self.unit.symbol()
        )?;
        writeln!(f, "🌅 {}  🌇 {}", self.sunrise, self.sunset)?;
        if !self.bars.is_empty() {
            writeln!(f, "24h {}", self.bars)?;
        }
        write!(f, "💡 {}", self.tip.text())
    }
}
