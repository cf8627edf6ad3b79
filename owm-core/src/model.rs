use serde::{Deserialize, Serialize};
use std::fmt;

/// Where to look up the weather. Exactly one addressing mode per request.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    /// Place name, optionally qualified by a country code (`q=London,GB`).
    Place { place: String, country: Option<String> },
    Coordinates { lat: f64, lon: f64 },
    /// OpenWeatherMap numeric city identifier.
    CityId(u64),
}

impl LocationQuery {
    pub fn place(place: impl Into<String>) -> Self {
        LocationQuery::Place { place: place.into(), country: None }
    }

    pub fn place_in(place: impl Into<String>, country: impl Into<String>) -> Self {
        LocationQuery::Place { place: place.into(), country: Some(country.into()) }
    }

    pub fn coordinates(lat: f64, lon: f64) -> Self {
        LocationQuery::Coordinates { lat, lon }
    }

    pub fn city_id(id: u64) -> Self {
        LocationQuery::CityId(id)
    }
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationQuery::Place { place, country: Some(country) } => {
                write!(f, "{place},{country}")
            }
            LocationQuery::Place { place, country: None } => f.write_str(place),
            LocationQuery::Coordinates { lat, lon } => write!(f, "({lat}, {lon})"),
            LocationQuery::CityId(id) => write!(f, "city #{id}"),
        }
    }
}

/// Measurement convention applied by the remote API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl UnitSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
            UnitSystem::Standard => "standard",
        }
    }

    pub const fn all() -> &'static [UnitSystem] {
        &[UnitSystem::Metric, UnitSystem::Imperial, UnitSystem::Standard]
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two supported API endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    CurrentWeather,
    Forecast,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::CurrentWeather => "/weather",
            Endpoint::Forecast => "/forecast",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: i64,
    pub main: String,
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainMetrics {
    pub temp: f64,
    #[serde(default)]
    pub feels_like: Option<f64>,
    pub pressure: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sys {
    #[serde(default)]
    pub country: Option<String>,
}

/// `/weather` body. `cod` is numeric on this endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResponse {
    pub coord: Coord,
    pub weather: Vec<Condition>,
    pub main: MainMetrics,
    pub name: String,
    pub cod: i64,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub dt: Option<i64>,
    #[serde(default)]
    pub sys: Option<Sys>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub dt: i64,
    pub main: MainMetrics,
    pub weather: Vec<Condition>,
    pub dt_txt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
    pub coord: Coord,
    #[serde(default)]
    pub country: Option<String>,
}

/// `/forecast` body. `cod` is a string (`"200"`) on this endpoint; the
/// upstream API is inconsistent and this mirrors it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub cod: String,
    #[serde(default)]
    pub cnt: Option<u32>,
    pub list: Vec<ForecastEntry>,
    pub city: City,
}

/// Error `cod` arrives as either a number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cod {
    Number(i64),
    Text(String),
}

impl Cod {
    /// Numeric coercion; `None` when the text is not a number.
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Cod::Number(n) => Some(*n),
            Cod::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Structured error body returned on non-2xx responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub cod: Cod,
    pub message: String,
}
