//! Projection of a location + unit system + credential into query parameters.

use tracing::warn;

use crate::model::{Endpoint, LocationQuery, UnitSystem};

/// Parameters owned by the request builder. Caller extras never replace these.
pub const RESERVED_PARAMS: [&str; 6] = ["q", "lat", "lon", "id", "units", "appid"];

/// One call against one endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRequest {
    pub endpoint: Endpoint,
    pub location: LocationQuery,
    pub units: UnitSystem,
    /// Additional endpoint options such as `cnt` or `lang`.
    pub extra: Vec<(String, String)>,
}

impl WeatherRequest {
    pub fn new(endpoint: Endpoint, location: LocationQuery) -> Self {
        Self { endpoint, location, units: UnitSystem::default(), extra: Vec::new() }
    }

    pub fn current(location: LocationQuery) -> Self {
        Self::new(Endpoint::CurrentWeather, location)
    }

    pub fn forecast(location: LocationQuery) -> Self {
        Self::new(Endpoint::Forecast, location)
    }

    pub fn units(mut self, units: UnitSystem) -> Self {
        self.units = units;
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    pub fn params(&self, api_key: &str) -> WeatherRequestParams {
        WeatherRequestParams::build(&self.location, self.units, api_key, &self.extra)
    }
}

/// Ordered query parameters: addressing, `units`, extras, then `appid`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WeatherRequestParams {
    pairs: Vec<(String, String)>,
}

impl WeatherRequestParams {
    pub fn build(
        location: &LocationQuery,
        units: UnitSystem,
        api_key: &str,
        extra: &[(String, String)],
    ) -> Self {
        let mut pairs = Vec::with_capacity(4 + extra.len());

        match location {
            LocationQuery::Place { place, country } => {
                let q = match country {
                    Some(country) => format!("{place},{country}"),
                    None => place.clone(),
                };
                pairs.push(("q".to_string(), q));
            }
            LocationQuery::Coordinates { lat, lon } => {
                pairs.push(("lat".to_string(), lat.to_string()));
                pairs.push(("lon".to_string(), lon.to_string()));
            }
            LocationQuery::CityId(id) => {
                pairs.push(("id".to_string(), id.to_string()));
            }
        }

        pairs.push(("units".to_string(), units.as_str().to_string()));

        for (key, value) in extra {
            if RESERVED_PARAMS.contains(&key.as_str()) {
                warn!(param = %key, "Ignoring caller-supplied reserved query parameter");
                continue;
            }
            if pairs.iter().any(|(k, _)| k == key) {
                continue;
            }
            pairs.push((key.clone(), value.clone()));
        }

        pairs.push(("appid".to_string(), api_key.to_string()));

        Self { pairs }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Query string for logs, with the credential masked.
    pub fn redacted(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| if k == "appid" { format!("{k}=***") } else { format!("{k}={v}") })
            .collect::<Vec<_>>()
            .join("&")
    }
}
