use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, error};

use crate::{
    config::{ClientConfig, ENV_API_KEY},
    error::{WeatherError, truncate_body},
    model::{ErrorResponse, LocationQuery, UnitSystem},
    request::WeatherRequest,
    transport::{ReqwestTransport, Transport},
};

/// A successful (2xx) response with its JSON body left untyped so that the
/// validator can check field types exactly as the server sent them.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub url: String,
    pub status: u16,
    pub body: Value,
    pub elapsed: Duration,
}

impl ApiResponse {
    /// Decode the body into one of the typed models.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, WeatherError> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

/// Client for the `/weather` and `/forecast` endpoints.
///
/// Read-only after construction; clones share the transport and are safe to
/// use from concurrent tasks.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    base_url: String,
    api_key: String,
    detailed_logging: bool,
    transport: Arc<dyn Transport>,
}

impl WeatherClient {
    /// Build a client with the default `reqwest` transport.
    ///
    /// Fails immediately when the credential is missing or blank.
    pub fn new(config: &ClientConfig) -> Result<Self, WeatherError> {
        let transport = ReqwestTransport::new(Duration::from_millis(config.timeout_ms))
            .map_err(|e| WeatherError::Config(format!("Failed to create HTTP client: {e}")))?;

        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, WeatherError> {
        let api_key = config.api_key().ok_or_else(|| {
            WeatherError::Config(format!(
                "Missing API key. Set {ENV_API_KEY} or run `owm-check configure`."
            ))
        })?;

        let base_url = config.base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(WeatherError::Config("Base URL must not be empty".to_string()));
        }

        Ok(Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            detailed_logging: config.detailed_logging,
            transport,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one GET. No retry; non-2xx and transport failures are returned
    /// unmodified as [`WeatherError::Api`] / [`WeatherError::Transport`].
    pub async fn send(&self, request: &WeatherRequest) -> Result<ApiResponse, WeatherError> {
        let url = format!("{}{}", self.base_url, request.endpoint.path());
        let params = request.params(&self.api_key);

        debug!("Making request to: GET {url}?{}", params.redacted());

        let started = Instant::now();
        let raw = self.transport.get(&url, params.as_pairs()).await.map_err(|failure| {
            error!(
                location = %request.location,
                timed_out = failure.timed_out,
                "Request to {url} failed without a response: {}",
                failure.message
            );
            WeatherError::Transport {
                url: url.clone(),
                message: failure.message,
                timed_out: failure.timed_out,
            }
        })?;
        let elapsed = started.elapsed();
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        debug!(elapsed_ms, "Response received: {} from {url}", raw.status);
        if self.detailed_logging {
            debug!(body = %truncate_body(&raw.body), "Response body from {url}");
        }

        if !(200..300).contains(&raw.status) {
            let body = serde_json::from_str::<ErrorResponse>(&raw.body).ok();
            error!(
                location = %request.location,
                "Response error: {} - {}",
                raw.status,
                body.as_ref().map(|b| b.message.as_str()).unwrap_or("<no error body>")
            );
            return Err(WeatherError::Api { url, status: raw.status, body, raw_body: raw.body });
        }

        let body: Value = serde_json::from_str(&raw.body)?;

        Ok(ApiResponse { url, status: raw.status, body, elapsed })
    }

    pub async fn current_weather(
        &self,
        location: LocationQuery,
        units: UnitSystem,
    ) -> Result<ApiResponse, WeatherError> {
        self.send(&WeatherRequest::current(location).units(units)).await
    }

    pub async fn forecast(
        &self,
        location: LocationQuery,
        units: UnitSystem,
    ) -> Result<ApiResponse, WeatherError> {
        self.send(&WeatherRequest::forecast(location).units(units)).await
    }

    pub async fn current_weather_by_city(
        &self,
        city: &str,
        country: Option<&str>,
        units: UnitSystem,
    ) -> Result<ApiResponse, WeatherError> {
        self.current_weather(place(city, country), units).await
    }

    pub async fn current_weather_by_coordinates(
        &self,
        lat: f64,
        lon: f64,
        units: UnitSystem,
    ) -> Result<ApiResponse, WeatherError> {
        self.current_weather(LocationQuery::coordinates(lat, lon), units).await
    }

    pub async fn current_weather_by_city_id(
        &self,
        id: u64,
        units: UnitSystem,
    ) -> Result<ApiResponse, WeatherError> {
        self.current_weather(LocationQuery::city_id(id), units).await
    }

    pub async fn forecast_by_city(
        &self,
        city: &str,
        country: Option<&str>,
        units: UnitSystem,
    ) -> Result<ApiResponse, WeatherError> {
        self.forecast(place(city, country), units).await
    }

    pub async fn forecast_by_coordinates(
        &self,
        lat: f64,
        lon: f64,
        units: UnitSystem,
    ) -> Result<ApiResponse, WeatherError> {
        self.forecast(LocationQuery::coordinates(lat, lon), units).await
    }
}

fn place(city: &str, country: Option<&str>) -> LocationQuery {
    LocationQuery::Place { place: city.to_string(), country: country.map(str::to_string) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_fails_at_construction() {
        let err = WeatherClient::new(&ClientConfig::default()).unwrap_err();
        assert!(matches!(err, WeatherError::Config(_)));
        assert!(err.to_string().contains("OPENWEATHER_API_KEY"));
    }

    #[test]
    fn blank_api_key_fails_at_construction() {
        let err = WeatherClient::new(&ClientConfig::with_api_key("  ")).unwrap_err();
        assert!(matches!(err, WeatherError::Config(_)));
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let cfg = ClientConfig { base_url: " / ".into(), ..ClientConfig::with_api_key("KEY") };
        let err = WeatherClient::new(&cfg).unwrap_err();
        assert!(err.to_string().contains("Base URL"));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let cfg = ClientConfig {
            base_url: "https://example.test/data/2.5/".into(),
            ..ClientConfig::with_api_key("KEY")
        };
        let client = WeatherClient::new(&cfg).unwrap();
        assert_eq!(client.base_url(), "https://example.test/data/2.5");
    }

    #[test]
    fn response_decodes_into_typed_model() {
        let response = ApiResponse {
            url: "u".into(),
            status: 200,
            body: serde_json::json!({"cod": "404", "message": "city not found"}),
            elapsed: Duration::ZERO,
        };
        let body: ErrorResponse = response.json().unwrap();
        assert_eq!(body.message, "city not found");
    }
}
