//! Client behaviour against a local mock server and a recording transport.

use async_trait::async_trait;
use httpmock::prelude::*;
use owm_core::{
    ClientConfig, ForecastResponse, LocationQuery, RawResponse, Transport, TransportFailure,
    UnitSystem, WeatherClient, WeatherError, WeatherRequest, WeatherResponse,
    fixtures::{TEST_CITIES, sample_error_body, sample_forecast_body, sample_weather_body},
    validate::{
        ErrorCheck, validate_error_response, validate_error_status_in,
        validate_forecast_response, validate_weather_response,
    },
};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

const KEY: &str = "TEST_KEY";

fn client_for(server: &MockServer) -> WeatherClient {
    let cfg = ClientConfig { base_url: server.url("/data/2.5"), ..ClientConfig::with_api_key(KEY) };
    WeatherClient::new(&cfg).expect("client should build")
}

#[tokio::test]
async fn current_weather_by_city_and_country() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/data/2.5/weather")
                .query_param("q", "London,GB")
                .query_param("units", "metric")
                .query_param("appid", KEY);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(sample_weather_body());
        })
        .await;

    let response = client_for(&server)
        .current_weather_by_city("London", Some("GB"), UnitSystem::Metric)
        .await
        .unwrap();

    mock.assert_async().await;
    validate_weather_response(&response).unwrap();

    let weather: WeatherResponse = response.json().unwrap();
    assert_eq!(weather.name, "London");
    assert_eq!(weather.sys.and_then(|s| s.country).as_deref(), Some("GB"));
}

#[tokio::test]
async fn current_weather_by_coordinates_and_id() {
    let server = MockServer::start_async().await;
    let by_coords = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/data/2.5/weather")
                .query_param("lat", "51.5074")
                .query_param("lon", "-0.1278")
                .query_param("units", "imperial")
                .query_param("appid", KEY);
            then.status(200).json_body(sample_weather_body());
        })
        .await;
    let by_id = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/data/2.5/weather")
                .query_param("id", "2643743")
                .query_param("units", "standard");
            then.status(200).json_body(sample_weather_body());
        })
        .await;

    let client = client_for(&server);
    client.current_weather_by_coordinates(51.5074, -0.1278, UnitSystem::Imperial).await.unwrap();
    client.current_weather_by_city_id(2_643_743, UnitSystem::Standard).await.unwrap();

    by_coords.assert_async().await;
    by_id.assert_async().await;
}

#[tokio::test]
async fn forecast_by_city_validates() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/data/2.5/forecast").query_param("q", "London");
            then.status(200).json_body(sample_forecast_body(40));
        })
        .await;

    let response =
        client_for(&server).forecast_by_city("London", None, UnitSystem::Metric).await.unwrap();

    mock.assert_async().await;
    let report = validate_forecast_response(&response).unwrap();
    assert_eq!(report.entries, 40);
    assert!(report.is_clean());

    let forecast: ForecastResponse = response.json().unwrap();
    assert_eq!(forecast.cod, "200");
    assert_eq!(forecast.city.name, "London");
}

#[tokio::test]
async fn unknown_city_surfaces_structured_404() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path("/data/2.5/weather").query_param("q", "NonExistentCity1234567890");
            then.status(404).json_body(sample_error_body(404, "city not found"));
        })
        .await;

    let err = client_for(&server)
        .current_weather(LocationQuery::place("NonExistentCity1234567890"), UnitSystem::Metric)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(err.error_body().map(|b| b.message.as_str()), Some("city not found"));
    assert_eq!(validate_error_response(&err, 404).unwrap(), ErrorCheck::Verified);
}

#[tokio::test]
async fn invalid_coordinates_surface_400() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path("/data/2.5/forecast").query_param("lat", "999").query_param("lon", "999");
            then.status(400).json_body(sample_error_body(400, "wrong latitude"));
        })
        .await;

    let err = client_for(&server)
        .forecast_by_coordinates(999.0, 999.0, UnitSystem::Metric)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    validate_error_response(&err, 400).unwrap();
}

#[tokio::test]
async fn empty_place_is_sent_and_rejected_remotely() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.path("/data/2.5/forecast").query_param("q", "");
            then.status(400).json_body(sample_error_body(400, "Nothing to geocode"));
        })
        .await;

    let err =
        client_for(&server).forecast_by_city("", None, UnitSystem::Metric).await.unwrap_err();

    mock.assert_async().await;
    assert_eq!(validate_error_status_in(&err, &[400, 404]).unwrap(), 400);
}

#[tokio::test]
async fn non_json_error_body_is_kept_raw() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path("/data/2.5/weather");
            then.status(502).body("Bad Gateway");
        })
        .await;

    let err = client_for(&server)
        .current_weather(LocationQuery::place("Paris"), UnitSystem::Metric)
        .await
        .unwrap_err();

    match &err {
        WeatherError::Api { status, body, raw_body, .. } => {
            assert_eq!(*status, 502);
            assert!(body.is_none());
            assert_eq!(raw_body, "Bad Gateway");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert_eq!(validate_error_response(&err, 502).unwrap(), ErrorCheck::NoBody);
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path("/data/2.5/weather");
            then.status(200).body("not json");
        })
        .await;

    let err = client_for(&server)
        .current_weather(LocationQuery::place("Paris"), UnitSystem::Metric)
        .await
        .unwrap_err();

    assert!(matches!(err, WeatherError::Decode(_)));
}

#[tokio::test]
async fn connection_failure_is_a_transport_error() {
    let cfg = ClientConfig {
        base_url: "http://127.0.0.1:1".into(),
        timeout_ms: 2_000,
        ..ClientConfig::with_api_key(KEY)
    };
    let err = WeatherClient::new(&cfg)
        .unwrap()
        .current_weather(LocationQuery::place("London"), UnitSystem::Metric)
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert_eq!(err.status(), None);
    assert_eq!(validate_error_response(&err, 404).unwrap(), ErrorCheck::NoResponse);
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path("/data/2.5/weather");
            then.status(200).delay(Duration::from_millis(800)).json_body(sample_weather_body());
        })
        .await;

    let cfg = ClientConfig {
        base_url: server.url("/data/2.5"),
        timeout_ms: 100,
        ..ClientConfig::with_api_key(KEY)
    };
    let err = WeatherClient::new(&cfg)
        .unwrap()
        .current_weather(LocationQuery::place("London"), UnitSystem::Metric)
        .await
        .unwrap_err();

    assert!(matches!(err, WeatherError::Transport { timed_out: true, .. }), "{err:?}");
}

#[derive(Debug, Default)]
struct RecordingTransport {
    calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<RawResponse, TransportFailure> {
        self.calls.lock().unwrap().push((url.to_string(), query.to_vec()));
        Ok(RawResponse { status: 200, body: sample_weather_body().to_string() })
    }
}

#[tokio::test]
async fn extras_never_override_credential_or_units() {
    let transport = Arc::new(RecordingTransport::default());
    let cfg = ClientConfig {
        base_url: "https://example.test/data/2.5/".into(),
        ..ClientConfig::with_api_key(KEY)
    };
    let client = WeatherClient::with_transport(&cfg, transport.clone()).unwrap();

    let request = WeatherRequest::forecast(LocationQuery::place_in("Paris", "FR"))
        .units(UnitSystem::Imperial)
        .param("appid", "OTHER")
        .param("units", "standard")
        .param("cnt", "8");
    client.send(&request).await.unwrap();

    let calls = transport.calls.lock().unwrap();
    let (url, query) = &calls[0];
    assert_eq!(url, "https://example.test/data/2.5/forecast");

    let pairs: Vec<(&str, &str)> = query.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    assert_eq!(
        pairs,
        [("q", "Paris,FR"), ("units", "imperial"), ("cnt", "8"), ("appid", KEY)]
    );
}

#[tokio::test]
async fn cloned_client_serves_parallel_requests() {
    let transport = Arc::new(RecordingTransport::default());
    let client = WeatherClient::with_transport(&ClientConfig::with_api_key(KEY), transport.clone())
        .unwrap();

    let mut tasks = tokio::task::JoinSet::new();
    for city in TEST_CITIES {
        let client = client.clone();
        tasks.spawn(async move {
            client.current_weather_by_city(city.name, Some(city.country), UnitSystem::Metric).await
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap().unwrap();
    }

    let calls = transport.calls.lock().unwrap();
    assert_eq!(calls.len(), TEST_CITIES.len());
    for city in TEST_CITIES {
        let q = format!("{},{}", city.name, city.country);
        assert!(calls.iter().any(|(_, query)| query.contains(&("q".to_string(), q.clone()))));
    }
}
