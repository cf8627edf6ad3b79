//! Live conformance cases against the real API.

use anyhow::{Context, Result, anyhow, bail, ensure};
use clap::ValueEnum;
use owm_core::{
    ApiResponse, ForecastResponse, UnitSystem, WeatherClient, WeatherError, WeatherResponse,
    fixtures::{LONDON_CITY_ID, NONSENSE_PLACE, TEST_CITIES, TEST_POINTS},
    validate::{
        ErrorCheck, MAX_FORECAST_ENTRIES, coords_close, name_matches, validate_error_response,
        validate_error_status_in, validate_forecast_ranges, validate_forecast_response,
        validate_weather_ranges, validate_weather_response,
    },
};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Upper bound for a single current-weather round trip.
const SINGLE_REQUEST_BUDGET: Duration = Duration::from_secs(5);
/// Upper bound for the five-city parallel batch.
const PARALLEL_BATCH_BUDGET: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Group {
    Current,
    Forecast,
    Unhappy,
    Data,
    Performance,
}

impl Group {
    pub fn as_str(&self) -> &'static str {
        match self {
            Group::Current => "current",
            Group::Forecast => "forecast",
            Group::Unhappy => "unhappy",
            Group::Data => "data",
            Group::Performance => "performance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    WeatherByCity,
    WeatherByCityAndCountry,
    WeatherByCoordinates,
    WeatherByCityId,
    WeatherUnitsDiffer,
    ForecastByCity,
    ForecastByCoordinates,
    ForecastIntervals,
    ForecastUnitsDiffer,
    WeatherUnknownCity,
    WeatherInvalidCoordinates,
    WeatherEmptyCity,
    ForecastUnknownCity,
    ForecastInvalidCoordinates,
    ForecastEmptyCity,
    WeatherRanges,
    ForecastRanges,
    SingleRequestLatency,
    ParallelCities,
    SequentialCities,
}

impl Case {
    pub const fn all() -> &'static [Case] {
        &[
            Case::WeatherByCity,
            Case::WeatherByCityAndCountry,
            Case::WeatherByCoordinates,
            Case::WeatherByCityId,
            Case::WeatherUnitsDiffer,
            Case::ForecastByCity,
            Case::ForecastByCoordinates,
            Case::ForecastIntervals,
            Case::ForecastUnitsDiffer,
            Case::WeatherUnknownCity,
            Case::WeatherInvalidCoordinates,
            Case::WeatherEmptyCity,
            Case::ForecastUnknownCity,
            Case::ForecastInvalidCoordinates,
            Case::ForecastEmptyCity,
            Case::WeatherRanges,
            Case::ForecastRanges,
            Case::SingleRequestLatency,
            Case::ParallelCities,
            Case::SequentialCities,
        ]
    }

    pub fn group(&self) -> Group {
        match self {
            Case::WeatherByCity
            | Case::WeatherByCityAndCountry
            | Case::WeatherByCoordinates
            | Case::WeatherByCityId
            | Case::WeatherUnitsDiffer => Group::Current,
            Case::ForecastByCity
            | Case::ForecastByCoordinates
            | Case::ForecastIntervals
            | Case::ForecastUnitsDiffer => Group::Forecast,
            Case::WeatherUnknownCity
            | Case::WeatherInvalidCoordinates
            | Case::WeatherEmptyCity
            | Case::ForecastUnknownCity
            | Case::ForecastInvalidCoordinates
            | Case::ForecastEmptyCity => Group::Unhappy,
            Case::WeatherRanges | Case::ForecastRanges => Group::Data,
            Case::SingleRequestLatency | Case::ParallelCities | Case::SequentialCities => {
                Group::Performance
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Case::WeatherByCity => "current weather by city name",
            Case::WeatherByCityAndCountry => "current weather by city and country",
            Case::WeatherByCoordinates => "current weather by coordinates",
            Case::WeatherByCityId => "current weather by city id",
            Case::WeatherUnitsDiffer => "current weather across unit systems",
            Case::ForecastByCity => "forecast by city name",
            Case::ForecastByCoordinates => "forecast by coordinates",
            Case::ForecastIntervals => "forecast 3-hour intervals",
            Case::ForecastUnitsDiffer => "forecast metric vs imperial",
            Case::WeatherUnknownCity => "current weather for unknown city is 404",
            Case::WeatherInvalidCoordinates => "current weather for invalid coordinates is 400",
            Case::WeatherEmptyCity => "current weather for empty city is 400/404",
            Case::ForecastUnknownCity => "forecast for unknown city is 404",
            Case::ForecastInvalidCoordinates => "forecast for invalid coordinates is 400",
            Case::ForecastEmptyCity => "forecast for empty city is 400/404",
            Case::WeatherRanges => "current weather value ranges",
            Case::ForecastRanges => "forecast value ranges",
            Case::SingleRequestLatency => "single request latency",
            Case::ParallelCities => "five cities in parallel",
            Case::SequentialCities => "city loop",
        }
    }

    pub async fn run(&self, client: &WeatherClient) -> Result<()> {
        match self {
            Case::WeatherByCity => weather_by_city(client).await,
            Case::WeatherByCityAndCountry => weather_by_city_and_country(client).await,
            Case::WeatherByCoordinates => weather_by_coordinates(client).await,
            Case::WeatherByCityId => weather_by_city_id(client).await,
            Case::WeatherUnitsDiffer => weather_units_differ(client).await,
            Case::ForecastByCity => forecast_by_city(client).await,
            Case::ForecastByCoordinates => forecast_by_coordinates(client).await,
            Case::ForecastIntervals => forecast_intervals(client).await,
            Case::ForecastUnitsDiffer => forecast_units_differ(client).await,
            Case::WeatherUnknownCity => {
                let result =
                    client.current_weather_by_city(NONSENSE_PLACE, None, UnitSystem::Metric).await;
                expect_error(&expect_failure(result)?, 404)
            }
            Case::WeatherInvalidCoordinates => {
                let result =
                    client.current_weather_by_coordinates(999.0, 999.0, UnitSystem::Metric).await;
                expect_status(&expect_failure(result)?, &[400])
            }
            Case::WeatherEmptyCity => {
                let result = client.current_weather_by_city("", None, UnitSystem::Metric).await;
                expect_status(&expect_failure(result)?, &[400, 404])
            }
            Case::ForecastUnknownCity => {
                let result = client.forecast_by_city(NONSENSE_PLACE, None, UnitSystem::Metric).await;
                expect_error(&expect_failure(result)?, 404)
            }
            Case::ForecastInvalidCoordinates => {
                let result =
                    client.forecast_by_coordinates(999.0, 999.0, UnitSystem::Metric).await;
                expect_status(&expect_failure(result)?, &[400])
            }
            Case::ForecastEmptyCity => {
                let result = client.forecast_by_city("", None, UnitSystem::Metric).await;
                expect_status(&expect_failure(result)?, &[400, 404])
            }
            Case::WeatherRanges => weather_ranges(client).await,
            Case::ForecastRanges => forecast_ranges(client).await,
            Case::SingleRequestLatency => single_request_latency(client).await,
            Case::ParallelCities => parallel_cities(client).await,
            Case::SequentialCities => sequential_cities(client).await,
        }
    }
}

async fn weather_by_city(client: &WeatherClient) -> Result<()> {
    let response = client.current_weather_by_city("London", None, UnitSystem::Metric).await?;
    let weather = checked_weather(&response)?;
    ensure!(name_matches(&weather.name, "London"), "unexpected location name '{}'", weather.name);
    info!("Current temperature in {}: {}°C", weather.name, weather.main.temp);
    Ok(())
}

async fn weather_by_city_and_country(client: &WeatherClient) -> Result<()> {
    let response = client.current_weather_by_city("London", Some("GB"), UnitSystem::Metric).await?;
    let weather = checked_weather(&response)?;
    ensure!(weather.name == "London", "expected name 'London', got '{}'", weather.name);
    let country = weather.sys.and_then(|s| s.country);
    ensure!(country.as_deref() == Some("GB"), "expected sys.country 'GB', got {country:?}");
    Ok(())
}

async fn weather_by_coordinates(client: &WeatherClient) -> Result<()> {
    for point in TEST_POINTS {
        let response = client
            .current_weather_by_coordinates(point.lat, point.lon, UnitSystem::Metric)
            .await?;
        let weather = checked_weather(&response)?;
        ensure!(
            coords_close(weather.coord, point.lat, point.lon),
            "{}: returned coord {:?} is not within 0.1° of ({}, {})",
            point.label,
            weather.coord,
            point.lat,
            point.lon
        );
    }
    Ok(())
}

async fn weather_by_city_id(client: &WeatherClient) -> Result<()> {
    let response = client.current_weather_by_city_id(LONDON_CITY_ID, UnitSystem::Metric).await?;
    let weather = checked_weather(&response)?;
    ensure!(weather.id == Some(LONDON_CITY_ID), "expected id {LONDON_CITY_ID}, got {:?}", weather.id);
    ensure!(weather.name == "London", "expected name 'London', got '{}'", weather.name);
    Ok(())
}

async fn weather_units_differ(client: &WeatherClient) -> Result<()> {
    let mut seen: Vec<(UnitSystem, WeatherResponse)> = Vec::new();
    for &units in UnitSystem::all() {
        let response = client.current_weather_by_city("London", Some("GB"), units).await?;
        let weather = checked_weather(&response)?;

        for (other_units, other) in &seen {
            ensure!(
                weather.main.temp != other.main.temp,
                "{units} and {other_units} temperatures are both {}",
                weather.main.temp
            );
            ensure!(
                weather.name == other.name && weather.id == other.id,
                "location identity differs across unit systems: {} / {}",
                weather.name,
                other.name
            );
        }
        seen.push((units, weather));
    }
    Ok(())
}

async fn forecast_by_city(client: &WeatherClient) -> Result<()> {
    let response = client.forecast_by_city("London", None, UnitSystem::Metric).await?;
    let forecast = checked_forecast(&response)?;
    ensure!(name_matches(&forecast.city.name, "london"), "unexpected city '{}'", forecast.city.name);
    ensure!(
        forecast.list.len() <= MAX_FORECAST_ENTRIES,
        "{} entries exceeds {MAX_FORECAST_ENTRIES}",
        forecast.list.len()
    );
    Ok(())
}

async fn forecast_by_coordinates(client: &WeatherClient) -> Result<()> {
    let (lat, lon) = (40.7128, -74.0060);
    let response = client.forecast_by_coordinates(lat, lon, UnitSystem::Metric).await?;
    let forecast = checked_forecast(&response)?;
    ensure!(
        coords_close(forecast.city.coord, lat, lon),
        "city coord {:?} is not within 0.1° of ({lat}, {lon})",
        forecast.city.coord
    );
    Ok(())
}

async fn forecast_intervals(client: &WeatherClient) -> Result<()> {
    let response = client.forecast_by_city("Tokyo", None, UnitSystem::Metric).await?;
    let report = validate_forecast_response(&response)?;
    if !report.is_clean() {
        warn!(
            "Tokyo forecast has {} data-quality anomalies across {} entries",
            report.anomalies.len(),
            report.entries
        );
    }
    Ok(())
}

async fn forecast_units_differ(client: &WeatherClient) -> Result<()> {
    let (metric, imperial) = tokio::join!(
        client.forecast_by_city("Paris", Some("FR"), UnitSystem::Metric),
        client.forecast_by_city("Paris", Some("FR"), UnitSystem::Imperial),
    );
    let metric = checked_forecast(&metric?)?;
    let imperial = checked_forecast(&imperial?)?;

    let (m, i) = (&metric.list[0].main, &imperial.list[0].main);
    ensure!(m.temp != i.temp, "metric and imperial temperatures are both {}", m.temp);
    ensure!(metric.city.name == imperial.city.name, "city differs across unit systems");
    Ok(())
}

async fn weather_ranges(client: &WeatherClient) -> Result<()> {
    for city in TEST_CITIES {
        let response = client
            .current_weather_by_city(city.name, Some(city.country), UnitSystem::Metric)
            .await?;
        let weather = checked_weather(&response)?;
        validate_weather_ranges(&weather).with_context(|| city.name)?;
    }
    Ok(())
}

async fn forecast_ranges(client: &WeatherClient) -> Result<()> {
    let response = client.forecast_by_city("Berlin", None, UnitSystem::Metric).await?;
    let forecast = checked_forecast(&response)?;
    validate_forecast_ranges(&forecast)?;
    Ok(())
}

async fn single_request_latency(client: &WeatherClient) -> Result<()> {
    let response = client.current_weather_by_city("London", None, UnitSystem::Metric).await?;
    validate_weather_response(&response)?;
    ensure!(
        response.elapsed < SINGLE_REQUEST_BUDGET,
        "request took {} ms (budget {} ms)",
        response.elapsed.as_millis(),
        SINGLE_REQUEST_BUDGET.as_millis()
    );
    Ok(())
}

async fn parallel_cities(client: &WeatherClient) -> Result<()> {
    let started = Instant::now();
    let mut tasks = JoinSet::new();
    for city in TEST_CITIES {
        let client = client.clone();
        tasks.spawn(async move {
            client
                .current_weather_by_city(city.name, Some(city.country), UnitSystem::Metric)
                .await
                .map_err(|e| anyhow!("{}: {e}", city.name))
        });
    }

    let mut done = 0;
    while let Some(joined) = tasks.join_next().await {
        let response = joined.context("request task panicked")??;
        validate_weather_response(&response)?;
        done += 1;
    }
    let elapsed = started.elapsed();

    info!("Fetched {done} cities in parallel in {} ms", elapsed.as_millis());
    ensure!(
        elapsed < PARALLEL_BATCH_BUDGET,
        "parallel batch took {} ms (budget {} ms)",
        elapsed.as_millis(),
        PARALLEL_BATCH_BUDGET.as_millis()
    );
    Ok(())
}

async fn sequential_cities(client: &WeatherClient) -> Result<()> {
    for city in ["London", "Tokyo", "Paris"] {
        let response = client.current_weather_by_city(city, None, UnitSystem::Metric).await?;
        validate_weather_response(&response).with_context(|| city)?;
        info!("City loop passed for {city} in {} ms", response.elapsed.as_millis());
    }
    Ok(())
}

fn checked_weather(response: &ApiResponse) -> Result<WeatherResponse> {
    validate_weather_response(response)?;
    Ok(response.json()?)
}

fn checked_forecast(response: &ApiResponse) -> Result<ForecastResponse> {
    validate_forecast_response(response)?;
    Ok(response.json()?)
}

fn expect_failure(result: Result<ApiResponse, WeatherError>) -> Result<WeatherError> {
    match result {
        Ok(response) => bail!("Expected request to fail, got status {}", response.status),
        Err(err) => Ok(err),
    }
}

fn expect_error(err: &WeatherError, expected: u16) -> Result<()> {
    if validate_error_response(err, expected)? == ErrorCheck::NoResponse {
        warn!("No response received; error body checks skipped");
    }
    Ok(())
}

fn expect_status(err: &WeatherError, allowed: &[u16]) -> Result<()> {
    validate_error_status_in(err, allowed)?;
    Ok(())
}
