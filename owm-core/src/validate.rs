//! Response contract checks for the current weather, forecast and error payloads.
//!
//! Checks run against the raw JSON so that a field with the wrong type is
//! reported as a contract violation instead of a decode failure.

use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::warn;

use crate::{
    client::ApiResponse,
    error::{WeatherError, truncate_body},
    model::{Condition, Coord, ForecastResponse, MainMetrics, WeatherResponse},
};

/// Nominal spacing between forecast entries.
pub const FORECAST_INTERVAL_SECS: i64 = 3 * 3600;
pub const FORECAST_INTERVAL_TOLERANCE_SECS: i64 = 60;
/// Five days of three-hour entries.
pub const MAX_FORECAST_ENTRIES: usize = 40;
pub const COORD_TOLERANCE_DEG: f64 = 0.1;

const DT_TXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The remote service violated its response contract.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{path}: {reason}")]
pub struct ValidationError {
    /// Dotted JSON path of the offending field.
    pub path: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { path: path.into(), reason: reason.into() }
    }
}

/// Deviation the remote service does not guarantee against. Reported, never fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum Anomaly {
    /// Gap between `list[index - 1]` and `list[index]` outside 10800 ± 60 s.
    Spacing { index: usize, gap_secs: i64 },
    /// `dt_txt` does not render `dt` as UTC.
    TimestampText { index: usize, dt: i64, dt_txt: String },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::Spacing { index, gap_secs } => write!(
                f,
                "list[{index}] is {gap_secs}s after the previous entry (expected {FORECAST_INTERVAL_SECS}±{FORECAST_INTERVAL_TOLERANCE_SECS}s)"
            ),
            Anomaly::TimestampText { index, dt, dt_txt } => {
                write!(f, "list[{index}].dt_txt '{dt_txt}' does not match dt {dt}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForecastReport {
    pub entries: usize,
    pub anomalies: Vec<Anomaly>,
}

impl ForecastReport {
    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
    }
}

/// Outcome of a passed error-response check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCheck {
    /// Status, `cod` and `message` all verified.
    Verified,
    /// Status matched but the body was not a JSON object; body checks skipped.
    NoBody,
    /// No response at all; nothing to check.
    NoResponse,
}

/// Current weather contract: status 200, numeric coordinates, non-empty
/// conditions, numeric main metrics, non-empty name and numeric `cod` 200.
pub fn validate_weather_response(response: &ApiResponse) -> Result<(), ValidationError> {
    expect_http_ok(response)?;
    let body = &response.body;

    number(body, "coord.lat")?;
    number(body, "coord.lon")?;
    non_empty_array(body, "weather")?;
    number(body, "main.temp")?;
    number(body, "main.humidity")?;
    number(body, "main.pressure")?;
    non_empty_string(body, "name")?;

    let cod = field(body, "cod")?;
    if cod.as_i64() != Some(200) {
        return Err(ValidationError::new("cod", format!("expected number 200, got {cod}")));
    }

    Ok(())
}

/// Forecast contract. `cod` must be the string `"200"` here, unlike `/weather`.
///
/// Timestamps must strictly increase; spacing and `dt_txt` drift are returned
/// as anomalies.
pub fn validate_forecast_response(response: &ApiResponse) -> Result<ForecastReport, ValidationError> {
    expect_http_ok(response)?;
    let body = &response.body;

    let cod = field(body, "cod")?;
    if cod.as_str() != Some("200") {
        return Err(ValidationError::new("cod", format!("expected string \"200\", got {cod}")));
    }

    let list = non_empty_array(body, "list")?;
    let mut report = ForecastReport { entries: list.len(), anomalies: Vec::new() };
    let mut previous: Option<i64> = None;

    for (index, entry) in list.iter().enumerate() {
        let path = format!("list[{index}]");
        let dt = field(entry, "dt")
            .map_err(|e| prefixed(&path, e))?
            .as_i64()
            .ok_or_else(|| ValidationError::new(format!("{path}.dt"), "expected integer timestamp"))?;
        object(entry, "main").map_err(|e| prefixed(&path, e))?;
        non_empty_array(entry, "weather").map_err(|e| prefixed(&path, e))?;
        let dt_txt = non_empty_string(entry, "dt_txt").map_err(|e| prefixed(&path, e))?;

        if let Some(prev) = previous {
            if dt <= prev {
                return Err(ValidationError::new(
                    format!("{path}.dt"),
                    format!("timestamp {dt} is not after previous {prev}"),
                ));
            }
            let gap_secs = dt - prev;
            if (gap_secs - FORECAST_INTERVAL_SECS).abs() > FORECAST_INTERVAL_TOLERANCE_SECS {
                report.anomalies.push(Anomaly::Spacing { index, gap_secs });
            }
        }
        previous = Some(dt);

        if !dt_txt_matches(dt, dt_txt) {
            report.anomalies.push(Anomaly::TimestampText { index, dt, dt_txt: dt_txt.to_string() });
        }
    }

    non_empty_string(body, "city.name")?;
    number(body, "city.coord.lat")?;
    number(body, "city.coord.lon")?;

    for anomaly in &report.anomalies {
        warn!(url = %response.url, "Forecast data-quality anomaly: {anomaly}");
    }

    Ok(report)
}

/// Error contract: HTTP status equals `expected`; when a structured body is
/// present, `cod` (coerced to a number) equals `expected` and `message` is a
/// non-empty string.
///
/// A failure with no response at all is logged and passes as
/// [`ErrorCheck::NoResponse`].
pub fn validate_error_response(
    error: &WeatherError,
    expected: u16,
) -> Result<ErrorCheck, ValidationError> {
    let (status, body, raw_body) = match error {
        WeatherError::Api { status, body, raw_body, .. } => (*status, body.as_ref(), raw_body),
        WeatherError::Transport { url, message, .. } => {
            warn!("Error has no response ({url}: {message}); skipping body checks");
            return Ok(ErrorCheck::NoResponse);
        }
        other => {
            return Err(ValidationError::new(
                "error",
                format!("expected a remote error with status {expected}, got: {other}"),
            ));
        }
    };

    if status != expected {
        return Err(ValidationError::new("status", format!("expected {expected}, got {status}")));
    }

    let Some(body) = body else {
        // A JSON object that did not parse as {cod, message} breaks the error schema.
        if serde_json::from_str::<Value>(raw_body).is_ok_and(|v| v.is_object()) {
            return Err(ValidationError::new(
                "body",
                format!("expected {{cod, message}}, got {}", truncate_body(raw_body)),
            ));
        }
        warn!(status, "Error response carried no JSON body; skipping body checks");
        return Ok(ErrorCheck::NoBody);
    };

    if body.cod.as_number() != Some(i64::from(expected)) {
        return Err(ValidationError::new("cod", format!("expected {expected}, got {:?}", body.cod)));
    }
    if body.message.is_empty() {
        return Err(ValidationError::new("message", "expected non-empty string"));
    }

    Ok(ErrorCheck::Verified)
}

/// The call must have failed with one of `allowed` statuses.
pub fn validate_error_status_in(error: &WeatherError, allowed: &[u16]) -> Result<u16, ValidationError> {
    match error.status() {
        Some(status) if allowed.contains(&status) => Ok(status),
        Some(status) => Err(ValidationError::new(
            "status",
            format!("expected one of {allowed:?}, got {status}"),
        )),
        None => Err(ValidationError::new("status", format!("no response received: {error}"))),
    }
}

/// Plausibility ranges for metric readings.
pub fn validate_weather_ranges(weather: &WeatherResponse) -> Result<(), ValidationError> {
    check_main("main", &weather.main)?;
    check_conditions("weather", &weather.weather)
}

/// Plausibility ranges for every metric forecast entry, plus the entry cap.
pub fn validate_forecast_ranges(forecast: &ForecastResponse) -> Result<(), ValidationError> {
    if forecast.list.len() > MAX_FORECAST_ENTRIES {
        return Err(ValidationError::new(
            "list",
            format!("{} entries exceeds {MAX_FORECAST_ENTRIES}", forecast.list.len()),
        ));
    }
    for (index, entry) in forecast.list.iter().enumerate() {
        check_main(&format!("list[{index}].main"), &entry.main)?;
        check_conditions(&format!("list[{index}].weather"), &entry.weather)?;
    }
    Ok(())
}

/// Coordinates within [`COORD_TOLERANCE_DEG`] of the requested point.
pub fn coords_close(actual: Coord, lat: f64, lon: f64) -> bool {
    (actual.lat - lat).abs() <= COORD_TOLERANCE_DEG && (actual.lon - lon).abs() <= COORD_TOLERANCE_DEG
}

/// Case-insensitive match of a returned location name against the query.
pub fn name_matches(actual: &str, expected: &str) -> bool {
    actual.to_lowercase().contains(&expected.to_lowercase())
}

fn check_main(path: &str, main: &MainMetrics) -> Result<(), ValidationError> {
    if !(main.temp > -100.0 && main.temp < 70.0) {
        return Err(ValidationError::new(
            format!("{path}.temp"),
            format!("{} is outside (-100, 70)", main.temp),
        ));
    }
    if !(0.0..=100.0).contains(&main.humidity) {
        return Err(ValidationError::new(
            format!("{path}.humidity"),
            format!("{} is outside [0, 100]", main.humidity),
        ));
    }
    Ok(())
}

fn check_conditions(path: &str, conditions: &[Condition]) -> Result<(), ValidationError> {
    if conditions.is_empty() {
        return Err(ValidationError::new(path, "expected at least one condition"));
    }
    for (index, condition) in conditions.iter().enumerate() {
        if condition.main.is_empty() || condition.description.is_empty() {
            return Err(ValidationError::new(
                format!("{path}[{index}]"),
                "condition is missing main or description",
            ));
        }
    }
    Ok(())
}

fn dt_txt_matches(dt: i64, dt_txt: &str) -> bool {
    let Ok(parsed) = NaiveDateTime::parse_from_str(dt_txt, DT_TXT_FORMAT) else {
        return false;
    };
    DateTime::from_timestamp(dt, 0).is_some_and(|utc| utc.naive_utc() == parsed)
}

fn expect_http_ok(response: &ApiResponse) -> Result<(), ValidationError> {
    if response.status != 200 {
        return Err(ValidationError::new("status", format!("expected 200, got {}", response.status)));
    }
    Ok(())
}

fn prefixed(prefix: &str, err: ValidationError) -> ValidationError {
    ValidationError { path: format!("{prefix}.{}", err.path), reason: err.reason }
}

fn field<'a>(value: &'a Value, path: &str) -> Result<&'a Value, ValidationError> {
    path.split('.')
        .try_fold(value, |current, key| current.get(key))
        .filter(|v| !v.is_null())
        .ok_or_else(|| ValidationError::new(path, "missing"))
}

fn number(value: &Value, path: &str) -> Result<f64, ValidationError> {
    let v = field(value, path)?;
    v.as_f64().ok_or_else(|| ValidationError::new(path, format!("expected number, got {v}")))
}

fn object<'a>(value: &'a Value, path: &str) -> Result<&'a Value, ValidationError> {
    let v = field(value, path)?;
    if v.is_object() { Ok(v) } else { Err(ValidationError::new(path, "expected object")) }
}

fn non_empty_array<'a>(value: &'a Value, path: &str) -> Result<&'a Vec<Value>, ValidationError> {
    match field(value, path)?.as_array() {
        Some(items) if !items.is_empty() => Ok(items),
        Some(_) => Err(ValidationError::new(path, "expected non-empty array")),
        None => Err(ValidationError::new(path, "expected array")),
    }
}

fn non_empty_string<'a>(value: &'a Value, path: &str) -> Result<&'a str, ValidationError> {
    match field(value, path)?.as_str() {
        Some(s) if !s.is_empty() => Ok(s),
        Some(_) => Err(ValidationError::new(path, "expected non-empty string")),
        None => Err(ValidationError::new(path, "expected string")),
    }
}
