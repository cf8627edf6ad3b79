//! Reference locations used by the conformance suite, and canned response
//! bodies shaped like the live API for offline tests.

use chrono::DateTime;
use serde_json::{Value, json};

/// Place query with a country qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestCity {
    pub name: &'static str,
    pub country: &'static str,
}

/// Named coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestPoint {
    pub label: &'static str,
    pub lat: f64,
    pub lon: f64,
}

pub const TEST_CITIES: [TestCity; 5] = [
    TestCity { name: "London", country: "GB" },
    TestCity { name: "New York", country: "US" },
    TestCity { name: "Tokyo", country: "JP" },
    TestCity { name: "Sydney", country: "AU" },
    TestCity { name: "Paris", country: "FR" },
];

pub const TEST_POINTS: [TestPoint; 4] = [
    TestPoint { label: "London", lat: 51.5074, lon: -0.1278 },
    TestPoint { label: "New York", lat: 40.7128, lon: -74.0060 },
    TestPoint { label: "Rio de Janeiro", lat: -22.9068, lon: -43.1729 },
    TestPoint { label: "Wellington", lat: -41.2866, lon: 174.7756 },
];

/// OpenWeatherMap id for London, GB.
pub const LONDON_CITY_ID: u64 = 2_643_743;

/// A 25-character place name that no geocoder resolves.
pub const NONSENSE_PLACE: &str = "NonExistentCity1234567890";

/// 2024-01-01 00:00:00 UTC.
const SAMPLE_START: i64 = 1_704_067_200;

pub fn sample_weather_body() -> Value {
    json!({
        "coord": { "lon": -0.1257, "lat": 51.5085 },
        "weather": [
            { "id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d" }
        ],
        "base": "stations",
        "main": {
            "temp": 12.3,
            "feels_like": 11.6,
            "temp_min": 10.9,
            "temp_max": 13.4,
            "pressure": 1012,
            "humidity": 81
        },
        "visibility": 10000,
        "wind": { "speed": 4.12, "deg": 250 },
        "dt": SAMPLE_START,
        "sys": { "country": "GB", "sunrise": 1_704_096_300, "sunset": 1_704_124_800 },
        "timezone": 0,
        "id": LONDON_CITY_ID,
        "name": "London",
        "cod": 200
    })
}

/// Forecast body with `entries` items spaced exactly three hours apart.
pub fn sample_forecast_body(entries: usize) -> Value {
    let list: Vec<Value> = (0..entries)
        .map(|i| {
            let dt = SAMPLE_START + 10_800 * i as i64;
            let dt_txt = DateTime::from_timestamp(dt, 0)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();
            json!({
                "dt": dt,
                "main": {
                    "temp": 8.0 + (i % 8) as f64,
                    "feels_like": 6.5,
                    "pressure": 1015,
                    "humidity": 70
                },
                "weather": [
                    { "id": 500, "main": "Rain", "description": "light rain", "icon": "10n" }
                ],
                "dt_txt": dt_txt
            })
        })
        .collect();

    json!({
        "cod": "200",
        "message": 0,
        "cnt": entries,
        "list": list,
        "city": {
            "id": LONDON_CITY_ID,
            "name": "London",
            "coord": { "lat": 51.5085, "lon": -0.1257 },
            "country": "GB"
        }
    })
}

pub fn sample_error_body(cod: u16, message: &str) -> Value {
    json!({ "cod": cod.to_string(), "message": message })
}
