//! Core library for the `owm-check` conformance suite.
//!
//! This crate defines:
//! - Configuration & credential handling
//! - Request building for the current weather and forecast endpoints
//! - A pluggable HTTP transport and the client on top of it
//! - Response contract validation
//!
//! It is used by `owm-check`, but the client and validator can be reused by
//! any other harness.

pub mod client;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod model;
pub mod request;
pub mod transport;
pub mod validate;

pub use client::{ApiResponse, WeatherClient};
pub use config::ClientConfig;
pub use error::WeatherError;
pub use model::{
    Cod, Endpoint, ErrorResponse, ForecastResponse, LocationQuery, UnitSystem, WeatherResponse,
};
pub use request::{WeatherRequest, WeatherRequestParams};
pub use transport::{RawResponse, ReqwestTransport, Transport, TransportFailure};
pub use validate::ValidationError;
