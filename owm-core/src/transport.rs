use async_trait::async_trait;
use reqwest::{
    Client,
    header::{CONTENT_TYPE, HeaderMap, HeaderValue},
};
use std::{fmt::Debug, time::Duration};

pub const USER_AGENT: &str = "OpenWeatherMap-Test-Suite/1.0";

/// Status and body of a completed HTTP exchange, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// No response was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub message: String,
    pub timed_out: bool,
}

/// HTTP GET seam. The client owns parameter building; a transport only moves bytes.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<RawResponse, TransportFailure>;
}

/// Default transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<RawResponse, TransportFailure> {
        let res = self.http.get(url).query(query).send().await.map_err(failure)?;

        let status = res.status().as_u16();
        let body = res.text().await.map_err(failure)?;

        Ok(RawResponse { status, body })
    }
}

fn failure(err: reqwest::Error) -> TransportFailure {
    TransportFailure { timed_out: err.is_timeout(), message: err.to_string() }
}
