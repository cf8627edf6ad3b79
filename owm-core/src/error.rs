use thiserror::Error;

use crate::model::ErrorResponse;

/// Failures produced by [`crate::WeatherClient`].
///
/// Transport and remote errors are forwarded as-is; callers branch on the
/// variant rather than on message text.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Missing or blank credential, unusable base URL. Raised at construction.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No response was received (DNS, connect, timeout).
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String, timed_out: bool },

    /// The server answered with a non-2xx status.
    #[error("OpenWeather request to {url} failed with status {status}: {}", describe_body(.body, .raw_body))]
    Api {
        url: String,
        status: u16,
        /// Parsed error payload, when the body matched the error schema.
        body: Option<ErrorResponse>,
        raw_body: String,
    },

    /// A 2xx body could not be decoded.
    #[error("Failed to decode OpenWeather response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl WeatherError {
    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            WeatherError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn error_body(&self) -> Option<&ErrorResponse> {
        match self {
            WeatherError::Api { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, WeatherError::Transport { .. })
    }
}

fn describe_body(body: &Option<ErrorResponse>, raw: &str) -> String {
    match body {
        Some(err) => err.message.clone(),
        None => truncate_body(raw),
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Cod;

    #[test]
    fn api_error_message_prefers_parsed_body() {
        let err = WeatherError::Api {
            url: "http://x/weather".into(),
            status: 404,
            body: Some(ErrorResponse { cod: Cod::Text("404".into()), message: "city not found".into() }),
            raw_body: "{}".into(),
        };
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("city not found"));
    }

    #[test]
    fn transport_error_has_no_status() {
        let err = WeatherError::Transport {
            url: "http://x".into(),
            message: "connection refused".into(),
            timed_out: false,
        };
        assert_eq!(err.status(), None);
        assert!(err.is_transport());
        assert!(err.error_body().is_none());
    }

    #[test]
    fn truncate_long_bodies() {
        let body = "é".repeat(150);
        let out = truncate_body(&body);
        assert!(out.ends_with("..."));
        assert!(out.len() <= 203);
    }
}
