use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeoError {
    #[error("Kakao REST API key is not configured (set JEONSE_KAKAO__API_KEY)")]
    MissingApiKey,
    #[error("address could not be resolved: {0}")]
    UnresolvableAddress(String),
    #[error("no route found: {0}")]
    NoRoute(String),
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl GeoError {
    /// Worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        match self {
            GeoError::Timeout | GeoError::Network(_) => true,
            GeoError::Status(code) => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GeoError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GeoError::Timeout
        } else if e.is_decode() {
            GeoError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            GeoError::Status(status.as_u16())
        } else {
            GeoError::Network(e.to_string())
        }
    }
}
