//! Geocoding client error types.

use std::sync::Arc;

/// Errors from the geocoding client.
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    /// Empty or oversized place name.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Result limit out of range (must be 1-40).
    #[error("invalid limit: must be 1-40")]
    InvalidLimit,

    /// Coordinate outside the valid latitude/longitude range.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// The service refused the request rate.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for GeocodeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { GeocodeError::Timeout } else { GeocodeError::Network(Arc::new(err)) }
    }
}

impl From<GeocodeError> for mapcache_core::Error {
    fn from(err: GeocodeError) -> Self {
        match err {
            GeocodeError::InvalidQuery(_) | GeocodeError::InvalidLimit | GeocodeError::InvalidCoordinate(_) => {
                mapcache_core::Error::InvalidInput(err.to_string())
            }
            other => mapcache_core::Error::GeocodeFailed(other.to_string()),
        }
    }
}
