//! Geocoding request parameters and validation.

use super::GeocodeError;
use super::scoring::Coordinate;
use serde::{Deserialize, Serialize};

/// Maximum number of candidates the service returns per query.
pub const MAX_LIMIT: u8 = 40;

/// A place-name lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeocodeRequest {
    /// Free-form place name (required, max 256 chars).
    pub q: String,

    /// Number of candidates (1-40, default 10).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u8>,

    /// Origin used for proximity scoring; never sent to the service.
    #[serde(skip)]
    pub near: Option<Coordinate>,
}

impl GeocodeRequest {
    pub fn new(q: impl Into<String>) -> Self {
        Self { q: q.into(), ..Default::default() }
    }

    pub fn near(mut self, origin: Coordinate) -> Self {
        self.near = Some(origin);
        self
    }

    pub fn validate(&self) -> Result<(), GeocodeError> {
        let q = self.q.trim();
        if q.is_empty() {
            return Err(GeocodeError::InvalidQuery("query cannot be empty".to_string()));
        }
        if q.chars().count() > 256 {
            return Err(GeocodeError::InvalidQuery(format!("query too long: {} chars (max 256)", q.chars().count())));
        }

        if let Some(limit) = self.limit
            && !(1..=MAX_LIMIT).contains(&limit)
        {
            return Err(GeocodeError::InvalidLimit);
        }

        if let Some(origin) = &self.near
            && !origin.is_valid()
        {
            return Err(GeocodeError::InvalidCoordinate(format!("{},{}", origin.lat, origin.lon)));
        }

        Ok(())
    }

    /// Effective limit (default 10).
    pub fn get_limit(&self) -> u8 {
        self.limit.unwrap_or(10)
    }
}
