//! Place-name lookup against a Nominatim-compatible search endpoint.
//!
//! ### Specification
//!
//! - **Endpoint**: `GET {geocoder_url}?q=...&format=jsonv2&limit=...`
//! - **Rate Limiting**: at most one request per second, per the public
//!   Nominatim usage policy. Callers queue rather than fail.
//! - **Identification**: a descriptive `User-Agent` is mandatory.
//! - **Normalization**: raw places become [`Candidate`]s; ranking lives in
//!   [`scoring`] and is applied by the caller.

pub mod error;
pub mod request;
pub mod response;
pub mod scoring;

pub use error::GeocodeError;
pub use request::GeocodeRequest;
pub use response::Candidate;
pub use scoring::{Coordinate, ScoredCandidate, ScoringConfig, best_candidate, haversine_km, score_candidates};

use mapcache_core::AppConfig;
use reqwest::header;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Default search endpoint.
const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "mapcache/0.1";

/// Minimum interval between requests.
const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);

/// Geocoding client configuration.
#[derive(Debug, Clone)]
pub struct GeocodeConfig {
    /// Search endpoint (default: https://nominatim.openstreetmap.org/search).
    pub base_url: String,
    /// Request timeout (default: 10s).
    pub timeout: Duration,
    pub user_agent: String,
    pub scoring: ScoringConfig,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl From<&AppConfig> for GeocodeConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.geocoder_url.clone(),
            user_agent: config.user_agent.clone(),
            scoring: ScoringConfig::with_radius(config.geocode_radius_km),
            ..Default::default()
        }
    }
}

/// Rate limiter to enforce request intervals.
#[derive(Debug)]
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self { last_request: Mutex::new(None), min_interval }
    }

    /// Wait until the interval since the previous request has passed.
    async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Geocoding client.
#[derive(Debug, Clone)]
pub struct GeocodeClient {
    http: reqwest::Client,
    config: GeocodeConfig,
    rate_limiter: Arc<RateLimiter>,
}

impl GeocodeClient {
    pub fn new(config: GeocodeConfig) -> Result<Self, GeocodeError> {
        if config.user_agent.trim().is_empty() {
            return Err(GeocodeError::InvalidQuery("user agent required".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .use_rustls_tls()
            .build()
            .map_err(|e| GeocodeError::Network(Arc::new(e)))?;

        Ok(Self { http, config, rate_limiter: Arc::new(RateLimiter::new(MIN_REQUEST_INTERVAL)) })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, GeocodeError> {
        Self::new(GeocodeConfig::from(config))
    }

    pub fn config(&self) -> &GeocodeConfig {
        &self.config
    }

    /// Look up candidates for a place name, in service order.
    pub async fn search(&self, req: &GeocodeRequest) -> Result<Vec<Candidate>, GeocodeError> {
        req.validate()?;

        self.rate_limiter.acquire().await;

        let start = Instant::now();
        tracing::debug!("geocoding query={}", req.q);

        let limit = req.get_limit().to_string();
        let http_response = self
            .http
            .get(&self.config.base_url)
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, &self.config.user_agent)
            .query(&[("q", req.q.trim()), ("format", "jsonv2"), ("limit", limit.as_str())])
            .send()
            .await?;

        let status = http_response.status();
        if status == 429 {
            return Err(GeocodeError::RateLimited);
        }
        if status.is_client_error() || status.is_server_error() {
            return Err(GeocodeError::HttpError { status: status.as_u16() });
        }

        let bytes = http_response.bytes().await?;
        let candidates = response::parse_candidates(&bytes).map_err(|e| GeocodeError::Parse(e.to_string()))?;

        tracing::debug!("geocode completed in {:?}, {} candidates", start.elapsed(), candidates.len());
        Ok(candidates)
    }

    /// Search and rank against the request's origin.
    pub async fn search_scored(&self, req: &GeocodeRequest) -> Result<Vec<ScoredCandidate>, GeocodeError> {
        let candidates = self.search(req).await?;
        Ok(score_candidates(candidates, req.near, &self.config.scoring))
    }
}
