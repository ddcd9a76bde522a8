//! geocode tool implementation.
//!
//! Looks up a place name and ranks the candidates, preferring water features
//! near an optional origin.

use crate::error::ToolError;
use crate::tools::json_result;
use mapcache_client::geocode::{Coordinate, GeocodeClient, GeocodeRequest, ScoredCandidate};
use mapcache_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the geocode tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeocodeParams {
    /// Place name to look up.
    pub q: String,

    /// Maximum number of candidates to request (1-40, default 10).
    pub limit: Option<u8>,

    /// Origin latitude for proximity scoring. Requires `lon`.
    pub lat: Option<f64>,

    /// Origin longitude for proximity scoring. Requires `lat`.
    pub lon: Option<f64>,
}

impl GeocodeParams {
    fn origin(&self) -> Result<Option<Coordinate>, ToolError> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Ok(Some(Coordinate { lat, lon })),
            (None, None) => Ok(None),
            _ => Err(ToolError::InvalidInput("lat and lon must be given together".to_string())),
        }
    }
}

/// Output from the geocode tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeocodeOutput {
    pub query: String,
    pub best: Option<ScoredCandidate>,
    pub candidates: Vec<ScoredCandidate>,
}

pub async fn geocode_impl(client: &GeocodeClient, params: GeocodeParams) -> Result<CallToolResult, McpError> {
    let near = params.origin()?;
    let request = GeocodeRequest { q: params.q, limit: params.limit, near };

    let candidates = client.search_scored(&request).await.map_err(Error::from)?;
    let output = GeocodeOutput { query: request.q, best: candidates.first().cloned(), candidates };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapcache_client::GeocodeConfig;

    fn client() -> GeocodeClient {
        GeocodeClient::new(GeocodeConfig::default()).unwrap()
    }

    #[test]
    fn test_origin_pairing() {
        let p = GeocodeParams { q: "lake".into(), limit: None, lat: Some(1.0), lon: Some(2.0) };
        assert_eq!(p.origin().unwrap(), Some(Coordinate { lat: 1.0, lon: 2.0 }));

        let p = GeocodeParams { q: "lake".into(), limit: None, lat: None, lon: None };
        assert_eq!(p.origin().unwrap(), None);

        let p = GeocodeParams { q: "lake".into(), limit: None, lat: Some(1.0), lon: None };
        assert!(p.origin().is_err());
    }

    #[tokio::test]
    async fn test_half_origin_rejected() {
        let params = GeocodeParams { q: "lake".into(), limit: None, lat: None, lon: Some(3.0) };
        let err = geocode_impl(&client(), params).await.unwrap_err();
        assert_eq!(err.code, rmcp::model::ErrorCode(-32602));
    }

    #[tokio::test]
    async fn test_empty_query_rejected_before_network() {
        let params = GeocodeParams { q: "".into(), limit: None, lat: None, lon: None };
        let err = geocode_impl(&client(), params).await.unwrap_err();
        assert_eq!(err.code, rmcp::model::ErrorCode(-32602));
    }
}
