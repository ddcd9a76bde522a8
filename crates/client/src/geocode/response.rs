//! Nominatim `jsonv2` response types and normalization.

use serde::{Deserialize, Serialize};

/// One raw place from the search endpoint.
///
/// `jsonv2` names the class field `category`; the older `json` format calls
/// it `class`. Coordinates arrive as strings.
#[derive(Debug, Deserialize)]
pub struct RawPlace {
    #[serde(alias = "class")]
    pub category: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub lat: String,
    pub lon: String,
    pub display_name: String,
    #[serde(default)]
    pub importance: Option<f64>,
}

/// Normalized geocoding candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Candidate {
    pub class: String,
    pub kind: String,
    pub lat: f64,
    pub lon: f64,
    pub display_name: String,
    pub importance: f64,
}

impl TryFrom<RawPlace> for Candidate {
    type Error = String;

    fn try_from(raw: RawPlace) -> Result<Self, Self::Error> {
        let lat: f64 = raw.lat.parse().map_err(|_| format!("bad latitude {:?}", raw.lat))?;
        let lon: f64 = raw.lon.parse().map_err(|_| format!("bad longitude {:?}", raw.lon))?;
        Ok(Candidate {
            class: raw.category,
            kind: raw.kind,
            lat,
            lon,
            display_name: raw.display_name,
            importance: raw.importance.unwrap_or(0.0),
        })
    }
}

/// Decode a response body, dropping places with unparseable coordinates.
pub fn parse_candidates(body: &[u8]) -> Result<Vec<Candidate>, serde_json::Error> {
    let raw: Vec<RawPlace> = serde_json::from_slice(body)?;
    Ok(raw
        .into_iter()
        .filter_map(|place| {
            Candidate::try_from(place)
                .map_err(|e| tracing::debug!("dropping geocode candidate: {e}"))
                .ok()
        })
        .collect())
}
