//! Candidate ranking for a water-oriented map.
//!
//! score = preference(class, type) + proximity bonus + importance
//!
//! The proximity bonus decays linearly from `proximity_bonus` at the origin
//! to zero at `radius_km`. With an origin, candidates farther than
//! `cutoff_km` are dropped.

use super::response::Candidate;
use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0088;

/// WGS84 point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Great-circle distance in kilometres.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Fixed preference for an OSM class/type pair.
pub fn preference(class: &str, kind: &str) -> f64 {
    match (class, kind) {
        ("natural", "water") => 10.0,
        ("water", _) => 9.0,
        ("waterway", "river") => 9.0,
        ("natural", "bay") => 8.0,
        ("waterway", "canal") => 8.0,
        ("natural", "strait") => 7.0,
        ("leisure", "marina") | ("leisure", "slipway") => 7.0,
        ("waterway", _) => 7.0,
        ("place", "island") | ("place", "islet") => 6.0,
        ("natural", "beach") | ("natural", "spring") => 5.0,
        ("man_made", "pier") => 5.0,
        ("place", _) => 3.0,
        ("boundary", _) => 1.0,
        _ => 2.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringConfig {
    /// Full bonus at the origin, none at this distance.
    pub radius_km: f64,
    /// Candidates beyond this distance are discarded.
    pub cutoff_km: f64,
    pub proximity_bonus: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self::with_radius(50.0)
    }
}

impl ScoringConfig {
    /// Bonus radius `radius_km`, cutoff at four times that.
    pub fn with_radius(radius_km: f64) -> Self {
        Self { radius_km, cutoff_km: radius_km * 4.0, proximity_bonus: 5.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// Score and sort candidates, best first.
pub fn score_candidates(
    candidates: Vec<Candidate>, origin: Option<Coordinate>, config: &ScoringConfig,
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let distance_km = origin.map(|o| haversine_km(o, Coordinate { lat: candidate.lat, lon: candidate.lon }));
            if distance_km.is_some_and(|d| d > config.cutoff_km) {
                return None;
            }

            let bonus = match distance_km {
                Some(d) if d < config.radius_km => config.proximity_bonus * (1.0 - d / config.radius_km),
                _ => 0.0,
            };
            let score = preference(&candidate.class, &candidate.kind) + bonus + candidate.importance;
            Some(ScoredCandidate { candidate, score, distance_km })
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored
}

/// The top-scoring candidate, if any survive the cutoff.
pub fn best_candidate(
    candidates: Vec<Candidate>, origin: Option<Coordinate>, config: &ScoringConfig,
) -> Option<ScoredCandidate> {
    score_candidates(candidates, origin, config).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(class: &str, kind: &str, lat: f64, lon: f64) -> Candidate {
        Candidate {
            class: class.to_string(),
            kind: kind.to_string(),
            lat,
            lon,
            display_name: format!("{class}/{kind}"),
            importance: 0.0,
        }
    }

    #[test]
    fn test_haversine_known_distance() {
        let paris = Coordinate { lat: 48.8566, lon: 2.3522 };
        let london = Coordinate { lat: 51.5074, lon: -0.1278 };
        let d = haversine_km(paris, london);
        assert!((d - 343.5).abs() < 2.0, "got {d}");
        assert_eq!(haversine_km(paris, paris), 0.0);
    }

    #[test]
    fn test_water_preferred_without_origin() {
        let best = best_candidate(
            vec![candidate("place", "town", 0.0, 0.0), candidate("natural", "water", 0.0, 0.0)],
            None,
            &ScoringConfig::default(),
        )
        .unwrap();
        assert_eq!(best.candidate.kind, "water");
        assert_eq!(best.distance_km, None);
    }

    #[test]
    fn test_proximity_bonus_breaks_ties() {
        let origin = Coordinate { lat: 45.0, lon: -122.0 };
        let near = candidate("waterway", "river", 45.01, -122.0);
        let far = candidate("waterway", "river", 45.3, -122.0);

        let scored = score_candidates(vec![far, near], Some(origin), &ScoringConfig::default());
        assert_eq!(scored.len(), 2);
        assert!((scored[0].candidate.lat - 45.01).abs() < 1e-9);
        assert!(scored[0].score > scored[1].score);
    }

    #[test]
    fn test_cutoff_discards_distant() {
        let origin = Coordinate { lat: 45.0, lon: -122.0 };
        let distant = candidate("natural", "water", 10.0, 10.0);
        let config = ScoringConfig::with_radius(50.0);
        assert!(best_candidate(vec![distant], Some(origin), &config).is_none());
    }

    #[test]
    fn test_preference_table() {
        assert!(preference("natural", "water") > preference("place", "island"));
        assert!(preference("waterway", "stream") > preference("place", "city"));
        assert!(preference("leisure", "marina") > preference("highway", "road"));
    }
}
