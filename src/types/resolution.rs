//! Result types produced by a nearest-station resolution.

use crate::types::station::StationRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A catalog record annotated with its distance to the query point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredStation {
    pub station: StationRecord,
    /// Geodesic distance in miles, rounded to three decimals.
    pub distance_miles: f64,
}

/// The single-match answer: which station, and how far away it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    #[serde(rename = "USAF")]
    pub usaf: String,
    #[serde(rename = "WBAN")]
    pub wban: String,
    pub distance_miles: f64,
}

impl ResolutionResult {
    pub fn new(usaf: impl Into<String>, wban: impl Into<String>, distance_miles: f64) -> Self {
        Self {
            usaf: usaf.into(),
            wban: wban.into(),
            distance_miles,
        }
    }
}

/// Why a list of stations cannot form a [`Resolution`].
#[derive(Debug, Error, PartialEq)]
pub enum InvalidResolution {
    #[error("A resolution needs at least one station")]
    Empty,

    #[error("Tied stations must share one distance, found {first} and {other} miles")]
    MixedDistances { first: f64, other: f64 },
}

/// Every station tied for the minimum rounded distance to a query point.
///
/// The matches are never empty and are ordered by `(USAF, WBAN)` ascending,
/// which is also the rule used to pick the single-match answer. Serialized as
/// the plain list of tied stations; deserializing checks both rules again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ScoredStation>", into = "Vec<ScoredStation>")]
pub struct Resolution {
    matches: Vec<ScoredStation>,
}

impl Resolution {
    /// Wraps a tied set. Callers guarantee it is non-empty; the set is sorted here.
    pub(crate) fn from_tied(mut matches: Vec<ScoredStation>) -> Self {
        matches.sort_by(|a, b| {
            a.station
                .usaf
                .cmp(&b.station.usaf)
                .then_with(|| a.station.wban.cmp(&b.station.wban))
        });
        Self { matches }
    }

    /// Multi-match view: all tied stations.
    pub fn tied(&self) -> &[ScoredStation] {
        &self.matches
    }

    /// Consumes the resolution, returning all tied stations.
    pub fn into_tied(self) -> Vec<ScoredStation> {
        self.matches
    }

    /// Whether more than one station shares the minimum distance.
    pub fn is_tie(&self) -> bool {
        self.matches.len() > 1
    }

    /// The shared minimum distance in miles.
    pub fn distance_miles(&self) -> f64 {
        self.matches[0].distance_miles
    }

    /// Single-match view: the lexicographically smallest `(USAF, WBAN)` of the tied set.
    pub fn single(&self) -> ResolutionResult {
        let best = &self.matches[0];
        ResolutionResult::new(
            best.station.usaf.clone(),
            best.station.wban.clone(),
            best.distance_miles,
        )
    }
}

impl TryFrom<Vec<ScoredStation>> for Resolution {
    type Error = InvalidResolution;

    fn try_from(matches: Vec<ScoredStation>) -> Result<Self, Self::Error> {
        let first = matches.first().ok_or(InvalidResolution::Empty)?.distance_miles;
        if let Some(other) = matches.iter().map(|s| s.distance_miles).find(|d| *d != first) {
            return Err(InvalidResolution::MixedDistances { first, other });
        }
        Ok(Self::from_tied(matches))
    }
}

impl From<Resolution> for Vec<ScoredStation> {
    fn from(resolution: Resolution) -> Self {
        resolution.matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(usaf: &str, wban: &str, distance_miles: f64) -> ScoredStation {
        ScoredStation {
            station: StationRecord::new(usaf, wban, 40.0, -100.0),
            distance_miles,
        }
    }

    #[test]
    fn test_empty_list_is_rejected() {
        assert_eq!(Resolution::try_from(Vec::<ScoredStation>::new()).unwrap_err(), InvalidResolution::Empty);
        assert!(serde_json::from_str::<Resolution>("[]").is_err());
        assert!(serde_json::from_str::<Resolution>(r#"{"matches":[]}"#).is_err());
    }

    #[test]
    fn test_mixed_distances_are_rejected() {
        let err = Resolution::try_from(vec![
            scored("720001", "00001", 1.5),
            scored("720002", "00002", 2.0),
        ])
        .unwrap_err();
        assert_eq!(err, InvalidResolution::MixedDistances { first: 1.5, other: 2.0 });
    }

    #[test]
    fn test_json_keeps_tie_order() {
        let resolution = Resolution::try_from(vec![
            scored("720002", "00002", 0.0),
            scored("720001", "00003", 0.0),
        ])
        .unwrap();

        let json = serde_json::to_string(&resolution).unwrap();
        let parsed: Resolution = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, resolution);
        assert_eq!(parsed.single().usaf, "720001");
        assert_eq!(parsed.distance_miles(), 0.0);
    }
}
