//! Exact distance refinement and removal of placeholder stations.

use crate::types::resolution::ScoredStation;
use crate::types::station::{LatLon, StationRecord};
use haversine::{distance, Location as HaversineLocation, Units};

/// Great-circle distance in miles between two points, rounded to three decimals.
///
/// This is the spherical haversine distance on a 3960 mile earth radius, not
/// an ellipsoidal (WGS-84) geodesic. The two differ by up to about 0.3%, so
/// rounded distances, and therefore ties, can differ from an ellipsoidal
/// calculation. One degree of longitude on the equator is 69.115 miles here
/// against 69.172 on WGS-84.
pub fn distance_miles(from: LatLon, to: LatLon) -> f64 {
    let miles = distance(
        HaversineLocation {
            latitude: from.lat(),
            longitude: from.lon(),
        },
        HaversineLocation {
            latitude: to.lat(),
            longitude: to.lon(),
        },
        Units::Miles,
    );
    round_miles(miles)
}

fn round_miles(miles: f64) -> f64 {
    (miles * 1000.0).round() / 1000.0
}

/// Annotates each candidate with its rounded distance to `point`.
///
/// Candidates without both coordinates are dropped. Ties between stations are
/// decided on the rounded value.
pub fn refine_distances(candidates: Vec<StationRecord>, point: LatLon) -> Vec<ScoredStation> {
    candidates
        .into_iter()
        .filter_map(|station| {
            let location = station.location()?;
            Some(ScoredStation {
                distance_miles: distance_miles(location, point),
                station,
            })
        })
        .collect()
}

/// Drops placeholder entries (USAF `999999`, WBAN `99999`, USAF starting with `A`).
pub fn drop_placeholders(scored: Vec<ScoredStation>) -> Vec<ScoredStation> {
    scored
        .into_iter()
        .filter(|s| !s.station.is_placeholder())
        .collect()
}
