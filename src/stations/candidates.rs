//! Candidate selection: narrows the catalog to the stations closest to a point
//! by squared planar distance in degrees.
//!
//! Planar distance only tracks true distance locally (a degree of longitude
//! shrinks towards the poles), so the candidate cap is a safety margin rather
//! than a guarantee. Keep [`DEFAULT_CANDIDATE_LIMIT`] in step with any change to
//! how candidates are ranked.

use crate::store::error::StoreError;
use crate::store::StationStore;
use crate::types::station::{LatLon, StationRecord};
use chrono::NaiveDate;
use log::debug;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

pub const DEFAULT_CANDIDATE_LIMIT: usize = 100;

/// Squared planar distance in degrees: `(lon - lon_t)^2 + (lat - lat_t)^2`.
pub fn planar_distance_2(location: LatLon, point: LatLon) -> f64 {
    let d_lon = location.lon() - point.lon();
    let d_lat = location.lat() - point.lat();
    d_lon * d_lon + d_lat * d_lat
}

// Heap entry ordered by planar distance, then by position in the input.
struct PlanarCandidate<'a> {
    distance_2: OrderedFloat<f64>,
    position: usize,
    station: &'a StationRecord,
}

impl PartialEq for PlanarCandidate<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for PlanarCandidate<'_> {}
impl PartialOrd for PlanarCandidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for PlanarCandidate<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_2
            .cmp(&other.distance_2)
            .then(self.position.cmp(&other.position))
    }
}

/// Returns up to `limit` stations with known coordinates, nearest first by planar distance.
///
/// Stations missing a latitude or longitude are skipped. Equal distances keep
/// their input order. Fewer than `limit` stations is not an error.
pub fn nearest_by_planar<'a, I>(stations: I, point: LatLon, limit: usize) -> Vec<&'a StationRecord>
where
    I: IntoIterator<Item = &'a StationRecord>,
{
    if limit == 0 {
        return vec![];
    }

    // Max-heap holding the `limit` best candidates seen so far; the worst sits on top.
    let mut heap: BinaryHeap<PlanarCandidate<'a>> = BinaryHeap::with_capacity(limit + 1);

    for (position, station) in stations.into_iter().enumerate() {
        let Some(location) = station.location() else {
            continue;
        };
        let candidate = PlanarCandidate {
            distance_2: OrderedFloat(planar_distance_2(location, point)),
            position,
            station,
        };

        if heap.len() < limit {
            heap.push(candidate);
        } else if heap.peek().is_some_and(|worst| candidate < *worst) {
            heap.pop();
            heap.push(candidate);
        }
    }

    heap.into_sorted_vec().into_iter().map(|c| c.station).collect()
}

/// Selects the resolution candidates for `point` from `store`.
///
/// Takes the `limit` nearest records by planar distance and, when `active_only`
/// is set, drops the ones that are not active on `reference_date`. Inactive
/// stations are dropped from the top `limit` without being replaced by the next
/// nearest ones.
pub fn select_candidates<S: StationStore + ?Sized>(
    store: &S,
    point: LatLon,
    limit: usize,
    active_only: Option<(NaiveDate, i64)>,
) -> Result<Vec<StationRecord>, StoreError> {
    let mut candidates = store.select_nearest(point, limit)?;
    let selected = candidates.len();

    if let Some((reference_date, staleness_days)) = active_only {
        candidates.retain(|station| station.is_active(reference_date, staleness_days));
    }

    debug!(
        "Selected {} candidates ({} after activity filter) near ({}, {})",
        selected,
        candidates.len(),
        point.lat(),
        point.lon()
    );
    Ok(candidates)
}
