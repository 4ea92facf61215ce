//! Single-point resolution: candidate selection, distance refinement,
//! placeholder filtering and minimum selection composed for one query point.

use crate::stations::candidates::{select_candidates, DEFAULT_CANDIDATE_LIMIT};
use crate::stations::error::LocateStationError;
use crate::stations::refine::{drop_placeholders, refine_distances};
use crate::store::StationStore;
use crate::types::resolution::{Resolution, ScoredStation};
use crate::types::station::{LatLon, STALENESS_DAYS};
use bon::Builder;
use chrono::{Local, NaiveDate};
use log::debug;

/// Knobs for a resolution call.
///
/// # Examples
///
/// ```
/// use isd_locator::ResolveOptions;
///
/// let options = ResolveOptions::builder().active_only(false).build();
/// assert_eq!(options.candidate_limit, 100);
/// assert!(!options.active_only);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
pub struct ResolveOptions {
    /// Only consider stations that reported within the staleness window. Defaults to `true`.
    #[builder(default = true)]
    pub active_only: bool,
    /// How many planar-nearest stations to refine. Defaults to `100`.
    #[builder(default = DEFAULT_CANDIDATE_LIMIT)]
    pub candidate_limit: usize,
    /// The day activity is measured against. Defaults to today (local time).
    #[builder(default = Local::now().date_naive())]
    pub reference_date: NaiveDate,
    /// Length of the staleness window in days. Defaults to `14`.
    #[builder(default = STALENESS_DAYS)]
    pub staleness_days: i64,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ResolveOptions {
    fn activity_filter(&self) -> Option<(NaiveDate, i64)> {
        self.active_only
            .then_some((self.reference_date, self.staleness_days))
    }
}

/// Fails with [`LocateStationError::InvalidCoordinate`] unless `point` is within range.
pub fn validate_point(point: LatLon) -> Result<(), LocateStationError> {
    if point.is_valid() {
        Ok(())
    } else {
        Err(LocateStationError::InvalidCoordinate {
            lat: point.lat(),
            lon: point.lon(),
        })
    }
}

/// Keeps every station whose rounded distance equals the minimum.
///
/// # Errors
///
/// Returns [`LocateStationError::EmptyCandidateSet`] when `scored` is empty.
pub fn select_minimum(
    scored: Vec<ScoredStation>,
    point: LatLon,
) -> Result<Resolution, LocateStationError> {
    let Some(min) = scored
        .iter()
        .map(|s| s.distance_miles)
        .min_by(|a, b| a.total_cmp(b))
    else {
        return Err(LocateStationError::EmptyCandidateSet {
            lat: point.lat(),
            lon: point.lon(),
        });
    };

    let tied: Vec<ScoredStation> = scored
        .into_iter()
        .filter(|s| s.distance_miles == min)
        .collect();
    Ok(Resolution::from_tied(tied))
}

/// Finds the nearest non-placeholder station(s) to `point`.
///
/// The returned [`Resolution`] holds every station tied at the minimum rounded
/// distance; use [`Resolution::single`] for one deterministic answer.
///
/// # Errors
///
/// * [`LocateStationError::InvalidCoordinate`] if `point` is out of range.
/// * [`LocateStationError::EmptyCandidateSet`] if no candidate survives filtering.
/// * [`LocateStationError::Store`] if the store query fails.
///
/// # Examples
///
/// ```
/// use isd_locator::{resolve_point, LatLon, MemoryStore, ResolveOptions, StationRecord};
///
/// let store = MemoryStore::from_records(vec![
///     StationRecord::new("727930", "24233", 47.6062, -122.3321),
///     StationRecord::new("727935", "24234", 47.4502, -122.3088),
/// ]).unwrap();
/// let options = ResolveOptions::builder().active_only(false).build();
///
/// let result = resolve_point(&store, LatLon(47.6519, -122.3434), &options).unwrap().single();
/// assert_eq!(result.usaf, "727930");
/// ```
pub fn resolve_point<S: StationStore + ?Sized>(
    store: &S,
    point: LatLon,
    options: &ResolveOptions,
) -> Result<Resolution, LocateStationError> {
    validate_point(point)?;

    let candidates = select_candidates(
        store,
        point,
        options.candidate_limit,
        options.activity_filter(),
    )?;
    let scored = drop_placeholders(refine_distances(candidates, point));
    let resolution = select_minimum(scored, point)?;

    debug!(
        "Resolved ({}, {}) to {} station(s) at {} miles",
        point.lat(),
        point.lon(),
        resolution.tied().len(),
        resolution.distance_miles()
    );
    Ok(resolution)
}
