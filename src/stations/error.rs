use crate::store::error::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocateStationError {
    #[error("Invalid coordinate ({lat}, {lon}): latitude must be in [-90, 90] and longitude in [-180, 180]")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("No valid station candidates remain near ({lat}, {lon})")]
    EmptyCandidateSet { lat: f64, lon: f64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}
