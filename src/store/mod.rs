//! The station store: the catalog of ISD station records that resolution reads from.
//!
//! Resolution depends only on the [`StationStore`] trait. Two implementations ship
//! with the crate: [`MemoryStore`](memory::MemoryStore), a plain arena of records,
//! and [`FileStore`](file_store::FileStore), which persists that arena to disk.
//!
//! The store is read-only while a resolution runs. Refreshing replaces the whole
//! catalog and must never run concurrently with resolution; nothing here locks.

pub mod error;
pub mod file_store;
pub mod memory;

use crate::store::error::StoreError;
use crate::types::station::{activity_cutoff, LatLon, StationRecord};
use chrono::NaiveDate;
use log::{error, info};

/// Maximum number of records written by a single insert.
pub const CHUNK_SIZE: usize = 10_000;

/// Freshness of a store, derived from the most recent END date it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    /// The store holds no records with an END date (or no records at all).
    Empty,
    /// At least one station reported after the staleness cutoff.
    Fresh { latest: NaiveDate },
    /// Even the freshest END date is on or before the staleness cutoff.
    Stale { latest: NaiveDate, cutoff: NaiveDate },
}

impl StoreStatus {
    /// Classifies a store by its freshest END date.
    pub fn from_latest(
        latest: Option<NaiveDate>,
        reference_date: NaiveDate,
        staleness_days: i64,
    ) -> Self {
        let cutoff = activity_cutoff(reference_date, staleness_days);
        match latest {
            None => StoreStatus::Empty,
            Some(latest) if latest > cutoff => StoreStatus::Fresh { latest },
            Some(latest) => StoreStatus::Stale { latest, cutoff },
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, StoreStatus::Fresh { .. })
    }
}

/// Read and bulk-replace access to a station catalog.
pub trait StationStore {
    /// Returns up to `limit` records with known coordinates, ordered ascending by
    /// squared planar distance (in degrees) to `point`.
    fn select_nearest(&self, point: LatLon, limit: usize) -> Result<Vec<StationRecord>, StoreError>;

    /// The most recent END date in the catalog.
    fn latest_end_date(&self) -> Result<Option<NaiveDate>, StoreError>;

    /// Number of records in the catalog.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every record.
    fn clear(&mut self) -> Result<(), StoreError>;

    /// Inserts a batch of records. The batch is all-or-nothing: a duplicate
    /// `(USAF, WBAN)` key, against the store or within the batch, rejects all of it.
    fn insert_many(&mut self, records: &[StationRecord]) -> Result<usize, StoreError>;

    /// Replaces the whole catalog, inserting in chunks of [`CHUNK_SIZE`].
    ///
    /// Chunks are independent: when one fails, the chunks before it stay inserted
    /// and the error is returned.
    fn replace(&mut self, records: &[StationRecord]) -> Result<usize, StoreError> {
        self.clear()?;
        let mut inserted = 0;
        for chunk in records.chunks(CHUNK_SIZE) {
            match self.insert_many(chunk) {
                Ok(count) => {
                    info!("{} stations added to store", count);
                    inserted += count;
                }
                Err(e) => {
                    error!("Records not inserted: {}", e);
                    return Err(e);
                }
            }
        }
        info!("All {} stations added", inserted);
        Ok(inserted)
    }

    /// Freshness of the catalog relative to `reference_date`.
    fn status(&self, reference_date: NaiveDate, staleness_days: i64) -> Result<StoreStatus, StoreError> {
        Ok(StoreStatus::from_latest(
            self.latest_end_date()?,
            reference_date,
            staleness_days,
        ))
    }
}
