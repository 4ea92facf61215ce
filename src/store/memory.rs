use crate::stations::candidates::nearest_by_planar;
use crate::store::error::StoreError;
use crate::store::StationStore;
use crate::types::station::{LatLon, StationRecord};
use chrono::NaiveDate;
use std::collections::HashSet;

/// An in-memory arena of station records.
///
/// Queries scan every record; no spatial index is kept between calls.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<StationRecord>,
    keys: HashSet<(String, String)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from records, rejecting duplicate keys.
    pub fn from_records(records: Vec<StationRecord>) -> Result<Self, StoreError> {
        let mut store = Self::new();
        store.insert_many(&records)?;
        Ok(store)
    }

    pub fn records(&self) -> &[StationRecord] {
        &self.records
    }

    pub(crate) fn into_records(self) -> Vec<StationRecord> {
        self.records
    }
}

impl StationStore for MemoryStore {
    fn select_nearest(&self, point: LatLon, limit: usize) -> Result<Vec<StationRecord>, StoreError> {
        Ok(nearest_by_planar(&self.records, point, limit)
            .into_iter()
            .cloned()
            .collect())
    }

    fn latest_end_date(&self) -> Result<Option<NaiveDate>, StoreError> {
        Ok(self.records.iter().filter_map(|r| r.end).max())
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.records.clear();
        self.keys.clear();
        Ok(())
    }

    fn insert_many(&mut self, records: &[StationRecord]) -> Result<usize, StoreError> {
        let mut new_keys = HashSet::with_capacity(records.len());
        for record in records {
            let key = (record.usaf.clone(), record.wban.clone());
            if self.keys.contains(&key) || !new_keys.insert(key) {
                return Err(StoreError::DuplicateKey {
                    usaf: record.usaf.clone(),
                    wban: record.wban.clone(),
                });
            }
        }

        self.keys.extend(new_keys);
        self.records.extend_from_slice(records);
        Ok(records.len())
    }
}
