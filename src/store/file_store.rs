//! A station store persisted as a bincode file.
//!
//! The whole catalog is held in memory while the handle is open. Every
//! successful `clear` or `insert_many` is written back to disk before it
//! returns, so a refresh that fails half way leaves the chunks written so far
//! on disk.

use crate::store::error::StoreError;
use crate::store::memory::MemoryStore;
use crate::store::StationStore;
use crate::types::station::{LatLon, StationRecord};
use bincode::config::{Configuration, Fixint, LittleEndian};
use chrono::NaiveDate;
use log::{debug, info};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const STORE_FILE_NAME: &str = "isd_history.bin";
const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// A handle to a station store file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl FileStore {
    /// Opens an existing store file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Missing`] if the file does not exist, and a
    /// read or decode error if it cannot be loaded.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if !path.is_file() {
            return Err(StoreError::Missing(path));
        }

        let start = std::time::Instant::now();
        let bytes = std::fs::read(&path).map_err(|e| StoreError::FileRead(path.clone(), e))?;
        let (records, _) =
            bincode::serde::decode_from_slice::<Vec<StationRecord>, _>(&bytes, BINCODE_CONFIG)
                .map_err(|e| StoreError::Decode(path.clone(), Box::new(e)))?;
        let inner = MemoryStore::from_records(records)?;
        info!(
            "Loaded {} stations from {} in {:?}",
            inner.len(),
            path.display(),
            start.elapsed()
        );

        Ok(Self { path, inner })
    }

    /// Creates an empty store at `path`, overwriting any existing file.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self {
            path: path.into(),
            inner: MemoryStore::new(),
        };
        store.persist()?;
        Ok(store)
    }

    // An empty handle that is never written to disk; stands in while the real
    // handle is on the blocking pool.
    pub(crate) fn unloaded(path: PathBuf) -> Self {
        Self {
            path,
            inner: MemoryStore::new(),
        }
    }

    /// Opens the store at `path`, creating an empty one if it does not exist.
    pub fn open_or_create(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        match Self::open(path) {
            Err(StoreError::Missing(path)) => Self::create(path),
            other => other,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[StationRecord] {
        self.inner.records()
    }

    /// Writes the store to disk and releases the handle.
    pub fn close(self) -> Result<Vec<StationRecord>, StoreError> {
        self.persist()?;
        Ok(self.inner.into_records())
    }

    fn persist(&self) -> Result<(), StoreError> {
        let data = bincode::serde::encode_to_vec(self.inner.records(), BINCODE_CONFIG)
            .map_err(|e| StoreError::Encode(Box::new(e)))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let write_err = |e| StoreError::FileWrite(self.path.clone(), e);

        // Write next to the target and rename, so readers never see a partial file.
        let mut temp = NamedTempFile::new_in(&dir).map_err(write_err)?;
        temp.write_all(&data).map_err(write_err)?;
        temp.flush().map_err(write_err)?;
        temp.persist(&self.path)
            .map_err(|e| StoreError::FileWrite(self.path.clone(), e.error))?;

        debug!("Wrote {} bytes to {}", data.len(), self.path.display());
        Ok(())
    }
}

impl StationStore for FileStore {
    fn select_nearest(&self, point: LatLon, limit: usize) -> Result<Vec<StationRecord>, StoreError> {
        self.inner.select_nearest(point, limit)
    }

    fn latest_end_date(&self) -> Result<Option<NaiveDate>, StoreError> {
        self.inner.latest_end_date()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.inner.clear()?;
        self.persist()
    }

    fn insert_many(&mut self, records: &[StationRecord]) -> Result<usize, StoreError> {
        let count = self.inner.insert_many(records)?;
        self.persist()?;
        Ok(count)
    }
}
