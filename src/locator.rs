//! This module provides the main entry point of the crate: [`IsdLocator`], a handle
//! on a persisted station store that resolves coordinates to their nearest
//! ISD weather station, singly or in bulk, and refreshes the store on request.

use crate::batch;
use crate::catalog::history::read_history_csv;
use crate::catalog::{fetch_history, replace_blocking, ISD_HISTORY_URL};
use crate::error::IsdError;
use crate::stations::resolve::{resolve_point, ResolveOptions};
use crate::store::error::StoreError;
use crate::store::file_store::{FileStore, STORE_FILE_NAME};
use crate::store::{StationStore, StoreStatus};
use crate::types::resolution::Resolution;
use crate::types::station::{LatLon, StationRecord, STALENESS_DAYS};
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use bon::bon;
use chrono::{Local, NaiveDate};
use log::{info, warn};
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use tokio::task;

/// Decides whether a missing, empty or stale store should be refreshed.
///
/// This is where an interactive caller asks its user; the locator itself never
/// blocks on input. Any `FnMut(&StoreStatus) -> bool` closure implements it.
pub trait RefreshDecision {
    fn should_refresh(&mut self, status: &StoreStatus) -> bool;
}

impl<F: FnMut(&StoreStatus) -> bool> RefreshDecision for F {
    fn should_refresh(&mut self, status: &StoreStatus) -> bool {
        self(status)
    }
}

/// The main client for resolving locations to ISD weather stations.
///
/// Holds an open [`FileStore`] handle. Create one with [`IsdLocator::new`] (default
/// cache directory), [`IsdLocator::with_cache_folder`], or
/// [`IsdLocator::open_or_refresh`] when the store may need to be downloaded first.
///
/// # Examples
///
/// ```no_run
/// # use isd_locator::{IsdLocator, IsdError, LatLon};
/// # async fn run() -> Result<(), IsdError> {
/// let locator = IsdLocator::new().await?;
/// let nearest = locator
///     .find_closest()
///     .location(LatLon(47.6519, -122.3434))
///     .call()?
///     .single();
/// println!("{} {} at {} miles", nearest.usaf, nearest.wban, nearest.distance_miles);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct IsdLocator {
    store: FileStore,
}

#[bon]
impl IsdLocator {
    /// Opens the station store kept in `cache_folder`, creating the folder if needed.
    ///
    /// # Errors
    ///
    /// Returns [`IsdError::CacheDirCreation`] if the folder cannot be created and
    /// [`StoreError::Missing`] (wrapped) if no store has been downloaded yet.
    pub async fn with_cache_folder(cache_folder: PathBuf) -> Result<Self, IsdError> {
        ensure_cache_dir_exists(&cache_folder)
            .await
            .map_err(|e| IsdError::CacheDirCreation(cache_folder.clone(), e))?;
        let path = cache_folder.join(STORE_FILE_NAME);
        let store = task::spawn_blocking(move || FileStore::open(path)).await??;
        Ok(Self { store })
    }

    /// Opens the station store in the default cache directory
    /// (e.g. `~/.cache/isd_locator_cache` on Linux).
    pub async fn new() -> Result<Self, IsdError> {
        Self::with_cache_folder(Self::default_cache_folder()?).await
    }

    /// The default cache directory (e.g. `~/.cache/isd_locator_cache` on Linux).
    pub fn default_cache_folder() -> Result<PathBuf, IsdError> {
        get_cache_dir().map_err(IsdError::CacheDirResolution)
    }

    /// Opens the store in `cache_folder`, creating an empty one if none exists yet.
    ///
    /// Use this before a refresh; resolving against an empty store always fails.
    pub async fn open_or_create(cache_folder: PathBuf) -> Result<Self, IsdError> {
        ensure_cache_dir_exists(&cache_folder)
            .await
            .map_err(|e| IsdError::CacheDirCreation(cache_folder.clone(), e))?;
        let path = cache_folder.join(STORE_FILE_NAME);
        let store = task::spawn_blocking(move || FileStore::open_or_create(path)).await??;
        Ok(Self { store })
    }

    /// Wraps an already opened store.
    pub fn from_store(store: FileStore) -> Self {
        Self { store }
    }

    /// Opens the store in `cache_folder`, consulting `decide` when it is missing,
    /// empty or stale on `reference_date`.
    ///
    /// When `decide` agrees, the catalog is downloaded from `source_url`. When it
    /// declines, a stale store is used as is and a missing or empty one is an error.
    pub async fn open_or_refresh<D: RefreshDecision>(
        cache_folder: PathBuf,
        source_url: &str,
        reference_date: NaiveDate,
        mut decide: D,
    ) -> Result<Self, IsdError> {
        ensure_cache_dir_exists(&cache_folder)
            .await
            .map_err(|e| IsdError::CacheDirCreation(cache_folder.clone(), e))?;
        let path = cache_folder.join(STORE_FILE_NAME);

        let open_path = path.clone();
        let existing = match task::spawn_blocking(move || FileStore::open(open_path)).await? {
            Ok(store) => Some(store),
            Err(StoreError::Missing(_)) => None,
            Err(e) => return Err(e.into()),
        };

        let status = match &existing {
            Some(store) => store.status(reference_date, STALENESS_DAYS)?,
            None => StoreStatus::Empty,
        };
        if status.is_fresh() {
            if let Some(store) = existing {
                return Ok(Self { store });
            }
        }

        if decide.should_refresh(&status) {
            let store = match existing {
                Some(store) => store,
                None => task::spawn_blocking(move || FileStore::create(path)).await??,
            };
            let mut locator = Self { store };
            locator.refresh(source_url).await?;
            return Ok(locator);
        }

        match (existing, status) {
            (Some(store), StoreStatus::Stale { latest, .. }) => {
                warn!("Using stale station store, freshest END date is {}", latest);
                Ok(Self { store })
            }
            _ => Err(StoreError::Missing(path).into()),
        }
    }

    /// The underlying store handle.
    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Freshness of the store on `reference_date`.
    pub fn status(&self, reference_date: NaiveDate) -> Result<StoreStatus, IsdError> {
        Ok(self.store.status(reference_date, STALENESS_DAYS)?)
    }

    /// Fails with [`StoreError::Stale`] or [`StoreError::Missing`] unless the store is fresh today.
    pub fn ensure_fresh(&self) -> Result<(), IsdError> {
        match self.status(Local::now().date_naive())? {
            StoreStatus::Fresh { .. } => Ok(()),
            StoreStatus::Stale { latest, cutoff } => Err(StoreError::Stale { latest, cutoff }.into()),
            StoreStatus::Empty => Err(StoreError::Missing(self.store.path().to_path_buf()).into()),
        }
    }

    /// Downloads the station catalog from `source_url` and replaces the store with it.
    ///
    /// A failed download leaves the store as it was.
    pub async fn refresh(&mut self, source_url: &str) -> Result<usize, IsdError> {
        let records = fetch_history(source_url).await?;
        let inserted = self.replace_records(records).await?;
        info!("Station store refreshed with {} stations", inserted);
        Ok(inserted)
    }

    /// Downloads the station catalog from NOAA and replaces the store with it.
    pub async fn refresh_default(&mut self) -> Result<usize, IsdError> {
        self.refresh(ISD_HISTORY_URL).await
    }

    /// Replaces the store with a local copy of `isd-history.csv`.
    pub async fn refresh_from_file(&mut self, path: &Path) -> Result<usize, IsdError> {
        let csv_path = path.to_path_buf();
        let records = task::spawn_blocking(move || read_history_csv(&csv_path)).await??;
        let inserted = self.replace_records(records).await?;
        info!("Station store loaded from {}", path.display());
        Ok(inserted)
    }

    // Every chunk is written to disk, so the replace runs on the blocking pool.
    async fn replace_records(&mut self, records: Vec<StationRecord>) -> Result<usize, IsdError> {
        let placeholder = FileStore::unloaded(self.store.path().to_path_buf());
        let store = std::mem::replace(&mut self.store, placeholder);
        let (store, result) = replace_blocking(store, records).await?;
        self.store = store;
        Ok(result?)
    }

    /// Finds the nearest station(s) to a location.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.location(LatLon)`: **Required.** The point to resolve.
    /// * `.active_only(bool)`: Optional. Only consider stations that reported in the last 14 days. Defaults to `true`.
    /// * `.candidate_limit(usize)`: Optional. Planar-nearest stations to refine. Defaults to `100`.
    /// * `.reference_date(NaiveDate)`: Optional. The day activity is judged against. Defaults to today.
    ///
    /// # Returns
    ///
    /// A [`Resolution`] with every station tied at the minimum distance. Call
    /// [`Resolution::single`] for one `(USAF, WBAN, distance)` answer.
    #[builder]
    pub fn find_closest(
        &self,
        location: LatLon,
        active_only: Option<bool>,
        candidate_limit: Option<usize>,
        reference_date: Option<NaiveDate>,
    ) -> Result<Resolution, IsdError> {
        let options = ResolveOptions::builder()
            .maybe_active_only(active_only)
            .maybe_candidate_limit(candidate_limit)
            .maybe_reference_date(reference_date)
            .build();
        Ok(resolve_point(&self.store, location, &options)?)
    }

    /// Labels every point of a CSV file with its nearest station.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.input(&Path)`: **Required.** CSV with `Latitude` and `Longitude` columns.
    /// * `.output_dir(&Path)`: Optional. Where `labeled_stations.csv` is written. Defaults to the input's directory.
    /// * `.active_only(bool)`: Optional. Defaults to `true`.
    ///
    /// # Returns
    ///
    /// The labelled table and the path of the written file.
    #[builder]
    pub fn find_closest_csv(
        &self,
        input: &Path,
        output_dir: Option<&Path>,
        active_only: Option<bool>,
    ) -> Result<(DataFrame, PathBuf), IsdError> {
        let output_dir = output_dir
            .or_else(|| input.parent())
            .unwrap_or_else(|| Path::new("."));
        let options = ResolveOptions::builder()
            .maybe_active_only(active_only)
            .build();
        Ok(batch::find_closest_csv(&self.store, input, output_dir, options)?)
    }

    /// Writes the store to disk and releases it.
    pub fn close(self) -> Result<(), IsdError> {
        self.store.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stations::error::LocateStationError;
    use crate::types::station::StationRecord;
    use std::cell::Cell;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seeded_store(dir: &Path, end: NaiveDate) -> FileStore {
        let mut store = FileStore::create(dir.join(STORE_FILE_NAME)).unwrap();
        store
            .replace(&[
                StationRecord::new("727930", "24233", 47.6062, -122.3321).with_end(end),
                StationRecord::new("727935", "24234", 47.4502, -122.3088).with_end(end),
            ])
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_missing_store() {
        let dir = tempdir().unwrap();
        let err = IsdLocator::with_cache_folder(dir.path().to_path_buf())
            .await
            .unwrap_err();
        assert!(matches!(err, IsdError::Store(StoreError::Missing(_))));
    }

    #[tokio::test]
    async fn test_find_closest_builder() {
        let dir = tempdir().unwrap();
        let today = date(2024, 6, 30);
        seeded_store(dir.path(), date(2024, 6, 29)).close().unwrap();

        let locator = IsdLocator::with_cache_folder(dir.path().to_path_buf())
            .await
            .unwrap();
        let result = locator
            .find_closest()
            .location(LatLon(47.6519, -122.3434))
            .reference_date(today)
            .call()
            .unwrap()
            .single();
        assert_eq!(result.usaf, "727930");

        let err = locator
            .find_closest()
            .location(LatLon(-91.0, 0.0))
            .active_only(false)
            .call()
            .unwrap_err();
        assert!(matches!(
            err,
            IsdError::LocateStation(LocateStationError::InvalidCoordinate { .. })
        ));
    }

    #[tokio::test]
    async fn test_open_or_create_then_load_file() {
        let dir = tempdir().unwrap();
        let csv = dir.path().join("isd-history.csv");
        std::fs::write(
            &csv,
            concat!(
                "\"USAF\",\"WBAN\",\"STATION NAME\",\"CTRY\",\"STATE\",\"ICAO\",\"LAT\",\"LON\",\"ELEV(M)\",\"BEGIN\",\"END\"\n",
                "\"727930\",\"24233\",\"SEATTLE\",\"US\",\"WA\",\"KSEA\",\"+47.444\",\"-122.314\",\"+0112.8\",\"19480101\",\"20240625\"\n",
            ),
        )
        .unwrap();

        let mut locator = IsdLocator::open_or_create(dir.path().join("cache")).await.unwrap();
        assert_eq!(locator.status(date(2024, 6, 30)).unwrap(), StoreStatus::Empty);
        assert_eq!(locator.refresh_from_file(&csv).await.unwrap(), 1);
        assert_eq!(locator.store().records()[0].usaf, "727930");
        locator.close().unwrap();

        let reopened = IsdLocator::with_cache_folder(dir.path().join("cache")).await.unwrap();
        assert!(reopened.status(date(2024, 6, 30)).unwrap().is_fresh());
    }

    #[tokio::test]
    async fn test_failed_download_keeps_store() {
        let dir = tempdir().unwrap();
        seeded_store(dir.path(), date(2024, 6, 29)).close().unwrap();

        let mut locator = IsdLocator::with_cache_folder(dir.path().to_path_buf())
            .await
            .unwrap();
        let err = locator
            .refresh("http://127.0.0.1:9/isd-history.csv")
            .await
            .unwrap_err();
        assert!(matches!(err, IsdError::Catalog(_)));
        assert_eq!(locator.store().len(), 2);
        assert_eq!(locator.store().path(), dir.path().join(STORE_FILE_NAME));
    }

    #[tokio::test]
    async fn test_accepted_refresh_creates_store_before_download() {
        let dir = tempdir().unwrap();
        let err = IsdLocator::open_or_refresh(
            dir.path().to_path_buf(),
            "http://127.0.0.1:9/isd-history.csv",
            date(2024, 6, 30),
            |_: &StoreStatus| true,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, IsdError::Catalog(_)));
        assert!(FileStore::open(dir.path().join(STORE_FILE_NAME)).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_declined_refresh_of_missing_store() {
        let dir = tempdir().unwrap();
        let asked = Cell::new(0);
        let err = IsdLocator::open_or_refresh(
            dir.path().to_path_buf(),
            ISD_HISTORY_URL,
            date(2024, 6, 30),
            |status: &StoreStatus| {
                asked.set(asked.get() + 1);
                assert_eq!(*status, StoreStatus::Empty);
                false
            },
        )
        .await
        .unwrap_err();

        assert_eq!(asked.get(), 1);
        assert!(matches!(err, IsdError::Store(StoreError::Missing(_))));
        assert!(!dir.path().join(STORE_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_declined_refresh_of_stale_store_proceeds() {
        let dir = tempdir().unwrap();
        seeded_store(dir.path(), date(2020, 1, 1)).close().unwrap();

        let locator = IsdLocator::open_or_refresh(
            dir.path().to_path_buf(),
            ISD_HISTORY_URL,
            date(2024, 6, 30),
            |status: &StoreStatus| matches!(status, StoreStatus::Fresh { .. }),
        )
        .await
        .unwrap();

        assert_eq!(locator.store().len(), 2);
        assert!(matches!(
            locator.status(date(2024, 6, 30)).unwrap(),
            StoreStatus::Stale { .. }
        ));
        assert!(matches!(
            locator.ensure_fresh(),
            Err(IsdError::Store(StoreError::Stale { .. }))
        ));
    }

    #[tokio::test]
    async fn test_fresh_store_skips_decision() {
        let dir = tempdir().unwrap();
        let today = date(2024, 6, 30);
        seeded_store(dir.path(), today).close().unwrap();

        let locator = IsdLocator::open_or_refresh(
            dir.path().to_path_buf(),
            ISD_HISTORY_URL,
            today,
            |_: &StoreStatus| -> bool { panic!("fresh store must not prompt") },
        )
        .await
        .unwrap();
        assert!(locator.status(today).unwrap().is_fresh());
    }
}
