//! Refreshing the station store from NOAA's ISD station history.
//!
//! A refresh downloads `isd-history.csv`, parses it and replaces the store
//! contents wholesale. It must not run while resolutions are reading the store.
//! Downloading comes first, so a failed download never touches the store.

pub mod download;
pub mod error;
pub mod history;

use crate::catalog::download::download_to_file;
use crate::catalog::error::CatalogError;
use crate::catalog::history::read_history_csv;
use crate::store::error::StoreError;
use crate::store::StationStore;
use crate::types::station::StationRecord;
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::task;

pub const ISD_HISTORY_URL: &str = "https://www.ncei.noaa.gov/pub/data/noaa/isd-history.csv";

/// Downloads and parses the station catalog at `url`.
pub async fn fetch_history(url: &str) -> Result<Vec<StationRecord>, CatalogError> {
    let temp_file = NamedTempFile::new()?;
    download_to_file(url, temp_file.path()).await?;

    // The temp file moves into the task so it lives until parsing is done.
    task::spawn_blocking(move || read_history_csv(temp_file.path())).await?
}

/// Replaces the contents of `store` with the catalog CSV at `path`.
pub fn populate_from_file<S: StationStore + ?Sized>(
    store: &mut S,
    path: &Path,
) -> Result<usize, CatalogError> {
    let records = read_history_csv(path)?;
    Ok(store.replace(&records)?)
}

/// Runs [`StationStore::replace`] on the blocking pool.
///
/// The store is handed back together with the outcome of the replace. It is
/// only lost when the blocking task itself fails to complete.
pub async fn replace_blocking<S>(
    mut store: S,
    records: Vec<StationRecord>,
) -> Result<(S, Result<usize, StoreError>), CatalogError>
where
    S: StationStore + Send + 'static,
{
    Ok(task::spawn_blocking(move || {
        let result = store.replace(&records);
        (store, result)
    })
    .await?)
}
