use crate::store::error::StoreError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Catalog download failed")]
    DownloadIo(#[from] std::io::Error),

    #[error("Catalog file '{0}' not found")]
    FileNotFound(PathBuf),

    #[error("Failed to parse catalog CSV '{0}'")]
    CsvReadPolars(PathBuf, #[source] PolarsError),

    #[error("Catalog CSV '{path}' has {found} columns, expected {expected}")]
    SchemaMismatch {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("Catalog row {row} has no {column}")]
    MissingIdentifier { row: usize, column: &'static str },

    #[error("Failed processing catalog DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
