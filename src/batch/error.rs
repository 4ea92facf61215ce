use crate::stations::error::LocateStationError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Input file '{0}' not found")]
    InputFileNotFound(PathBuf),

    #[error("Input table must have a column labelled '{0}'")]
    MissingColumn(String),

    #[error("Input table already has an output column named '{0}'")]
    OutputColumnConflict(String),

    #[error("Row {row} has no value in column '{column}'")]
    NullCoordinate { row: usize, column: &'static str },

    #[error("Failed to resolve row {row}")]
    Row {
        row: usize,
        #[source]
        source: LocateStationError,
    },

    #[error("Failed to read CSV '{0}'")]
    CsvRead(PathBuf, #[source] PolarsError),

    #[error("I/O error writing CSV '{0}'")]
    CsvWriteIo(PathBuf, #[source] std::io::Error),

    #[error("Encoding error writing CSV '{0}'")]
    CsvWritePolars(PathBuf, #[source] PolarsError),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),
}
