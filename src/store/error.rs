use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Station store '{0}' does not exist")]
    Missing(PathBuf),

    #[error("Station store is stale: freshest END date {latest} is not after {cutoff}")]
    Stale { latest: NaiveDate, cutoff: NaiveDate },

    #[error("Duplicate station key USAF={usaf} WBAN={wban}")]
    DuplicateKey { usaf: String, wban: String },

    #[error("Failed to read store file '{0}'")]
    FileRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to write store file '{0}'")]
    FileWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to decode store data from '{0}'")]
    Decode(PathBuf, #[source] Box<bincode::error::DecodeError>),

    #[error("Failed to encode store data")]
    Encode(#[source] Box<bincode::error::EncodeError>),
}
