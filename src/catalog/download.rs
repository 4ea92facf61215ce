use crate::catalog::error::CatalogError;
use futures_util::TryStreamExt;
use log::{info, warn};
use reqwest::Client;
use std::io;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

/// Streams the resource at `url` into the file at `destination`.
///
/// Returns the number of bytes written.
pub async fn download_to_file(url: &str, destination: &Path) -> Result<u64, CatalogError> {
    info!("Downloading station history from {}", url);
    let start = std::time::Instant::now();

    let response = Client::new()
        .get(url)
        .send()
        .await
        .map_err(|e| CatalogError::NetworkRequest(url.to_string(), e))?;

    let response = match response.error_for_status() {
        Ok(resp) => resp,
        Err(e) => {
            warn!("HTTP error for {}: {:?}", url, e);
            return Err(if let Some(status) = e.status() {
                CatalogError::HttpStatus {
                    url: url.to_string(),
                    status,
                    source: e,
                }
            } else {
                CatalogError::NetworkRequest(url.to_string(), e)
            });
        }
    };

    let stream = response.bytes_stream().map_err(io::Error::other);
    let mut reader = StreamReader::new(stream);
    let mut file = tokio::fs::File::create(destination).await?;
    let written = tokio::io::copy(&mut reader, &mut file).await?;
    file.flush().await?;

    info!(
        "Downloaded {} bytes to {} in {:?}",
        written,
        destination.display(),
        start.elapsed()
    );
    Ok(written)
}
