//! Remote audio download.
//!
//! Fetches a caller-supplied URL and streams the body to a path in the
//! job's artifact namespace. Runs at submission time, so any failure here
//! rejects the submission before a job record exists.

use std::path::Path;

use futures_util::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Download `url` to `dest`, creating parent directories as needed.
///
/// Returns the number of bytes written. A non-success HTTP status or a
/// failure while reading the body is a [`MediaError::DownloadFailed`].
pub async fn download_to(client: &reqwest::Client, url: &str, dest: &Path) -> MediaResult<u64> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| MediaError::download_failed(format!("request to {url} failed: {e}")))?;

    if !response.status().is_success() {
        return Err(MediaError::download_failed(format!(
            "{url} returned HTTP {}",
            response.status()
        )));
    }

    if let Some(parent) = dest.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| MediaError::download_failed(format!("reading body of {url}: {e}")))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    debug!("Downloaded {} bytes from {} to {}", written, url, dest.display());

    Ok(written)
}
