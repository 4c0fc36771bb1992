//! HTTP client wrapper for downloading files.
//!
//! This module provides the `HttpClient` struct which handles streaming
//! downloads with proper timeout configuration, progress reporting and
//! cleanup of partial files.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::error::DownloadError;
use crate::http::{HttpTimeouts, build_http_client};
use crate::user_agent;

/// Bytes received so far for one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    /// Whether the server announced the body length.
    pub length_computable: bool,
    /// Bytes written so far.
    pub loaded: u64,
    /// Announced body length, zero when unknown.
    pub total: u64,
}

impl TransferProgress {
    /// Whole percentage complete, or `None` when the length is unknown.
    #[must_use]
    pub fn percent(&self) -> Option<u8> {
        if !self.length_computable || self.total == 0 {
            return None;
        }
        let pct = self.loaded.saturating_mul(100) / self.total;
        Some(u8::try_from(pct.min(100)).unwrap_or(100))
    }
}

/// A file saved by a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    /// Where the file was written.
    pub path: PathBuf,
    /// Size on disk.
    pub bytes: u64,
}

/// HTTP client for downloading files with streaming support.
///
/// Create once and reuse; clones share the connection pool.
///
/// # Example
///
/// ```no_run
/// use trackgrab_core::download::HttpClient;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new()?;
/// let saved = client
///     .download_to_path("https://example.com/a.mp3", Path::new("./a.mp3"), &|_| {})
///     .await?;
/// println!("Downloaded {} bytes", saved.bytes);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with the default transfer timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] when the client cannot be built.
    pub fn new() -> Result<Self, DownloadError> {
        Self::with_timeouts(HttpTimeouts::download_defaults())
    }

    /// Creates a client with explicit timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] when the client cannot be built.
    pub fn with_timeouts(timeouts: HttpTimeouts) -> Result<Self, DownloadError> {
        let client = build_http_client(&user_agent::default_download_user_agent(), timeouts)
            .map_err(|e| DownloadError::ClientBuild {
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }

    /// Wraps an existing reqwest client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Streams `url` into `path`, reporting progress after every chunk.
    ///
    /// The file is created (or truncated) at `path`. On any failure after
    /// creation the partial file is removed.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is invalid
    /// - The request fails (network error, timeout)
    /// - The server returns an error status (4xx, 5xx)
    /// - Writing to disk fails
    #[instrument(skip(self, on_progress), fields(url = %url, path = %path.display()))]
    pub async fn download_to_path(
        &self,
        url: &str,
        path: &Path,
        on_progress: &(dyn Fn(TransferProgress) + Send + Sync),
    ) -> Result<SavedFile, DownloadError> {
        debug!("starting download");

        let response = self.fetch(url).await?;
        let file = File::create(path)
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        finish_download(file, response, url, path, on_progress).await
    }

    /// Streams `url` into an already opened `file` located at `path`.
    ///
    /// Used when the destination was reserved before the request was sent.
    /// The file at `path` is removed on any failure, including a rejected
    /// request.
    ///
    /// # Errors
    ///
    /// Same conditions as [`HttpClient::download_to_path`].
    #[instrument(skip(self, file, on_progress), fields(url = %url, path = %path.display()))]
    pub async fn download_into_file(
        &self,
        url: &str,
        file: File,
        path: &Path,
        on_progress: &(dyn Fn(TransferProgress) + Send + Sync),
    ) -> Result<SavedFile, DownloadError> {
        debug!("starting download into reserved file");

        let response = match self.fetch(url).await {
            Ok(response) => response,
            Err(error) => {
                drop(file);
                let _ = tokio::fs::remove_file(path).await;
                return Err(error);
            }
        };
        finish_download(file, response, url, path, on_progress).await
    }

    async fn fetch(&self, url: &str) -> Result<reqwest::Response, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }
}

async fn finish_download(
    mut file: File,
    response: reqwest::Response,
    url: &str,
    path: &Path,
    on_progress: &(dyn Fn(TransferProgress) + Send + Sync),
) -> Result<SavedFile, DownloadError> {
    let stream_result = stream_to_file(&mut file, response, url, path, on_progress).await;
    if stream_result.is_err() {
        debug!("cleaning up partial file after error");
        drop(file);
        let _ = tokio::fs::remove_file(path).await;
    }
    let bytes = stream_result?;

    info!(bytes, "download complete");
    Ok(SavedFile {
        path: path.to_path_buf(),
        bytes,
    })
}

async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
    on_progress: &(dyn Fn(TransferProgress) + Send + Sync),
) -> Result<u64, DownloadError> {
    let total = response.content_length();
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
        on_progress(TransferProgress {
            length_computable: total.is_some(),
            loaded: bytes_written,
            total: total.unwrap_or(0),
        });
    }

    // Ensure all data is flushed to disk
    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}
