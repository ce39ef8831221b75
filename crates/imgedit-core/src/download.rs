//! Saving generated images to disk
//!
//! The desktop counterpart of a browser download link: the URL is resolved
//! with [`ApiClient::full_image_url`] and the bytes land in the client's
//! download directory.

use std::path::{Path, PathBuf};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, transport_error};
use crate::error::{Error, Result};

/// File name used when the caller does not supply one
pub const DEFAULT_DOWNLOAD_NAME: &str = "generated-image.png";

impl ApiClient {
    /// Download an image, reporting nothing to the caller.
    ///
    /// Failures are logged at `warn` and otherwise dropped; use
    /// [`ApiClient::try_download_image`] to observe them.
    pub async fn download_image(&self, url: &str, filename: Option<&str>) {
        if let Err(e) = self.try_download_image(url, filename).await {
            warn!(url = %url, error = %e, "Image download failed");
        }
    }

    /// Download an image and return the path it was written to
    pub async fn try_download_image(&self, url: &str, filename: Option<&str>) -> Result<PathBuf> {
        let full_url = self.full_image_url(url);
        if full_url.is_empty() {
            return Err(Error::InvalidRequest("No image URL to download".to_string()));
        }

        let path = self.download_dir().join(download_file_name(filename));
        tokio::fs::create_dir_all(self.download_dir()).await?;

        if let Some(data_uri) = full_url.strip_prefix("data:") {
            let bytes = decode_data_uri(data_uri)?;
            tokio::fs::write(&path, bytes).await?;
        } else {
            debug!(url = %full_url, "Fetching image");
            // An earlier download under the same name survives a failed fetch
            let partial = partial_path(&path);
            let fetched = match self.fetch_to_file(&full_url, &partial).await {
                Ok(()) => tokio::fs::rename(&partial, &path).await.map_err(Error::from),
                Err(e) => Err(e),
            };
            if let Err(e) = fetched {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        }

        info!(path = %path.display(), "Image downloaded");
        Ok(path)
    }

    async fn fetch_to_file(&self, url: &str, path: &Path) -> Result<()> {
        let timeout_secs = self.timeout_secs();
        let response = self
            .http()
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status,
                message: None,
            });
        }

        let mut file = tokio::fs::File::create(path).await?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| transport_error(e, timeout_secs))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(())
    }
}

/// Name a download: the last component of `filename`, or the default
fn download_file_name(filename: Option<&str>) -> String {
    filename
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .and_then(|name| Path::new(name).file_name())
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_DOWNLOAD_NAME)
        .to_string()
}

/// Sibling of `path` a download is streamed into before it replaces `path`
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

/// Decode the part of a data URI after `data:`
fn decode_data_uri(data_uri: &str) -> Result<Vec<u8>> {
    let (header, payload) = data_uri
        .split_once(',')
        .ok_or_else(|| Error::InvalidRequest("Malformed data URI".to_string()))?;

    if !header.ends_with(";base64") {
        return Err(Error::InvalidRequest(
            "Only base64 data URIs can be saved".to_string(),
        ));
    }

    BASE64
        .decode(payload.trim())
        .map_err(|e| Error::InvalidRequest(format!("Invalid base64: {}", e)))
}
