//! Saving the displayed image to disk.

use crate::error::DownloadError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use service_core::observability::TracedClientExt;
use std::path::{Path, PathBuf};

pub struct ImageDownloader {
    client: Client,
    default_file_name: String,
}

impl ImageDownloader {
    pub fn new(default_file_name: impl Into<String>) -> Result<Self, DownloadError> {
        Ok(Self {
            client: Client::builder().build()?,
            default_file_name: default_file_name.into(),
        })
    }

    /// Where `dest` resolves to: the default file name inside a directory,
    /// otherwise `dest` itself.
    pub fn resolve_destination(&self, dest: &Path) -> PathBuf {
        if dest.is_dir() {
            dest.join(&self.default_file_name)
        } else {
            dest.to_path_buf()
        }
    }

    /// Fetch `image_url` (or decode it, for a `data:` URL) and write it to
    /// `dest`. Returns the path written.
    pub async fn download(&self, image_url: &str, dest: &Path) -> Result<PathBuf, DownloadError> {
        let bytes = if image_url.starts_with("data:") {
            decode_data_url(image_url)?
        } else {
            let response = self.client.traced_get(image_url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(DownloadError::Status(status.as_u16()));
            }
            response.bytes().await?.to_vec()
        };

        let path = self.resolve_destination(dest);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;

        tracing::info!(path = %path.display(), bytes = bytes.len(), "Image saved");
        Ok(path)
    }
}

/// Decode `data:<media type>;base64,<payload>`.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, DownloadError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| DownloadError::InvalidDataUrl("missing data: prefix".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| DownloadError::InvalidDataUrl("missing payload".to_string()))?;

    if !meta.ends_with(";base64") {
        return Err(DownloadError::InvalidDataUrl(
            "only base64 payloads are supported".to_string(),
        ));
    }

    STANDARD
        .decode(payload.trim())
        .map_err(|e| DownloadError::InvalidDataUrl(e.to_string()))
}
