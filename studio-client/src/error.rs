use std::time::Duration;
use thiserror::Error;

/// Failure reading or writing the persisted credit count.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Credit store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored value exists but is not a credit count.
    #[error("Stored credit value is unreadable: {0}")]
    Corrupt(String),
}

/// Failure of one relay round trip, as seen by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The relay answered with a non-2xx status.
    #[error("Relay returned {status} ({code}): {message}")]
    Relay {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Could not reach the relay: {0}")]
    Transport(String),

    #[error("Relay did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Relay response could not be read: {0}")]
    InvalidResponse(String),

    #[error("Generation abandoned")]
    Cancelled,
}

/// Failure saving the displayed image.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("No image to download")]
    NoImage,

    #[error("Image fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image host returned status {0}")]
    Status(u16),

    #[error("Malformed data URL: {0}")]
    InvalidDataUrl(String),

    #[error("Could not write image: {0}")]
    Io(#[from] std::io::Error),
}
