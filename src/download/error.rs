use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    // Covers stream copy errors and data-directory bookkeeping.
    #[error("Data download failed")]
    DownloadIo(#[from] std::io::Error),

    #[error("Failed to unpack archive '{0}'")]
    ArchiveExtract(PathBuf, #[source] zip::result::ZipError),

    #[error("Failed to read URL list '{0}'")]
    UrlListRead(PathBuf, #[source] std::io::Error),

    #[error("URL '{0}' has no usable file name component")]
    BadUrl(String),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
