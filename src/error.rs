use crate::download::error::DownloadError;
use crate::extract::error::ExtractError;
use crate::types::point::PointError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BioclimError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Point(#[from] PointError),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution(#[source] std::io::Error),
}
