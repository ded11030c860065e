use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Failed to open raster '{0}'")]
    Open(PathBuf, #[source] std::io::Error),

    #[error("Failed to decode raster '{0}'")]
    Decode(PathBuf, #[source] tiff::TiffError),

    #[error("Raster '{0}' is missing its geotransform tags (ModelPixelScale/ModelTiepoint)")]
    MissingGeoTags(PathBuf),

    #[error("Raster '{0}' uses an unsupported sample format")]
    UnsupportedSampleFormat(PathBuf),
}
