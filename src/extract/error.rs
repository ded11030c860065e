use crate::raster::error::RasterError;
use crate::types::dataset::Dataset;
use crate::types::point::PointError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Point(#[from] PointError),

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error("Raster '{path}' for the {dataset} dataset is missing; download the dataset first")]
    RasterMissing { dataset: Dataset, path: PathBuf },

    #[error("Failed to build the extraction DataFrame")]
    DataFrame(#[from] PolarsError),

    #[error("Failed to create output CSV '{0}'")]
    CsvCreate(PathBuf, #[source] std::io::Error),

    #[error("Failed to write output CSV '{0}'")]
    CsvWrite(PathBuf, #[source] PolarsError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
