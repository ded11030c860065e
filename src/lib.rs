mod bioclim;
mod crs;
mod download;
mod error;
mod extract;
mod raster;
mod types;
mod utils;

pub use bioclim::*;
pub use error::BioclimError;

pub use types::dataset::{BioVariable, Dataset, BIO_VARIABLES, ELEVATION};
pub use types::point::{CrsDataPoint, PointError};

pub use extract::extractor::{ExtractionSet, PointExtraction, VariableValue};
pub use raster::sampler::GeoTiffSampler;

pub use crs::error::ProjectionError;
pub use crs::transform::{to_wgs84, validate_epsg, WGS84_EPSG};
pub use download::error::DownloadError;
pub use extract::error::ExtractError;
pub use raster::error::RasterError;
