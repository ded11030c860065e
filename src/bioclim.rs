//! This module provides the main entry point for working with bioclimatic
//! raster data. It covers downloading the CHELSA and WorldClim datasets into
//! a local cache and extracting variable values for georeferenced points.

use crate::download::fetcher::DatasetFetcher;
use crate::error::BioclimError;
use crate::extract::extractor::{BioclimExtractor, ExtractionSet, PointExtraction};
use crate::types::dataset::Dataset;
use crate::types::point::CrsDataPoint;
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use bon::bon;
use std::path::{Path, PathBuf};

/// The main client struct for bioclim raster data.
///
/// This struct handles downloading the global bioclim rasters (with a marker
/// based cache, so nothing is fetched twice) and sampling them for batches of
/// [`CrsDataPoint`]s.
///
/// Create an instance using [`Bioclim::new()`] for default behavior (using a
/// standard cache directory) or [`Bioclim::with_cache_folder()`] for custom
/// cache locations.
///
/// # Examples
///
/// ```rust
/// # use bioclim::{Bioclim, BioclimError};
/// # async fn run() -> Result<(), BioclimError> {
/// // Create a client using the default cache directory
/// let client = Bioclim::new().await?;
/// // Now you can use the client to download datasets or extract values
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Bioclim {
    cache_folder: PathBuf,
    fetcher: DatasetFetcher,
    extractor: BioclimExtractor,
}

#[bon]
impl Bioclim {
    /// Creates a new `Bioclim` client instance with a specified cache
    /// directory.
    ///
    /// Use this if you need to control where the downloaded rasters are
    /// stored. Note that a full dataset is tens of gigabytes.
    ///
    /// # Arguments
    ///
    /// * `cache_folder` - A `PathBuf` pointing to the directory to use for
    ///   the rasters. The directory will be created if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`BioclimError::CacheDirCreation`] if the specified directory
    /// cannot be created.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use bioclim::{Bioclim, BioclimError};
    /// # use std::path::Path;
    /// # async fn run() -> Result<(), BioclimError> {
    /// let cache_path = Path::new("/data/bioclim").to_path_buf();
    /// let client = Bioclim::with_cache_folder(cache_path).await?;
    /// // ... use client ...
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_cache_folder(cache_folder: PathBuf) -> Result<Self, BioclimError> {
        ensure_cache_dir_exists(&cache_folder)
            .await
            .map_err(|e| BioclimError::CacheDirCreation(cache_folder.clone(), e))?;
        Ok(Self {
            fetcher: DatasetFetcher::new(&cache_folder),
            extractor: BioclimExtractor::new(&cache_folder),
            cache_folder,
        })
    }

    /// Creates a new `Bioclim` client instance using the default cache
    /// directory.
    ///
    /// This is the simplest way to get started. The default cache directory
    /// is determined using the `dirs` crate, typically located in the user's
    /// cache directory (e.g., `~/.cache/bioclim_cache` on Linux).
    ///
    /// # Errors
    ///
    /// Returns [`BioclimError::CacheDirResolution`] if the default cache
    /// directory cannot be found.
    /// Returns [`BioclimError::CacheDirCreation`] if the default cache
    /// directory cannot be created.
    pub async fn new() -> Result<Self, BioclimError> {
        let cache_folder = get_cache_dir().map_err(BioclimError::CacheDirResolution)?;
        Self::with_cache_folder(cache_folder).await
    }

    /// The directory rasters are downloaded into and sampled from.
    pub fn cache_folder(&self) -> &Path {
        &self.cache_folder
    }

    /// Downloads a dataset into the cache directory.
    ///
    /// Every raster of the dataset that is already present is skipped, so
    /// calling this repeatedly is cheap and an interrupted download can be
    /// resumed by calling it again. Zip-packaged rasters (the WorldClim
    /// distribution) are unpacked and the archives removed.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.dataset(Dataset)`: **Required.** Which dataset to fetch
    ///   ([`Dataset::Chelsa`] or [`Dataset::Worldclim`]).
    ///
    /// # Returns
    ///
    /// The number of remote files that were actually fetched (0 when the
    /// dataset was already complete).
    ///
    /// # Errors
    ///
    /// Returns [`BioclimError::Download`] variants for network failures,
    /// non-success HTTP statuses and archive extraction problems.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use bioclim::{Bioclim, BioclimError, Dataset};
    /// #
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), BioclimError> {
    /// let client = Bioclim::new().await?;
    /// let fetched = client.download().dataset(Dataset::Chelsa).call().await?;
    /// println!("Fetched {fetched} files.");
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn download(&self, dataset: Dataset) -> Result<usize, BioclimError> {
        self.fetcher
            .ensure_dataset(dataset)
            .await
            .map_err(BioclimError::from)
    }

    /// Downloads every URL of a newline-delimited list file into the cache
    /// directory.
    ///
    /// Blank lines and lines starting with `#` are ignored; files already in
    /// the cache are skipped. This is the escape hatch for raster layers the
    /// dataset manifests don't cover (e.g. future climate scenarios).
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.path(PathBuf)`: **Required.** The URL list file.
    ///
    /// # Returns
    ///
    /// The paths of the files that were fetched.
    ///
    /// # Errors
    ///
    /// Returns [`BioclimError::Download`] variants when the list cannot be
    /// read, a URL has no file name component, or a transfer fails.
    #[builder]
    pub async fn download_url_list(&self, path: PathBuf) -> Result<Vec<PathBuf>, BioclimError> {
        self.fetcher
            .download_url_list(&path)
            .await
            .map_err(BioclimError::from)
    }

    /// Extracts all 19 bioclim variables plus elevation for a batch of
    /// points.
    ///
    /// Points may be in any EPSG coordinate system; they are reprojected to
    /// WGS84 before sampling. The returned [`ExtractionSet`] holds corrected
    /// physical values and converts to a Polars `DataFrame` or a CSV file.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.dataset(Dataset)`: **Required.** Which dataset's rasters to
    ///   sample. The dataset must have been downloaded first.
    /// * `.points(&[CrsDataPoint])`: **Required.** The points to sample.
    ///
    /// # Errors
    ///
    /// Returns [`BioclimError::Extract`] variants when a raster is missing
    /// from the cache, cannot be decoded, or a point cannot be reprojected.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use bioclim::{Bioclim, BioclimError, CrsDataPoint, Dataset};
    /// #
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), BioclimError> {
    /// let client = Bioclim::new().await?;
    /// client.download().dataset(Dataset::Chelsa).call().await?;
    ///
    /// let points = vec![
    ///     CrsDataPoint::new("Sherbrooke", 3857, -8002765.77, 5683742.68)?,
    ///     CrsDataPoint::new("Paris", 4326, 2.346963, 48.858885)?,
    /// ];
    /// let set = client
    ///     .extract()
    ///     .dataset(Dataset::Chelsa)
    ///     .points(&points)
    ///     .call()
    ///     .await?;
    /// println!("{}", set.to_dataframe().map_err(bioclim::ExtractError::from)?);
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn extract(
        &self,
        dataset: Dataset,
        points: &[CrsDataPoint],
    ) -> Result<ExtractionSet, BioclimError> {
        self.extractor
            .extract(dataset, points)
            .await
            .map_err(BioclimError::from)
    }

    /// Extracts all variables for a single point.
    ///
    /// Convenience wrapper around [`Bioclim::extract`] for one-off lookups.
    ///
    /// # Arguments
    ///
    /// * `.dataset(Dataset)`: **Required.** Which dataset's rasters to
    ///   sample.
    /// * `.point(&CrsDataPoint)`: **Required.** The point to sample.
    #[builder]
    pub async fn extract_point(
        &self,
        dataset: Dataset,
        point: &CrsDataPoint,
    ) -> Result<PointExtraction, BioclimError> {
        let set = self
            .extractor
            .extract(dataset, std::slice::from_ref(point))
            .await?;
        let mut records: Vec<PointExtraction> = set.records().to_vec();
        // One input point always yields exactly one record.
        Ok(records.remove(0))
    }
}
