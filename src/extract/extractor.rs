//! Per-point multi-raster extraction: CRS normalization, nearest-neighbour
//! sampling of every variable raster, and scale/offset correction into
//! physical units.

use crate::extract::error::ExtractError;
use crate::raster::sampler::GeoTiffSampler;
use crate::types::dataset::{BioVariable, Dataset};
use crate::types::point::CrsDataPoint;
use log::{debug, info};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tokio::task;

/// One extracted value, tied to its catalog entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableValue {
    pub variable: &'static BioVariable,
    /// Corrected physical value; `None` when the point fell outside the
    /// raster or hit a nodata pixel.
    pub value: Option<f64>,
}

/// All extracted values for one input point, keyed by variable code.
///
/// Coordinates are always WGS84 here; non-4326 input points are reprojected
/// before sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct PointExtraction {
    pub id: String,
    pub epsg: u32,
    pub lon: f64,
    pub lat: f64,
    values: Vec<VariableValue>,
}

impl PointExtraction {
    /// Dictionary-style lookup by variable code (`"bio12"`, `"elevation"`).
    pub fn value(&self, code: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|v| v.variable.code == code)
            .and_then(|v| v.value)
    }

    /// The extracted values in catalog order (bio1..bio19, elevation).
    pub fn values(&self) -> &[VariableValue] {
        &self.values
    }
}

/// The result of one extraction run over a batch of points.
#[derive(Debug, Clone)]
pub struct ExtractionSet {
    dataset: Dataset,
    records: Vec<PointExtraction>,
}

impl ExtractionSet {
    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    pub fn records(&self) -> &[PointExtraction] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Builds the tabular view: `id, epsg, lon, lat` followed by one column
    /// per variable, named with its unit (`bio1 (Celsius)`, ...,
    /// `elevation (meters)`).
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let ids: Vec<&str> = self.records.iter().map(|r| r.id.as_str()).collect();
        let epsgs: Vec<u32> = self.records.iter().map(|r| r.epsg).collect();
        let lons: Vec<f64> = self.records.iter().map(|r| r.lon).collect();
        let lats: Vec<f64> = self.records.iter().map(|r| r.lat).collect();

        let mut columns = vec![
            Series::new("id".into(), ids).into_column(),
            Series::new("epsg".into(), epsgs).into_column(),
            Series::new("lon".into(), lons).into_column(),
            Series::new("lat".into(), lats).into_column(),
        ];
        for (index, variable) in self.dataset.all_variables().into_iter().enumerate() {
            let values: Vec<Option<f64>> = self
                .records
                .iter()
                .map(|r| r.values[index].value)
                .collect();
            columns.push(Series::new(variable.column_name().into(), values).into_column());
        }
        DataFrame::new(columns)
    }

    /// Writes the tabular view as CSV.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), ExtractError> {
        let path = path.as_ref();
        let mut df = self.to_dataframe()?;
        let mut file = std::fs::File::create(path)
            .map_err(|e| ExtractError::CsvCreate(path.to_path_buf(), e))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)
            .map_err(|e| ExtractError::CsvWrite(path.to_path_buf(), e))?;
        info!("Wrote {} extraction rows to {}", self.len(), path.display());
        Ok(())
    }
}

#[derive(Debug)]
pub struct BioclimExtractor {
    data_dir: PathBuf,
}

impl BioclimExtractor {
    pub fn new(data_dir: &Path) -> BioclimExtractor {
        BioclimExtractor {
            data_dir: data_dir.to_path_buf(),
        }
    }

    /// Extracts all variables of `dataset` for every point. Points are
    /// normalized to WGS84 first; the blocking TIFF decoding runs on the
    /// blocking thread pool. Raster files are opened once per run and their
    /// chunk caches are shared by all points.
    pub async fn extract(
        &self,
        dataset: Dataset,
        points: &[CrsDataPoint],
    ) -> Result<ExtractionSet, ExtractError> {
        let normalized = points
            .iter()
            .map(CrsDataPoint::to_wgs84)
            .collect::<Result<Vec<_>, _>>()?;

        let data_dir = self.data_dir.clone();
        let records =
            task::spawn_blocking(move || extract_blocking(&data_dir, dataset, &normalized))
                .await??;
        Ok(ExtractionSet { dataset, records })
    }
}

fn extract_blocking(
    data_dir: &Path,
    dataset: Dataset,
    points: &[CrsDataPoint],
) -> Result<Vec<PointExtraction>, ExtractError> {
    let variables = dataset.all_variables();

    let mut samplers = Vec::with_capacity(variables.len());
    for variable in &variables {
        let path = data_dir.join(dataset.file_name(variable));
        if !path.exists() {
            return Err(ExtractError::RasterMissing { dataset, path });
        }
        samplers.push(GeoTiffSampler::open(&path)?);
    }

    let mut records = Vec::with_capacity(points.len());
    for point in points {
        info!(
            "Extracting values for {} at lon={:.3} lat={:.3} from {}",
            point.id(),
            point.x(),
            point.y(),
            dataset.title()
        );
        let mut values = Vec::with_capacity(variables.len());
        for (variable, sampler) in variables.iter().zip(samplers.iter_mut()) {
            let raw = sampler.sample(point.x(), point.y())?;
            if raw.is_none() {
                debug!(
                    "No {} value for {} (outside raster or nodata)",
                    variable.code,
                    point.id()
                );
            }
            let value = raw.map(|v| v * dataset.scale(variable) + dataset.offset(variable));
            values.push(VariableValue {
                variable: *variable,
                value,
            });
        }
        records.push(PointExtraction {
            id: point.id().to_string(),
            epsg: point.epsg(),
            lon: point.x(),
            lat: point.y(),
            values,
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tiff::encoder::{colortype, TiffEncoder};
    use tiff::tags::Tag;

    /// Writes a 4x4 GeoTIFF filled with `fill`, 1 degree pixels, top-left
    /// corner at (10 E, 50 N).
    fn write_constant_raster(path: &Path, fill: u16) {
        let mut file = std::fs::File::create(path).unwrap();
        let mut encoder = TiffEncoder::new(&mut file).unwrap();
        let mut image = encoder.new_image::<colortype::Gray16>(4, 4).unwrap();
        image
            .encoder()
            .write_tag(Tag::ModelPixelScaleTag, &[1.0f64, 1.0, 0.0][..])
            .unwrap();
        image
            .encoder()
            .write_tag(Tag::ModelTiepointTag, &[0.0f64, 0.0, 0.0, 10.0, 50.0, 0.0][..])
            .unwrap();
        image.write_data(&[fill; 16]).unwrap();
        file.flush().unwrap();
    }

    /// Lays down a full fake dataset: variable i is filled with 100 + i.
    fn write_fake_dataset(dir: &Path, dataset: Dataset) {
        for (index, variable) in dataset.all_variables().into_iter().enumerate() {
            let path = dir.join(dataset.file_name(variable));
            write_constant_raster(&path, 100 + index as u16);
        }
    }

    #[tokio::test]
    async fn extracts_corrected_values_for_wgs84_point() {
        let dir = tempfile::tempdir().unwrap();
        write_fake_dataset(dir.path(), Dataset::Chelsa);

        let extractor = BioclimExtractor::new(dir.path());
        let point = CrsDataPoint::new("alptal", 4326, 10.5, 49.5).unwrap();
        let set = extractor
            .extract(Dataset::Chelsa, &[point])
            .await
            .unwrap();

        assert_eq!(set.len(), 1);
        let record = &set.records()[0];
        assert_eq!(record.id, "alptal");
        assert_eq!(record.epsg, 4326);
        // bio1 is Kelvin-packed: 100 * 0.1 - 273.15.
        assert!((record.value("bio1").unwrap() - -263.15).abs() < 1e-9);
        // bio12 is scaled only: 111 * 0.1.
        assert!((record.value("bio12").unwrap() - 11.1).abs() < 1e-9);
        // Elevation is never rescaled: raw 119.
        assert_eq!(record.value("elevation").unwrap(), 119.0);
    }

    #[tokio::test]
    async fn worldclim_values_are_raw() {
        let dir = tempfile::tempdir().unwrap();
        write_fake_dataset(dir.path(), Dataset::Worldclim);

        let extractor = BioclimExtractor::new(dir.path());
        let point = CrsDataPoint::new("p", 4326, 12.5, 47.5).unwrap();
        let set = extractor
            .extract(Dataset::Worldclim, &[point])
            .await
            .unwrap();
        let record = &set.records()[0];
        assert_eq!(record.value("bio1").unwrap(), 100.0);
        assert_eq!(record.value("bio19").unwrap(), 118.0);
    }

    #[tokio::test]
    async fn non_wgs84_points_are_normalized_before_sampling() {
        let dir = tempfile::tempdir().unwrap();
        write_fake_dataset(dir.path(), Dataset::Worldclim);

        let extractor = BioclimExtractor::new(dir.path());
        // (11.5 E, ~48.5 N) expressed in web mercator.
        let mercator =
            CrsDataPoint::new("mercator", 3857, 1280174.1441226462, 6191866.0).unwrap();
        let set = extractor
            .extract(Dataset::Worldclim, &[mercator])
            .await
            .unwrap();

        let record = &set.records()[0];
        assert_eq!(record.epsg, 4326);
        assert!((record.lon - 11.5).abs() < 1e-6);
        assert!((record.lat - 48.5).abs() < 0.1);
        assert_eq!(record.value("bio1").unwrap(), 100.0);
    }

    #[tokio::test]
    async fn out_of_extent_points_yield_nulls() {
        let dir = tempfile::tempdir().unwrap();
        write_fake_dataset(dir.path(), Dataset::Worldclim);

        let extractor = BioclimExtractor::new(dir.path());
        let far_away = CrsDataPoint::new("pacific", 4326, -150.0, 0.0).unwrap();
        let set = extractor
            .extract(Dataset::Worldclim, &[far_away])
            .await
            .unwrap();

        let record = &set.records()[0];
        assert!(record.values().iter().all(|v| v.value.is_none()));
        assert_eq!(record.value("bio1"), None);
    }

    #[tokio::test]
    async fn missing_raster_is_reported_with_its_path() {
        let dir = tempfile::tempdir().unwrap();
        write_fake_dataset(dir.path(), Dataset::Worldclim);
        std::fs::remove_file(dir.path().join("wc2.1_30s_bio_7.tif")).unwrap();

        let extractor = BioclimExtractor::new(dir.path());
        let point = CrsDataPoint::new("p", 4326, 10.5, 49.5).unwrap();
        let err = extractor
            .extract(Dataset::Worldclim, &[point])
            .await
            .unwrap_err();
        match err {
            ExtractError::RasterMissing { dataset, path } => {
                assert_eq!(dataset, Dataset::Worldclim);
                assert!(path.ends_with("wc2.1_30s_bio_7.tif"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_point_batch_is_an_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        write_fake_dataset(dir.path(), Dataset::Worldclim);

        let extractor = BioclimExtractor::new(dir.path());
        let set = extractor.extract(Dataset::Worldclim, &[]).await.unwrap();
        assert!(set.is_empty());
        let df = set.to_dataframe().unwrap();
        assert_eq!(df.shape(), (0, 24));
    }

    #[tokio::test]
    async fn dataframe_has_the_documented_layout() {
        let dir = tempfile::tempdir().unwrap();
        write_fake_dataset(dir.path(), Dataset::Chelsa);

        let extractor = BioclimExtractor::new(dir.path());
        let points = [
            CrsDataPoint::new("a", 4326, 10.5, 49.5).unwrap(),
            CrsDataPoint::new("b", 4326, 13.5, 46.5).unwrap(),
        ];
        let set = extractor.extract(Dataset::Chelsa, &points).await.unwrap();
        let df = set.to_dataframe().unwrap();

        assert_eq!(df.shape(), (2, 24));
        let names = df.get_column_names();
        assert_eq!(names[0], "id");
        assert_eq!(names[1], "epsg");
        assert_eq!(names[2], "lon");
        assert_eq!(names[3], "lat");
        assert_eq!(names[4], "bio1 (Celsius)");
        assert_eq!(names[23], "elevation (meters)");

        let bio1 = df.column("bio1 (Celsius)").unwrap().f64().unwrap();
        assert!((bio1.get(0).unwrap() - -263.15).abs() < 1e-9);
    }

    #[tokio::test]
    async fn writes_csv_with_unit_headers() {
        let dir = tempfile::tempdir().unwrap();
        write_fake_dataset(dir.path(), Dataset::Worldclim);

        let extractor = BioclimExtractor::new(dir.path());
        let point = CrsDataPoint::new("site-1", 4326, 10.5, 49.5).unwrap();
        let set = extractor
            .extract(Dataset::Worldclim, &[point])
            .await
            .unwrap();

        let out = dir.path().join("out.csv");
        set.write_csv(&out).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("id,epsg,lon,lat,bio1 (Celsius)"));
        assert!(header.ends_with("elevation (meters)"));
        assert!(text.lines().nth(1).unwrap().starts_with("site-1,4326,10.5,49.5,100.0"));
    }
}
