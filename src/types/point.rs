//! A georeferenced sample point and the CSV loader for point batches.

use crate::crs::error::ProjectionError;
use crate::crs::transform::{self, WGS84_EPSG};
use log::debug;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PointError {
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error("Coordinates for point '{id}' must be finite numbers (got x={x}, y={y})")]
    NonFiniteCoordinate { id: String, x: f64, y: f64 },

    #[error("Failed to open point CSV '{0}'")]
    CsvOpen(PathBuf, #[source] csv::Error),

    #[error("Failed to parse point CSV '{path}' at record {record}")]
    CsvParse {
        path: PathBuf,
        record: usize,
        #[source]
        source: csv::Error,
    },
}

/// A single specimen or site location expressed in some coordinate
/// reference system.
///
/// The EPSG code is validated against the CRS registry on construction and
/// the coordinates are required to be finite, so a `CrsDataPoint` can always
/// be reprojected.
///
/// # Examples
///
/// ```
/// use bioclim::CrsDataPoint;
///
/// let sherby = CrsDataPoint::new("Sherbrooke", 4326, -71.890068, 45.393869).unwrap();
/// assert_eq!(sherby.epsg(), 4326);
/// assert_eq!(sherby.xy(), (-71.890068, 45.393869));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CrsDataPoint {
    id: String,
    epsg: u32,
    x: f64,
    y: f64,
}

/// Raw CSV row with the fixed `id,epsg,x,y` header, before validation.
#[derive(Debug, Deserialize)]
struct RawPointRecord {
    id: String,
    epsg: u32,
    x: f64,
    y: f64,
}

impl CrsDataPoint {
    /// Builds a validated point. Fails when the EPSG code is unknown to the
    /// registry or when a coordinate is NaN/infinite.
    pub fn new(
        id: impl Into<String>,
        epsg: u32,
        x: f64,
        y: f64,
    ) -> Result<Self, PointError> {
        let id = id.into();
        transform::validate_epsg(epsg)?;
        if !x.is_finite() || !y.is_finite() {
            return Err(PointError::NonFiniteCoordinate { id, x, y });
        }
        Ok(Self { id, epsg, x, y })
    }

    /// Loads a batch of points from a CSV file with the fixed columns
    /// `id,epsg,x,y` (header required). Every row passes through
    /// [`CrsDataPoint::new`]; the first invalid row aborts the load with the
    /// record number attached.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Vec<Self>, PointError> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|source| PointError::CsvOpen(path.to_path_buf(), source))?;

        let mut points = Vec::new();
        for (index, row) in reader.deserialize::<RawPointRecord>().enumerate() {
            let record = row.map_err(|source| PointError::CsvParse {
                path: path.to_path_buf(),
                // Record numbers are 1-based and exclude the header.
                record: index + 1,
                source,
            })?;
            points.push(Self::new(record.id, record.epsg, record.x, record.y)?);
        }
        debug!("Loaded {} points from {}", points.len(), path.display());
        Ok(points)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    /// The `(x, y)` pair in the point's own CRS.
    pub fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Returns the same point expressed in WGS84 longitude/latitude.
    /// Identity for points already in EPSG:4326.
    pub fn to_wgs84(&self) -> Result<Self, PointError> {
        if self.epsg == WGS84_EPSG {
            return Ok(self.clone());
        }
        debug!(
            "Reprojecting point '{}' from EPSG:{} to WGS84",
            self.id, self.epsg
        );
        let (lon, lat) = transform::to_wgs84(self.epsg, self.x, self.y)?;
        Ok(Self {
            id: self.id.clone(),
            epsg: WGS84_EPSG,
            x: lon,
            y: lat,
        })
    }
}

impl fmt::Display for CrsDataPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [EPSG:{}] (x={}, y={})",
            self.id, self.epsg, self.x, self.y
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn rejects_unknown_epsg() {
        let err = CrsDataPoint::new("nowhere", 123_456, 0.0, 0.0).unwrap_err();
        assert!(matches!(
            err,
            PointError::Projection(ProjectionError::UnknownEpsg(123_456))
        ));
    }

    #[test]
    fn rejects_non_finite_coordinates() {
        let err = CrsDataPoint::new("nan-town", 4326, f64::NAN, 45.0).unwrap_err();
        assert!(matches!(err, PointError::NonFiniteCoordinate { .. }));
        let err = CrsDataPoint::new("inf-ville", 4326, 1.0, f64::INFINITY).unwrap_err();
        assert!(matches!(err, PointError::NonFiniteCoordinate { .. }));
    }

    #[test]
    fn reprojects_web_mercator_point() {
        let sherby =
            CrsDataPoint::new("Sherbrooke", 3857, -8002765.769038227, 5683742.6823244635)
                .unwrap();
        let wgs84 = sherby.to_wgs84().unwrap();
        assert_eq!(wgs84.id(), "Sherbrooke");
        assert_eq!(wgs84.epsg(), 4326);
        assert!((wgs84.x() - -71.8900680).abs() < 1e-6);
        assert!((wgs84.y() - 45.3938688).abs() < 1e-6);
    }

    #[test]
    fn wgs84_point_is_returned_unchanged() {
        let paris = CrsDataPoint::new("Paris", 4326, 2.346963, 48.858885).unwrap();
        assert_eq!(paris.to_wgs84().unwrap(), paris);
    }

    #[test]
    fn loads_points_from_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,epsg,x,y").unwrap();
        writeln!(file, "sherby,3857,-8002765.769038227,5683742.6823244635").unwrap();
        writeln!(file, "paris, 4326, 2.346963, 48.858885").unwrap();
        file.flush().unwrap();

        let points = CrsDataPoint::from_csv_path(file.path()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].id(), "sherby");
        assert_eq!(points[0].epsg(), 3857);
        assert_eq!(points[1].id(), "paris");
        assert_eq!(points[1].xy(), (2.346963, 48.858885));
    }

    #[test]
    fn csv_parse_error_names_the_record() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,epsg,x,y").unwrap();
        writeln!(file, "ok,4326,1.0,2.0").unwrap();
        writeln!(file, "broken,4326,not-a-number,2.0").unwrap();
        file.flush().unwrap();

        let err = CrsDataPoint::from_csv_path(file.path()).unwrap_err();
        match err {
            PointError::CsvParse { record, .. } => assert_eq!(record, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let err = CrsDataPoint::from_csv_path("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, PointError::CsvOpen(..)));
    }
}
