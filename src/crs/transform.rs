//! Thin seam over `proj4rs` for normalizing point coordinates to WGS84.
//!
//! EPSG codes are resolved through the bundled `crs-definitions` registry,
//! which doubles as the validity check for user-supplied codes. All raster
//! sampling happens in EPSG:4326, the native CRS of the CHELSA and WorldClim
//! rasters.

use crate::crs::error::ProjectionError;
use proj4rs::transform::transform;
use proj4rs::Proj;

/// EPSG code of the WGS84 geographic CRS, the reference system of both
/// supported datasets.
pub const WGS84_EPSG: u32 = 4326;

const WGS84_PROJ: &str = "+proj=longlat +datum=WGS84 +no_defs";

fn lookup(epsg: u32) -> Result<crs_definitions::Def, ProjectionError> {
    u16::try_from(epsg)
        .ok()
        .and_then(crs_definitions::from_code)
        .ok_or(ProjectionError::UnknownEpsg(epsg))
}

/// Checks that `epsg` names a CRS known to the registry.
pub fn validate_epsg(epsg: u32) -> Result<(), ProjectionError> {
    lookup(epsg).map(|_| ())
}

/// Transforms a single `(x, y)` coordinate from `epsg` into WGS84
/// longitude/latitude degrees. Axis order is always x-then-y (easting,
/// northing), regardless of what the CRS authority definition says.
pub fn to_wgs84(epsg: u32, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
    if epsg == WGS84_EPSG {
        return Ok((x, y));
    }
    let def = lookup(epsg)?;
    let src = Proj::from_proj_string(def.proj4)
        .map_err(|source| ProjectionError::Definition { epsg, source })?;
    let dst = Proj::from_proj_string(WGS84_PROJ)
        .map_err(|source| ProjectionError::Definition { epsg, source })?;

    // proj4rs expects geographic coordinates in radians.
    let mut point = if src.is_latlong() {
        (x.to_radians(), y.to_radians(), 0.0)
    } else {
        (x, y, 0.0)
    };
    transform(&src, &dst, &mut point)
        .map_err(|source| ProjectionError::Transform { epsg, source })?;

    Ok((point.0.to_degrees(), point.1.to_degrees()))
}
