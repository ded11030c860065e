use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("EPSG:{0} is not a known coordinate reference system")]
    UnknownEpsg(u32),

    #[error("Failed to build projection for EPSG:{epsg}")]
    Definition {
        epsg: u32,
        #[source]
        source: proj4rs::errors::Error,
    },

    #[error("Failed to transform coordinates from EPSG:{epsg} to WGS84")]
    Transform {
        epsg: u32,
        #[source]
        source: proj4rs::errors::Error,
    },
}
