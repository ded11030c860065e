//! The bioclim dataset catalog: which rasters exist, where they live on the
//! remote mirrors, and how packed pixel values map to physical units.

use std::fmt;

const CHELSA_BASE_URL: &str =
    "https://os.zhdk.cloud.switch.ch/chelsav2/GLOBAL/climatologies/1981-2010/bio/";
const WORLDCLIM_BASE_URL: &str = "https://geodata.ucdavis.edu/climate/worldclim/2_1/base/";

const WORLDCLIM_BIO_ZIP: &str = "wc2.1_30s_bio.zip";
const WORLDCLIM_ELEV_ZIP: &str = "wc2.1_30s_elev.zip";
const WORLDCLIM_ELEV_TIF: &str = "wc2.1_30s_elev.tif";

/// Temperature variables that CHELSA stores in Kelvin (0.1 K per digit).
const CHELSA_KELVIN_VARIABLES: [&str; 7] = ["bio1", "bio5", "bio6", "bio8", "bio9", "bio10", "bio11"];

/// A bioclimatic raster dataset supported by this crate.
///
/// Both datasets publish the 19 standard bioclim variables as global GeoTIFF
/// rasters in EPSG:4326; elevation is taken from WorldClim for either
/// dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    /// CHELSA V2.1 climatologies, 1981-2010, 30 arc seconds.
    Chelsa,
    /// WorldClim 2.1, 1970-2000, 30 arc seconds.
    Worldclim,
}

/// Metadata for one climate variable, shared between datasets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BioVariable {
    /// Short code, `bio1`..`bio19` or `elevation`.
    pub code: &'static str,
    pub long_name: &'static str,
    pub unit: &'static str,
    /// One-line explanation of the measurement.
    pub description: &'static str,
}

impl BioVariable {
    /// Column header used in extraction output, e.g. `bio1 (Celsius)`.
    pub fn column_name(&self) -> String {
        format!("{} ({})", self.code, self.unit)
    }
}

/// The 19 standard bioclimatic variables, in output order.
pub const BIO_VARIABLES: [BioVariable; 19] = [
    BioVariable {
        code: "bio1",
        long_name: "Annual Mean Temperature",
        unit: "Celsius",
        description: "Mean of all monthly mean temperatures.",
    },
    BioVariable {
        code: "bio2",
        long_name: "Mean Diurnal Range",
        unit: "Celsius",
        description: "Mean of monthly (max temp - min temp).",
    },
    BioVariable {
        code: "bio3",
        long_name: "Isothermality",
        unit: "Celsius",
        description: "Day-to-night temperature oscillation relative to the annual range (bio2/bio7 * 100).",
    },
    BioVariable {
        code: "bio4",
        long_name: "Temperature Seasonality",
        unit: "Celsius/100",
        description: "Standard deviation of monthly mean temperatures * 100.",
    },
    BioVariable {
        code: "bio5",
        long_name: "Max Temperature of Warmest Month",
        unit: "Celsius",
        description: "Highest monthly maximum temperature.",
    },
    BioVariable {
        code: "bio6",
        long_name: "Min Temperature of Coldest Month",
        unit: "Celsius",
        description: "Lowest monthly minimum temperature.",
    },
    BioVariable {
        code: "bio7",
        long_name: "Temperature Annual Range",
        unit: "Celsius",
        description: "Difference between the warmest and coldest month extremes (bio5 - bio6).",
    },
    BioVariable {
        code: "bio8",
        long_name: "Mean Temperature of Wettest Quarter",
        unit: "Celsius",
        description: "Mean temperature of the wettest three-month period.",
    },
    BioVariable {
        code: "bio9",
        long_name: "Mean Temperature of Driest Quarter",
        unit: "Celsius",
        description: "Mean temperature of the driest three-month period.",
    },
    BioVariable {
        code: "bio10",
        long_name: "Mean Temperature of Warmest Quarter",
        unit: "Celsius",
        description: "Mean temperature of the warmest three-month period.",
    },
    BioVariable {
        code: "bio11",
        long_name: "Mean Temperature of Coldest Quarter",
        unit: "Celsius",
        description: "Mean temperature of the coldest three-month period.",
    },
    BioVariable {
        code: "bio12",
        long_name: "Annual Precipitation",
        unit: "kg / m**2 / year",
        description: "Sum of all monthly precipitation.",
    },
    BioVariable {
        code: "bio13",
        long_name: "Precipitation of Wettest Month",
        unit: "kg / m**2 / month",
        description: "Precipitation of the wettest month.",
    },
    BioVariable {
        code: "bio14",
        long_name: "Precipitation of Driest Month",
        unit: "kg / m**2 / month",
        description: "Precipitation of the driest month.",
    },
    BioVariable {
        code: "bio15",
        long_name: "Precipitation Seasonality",
        unit: "kg / m**2",
        description: "Coefficient of variation of monthly precipitation.",
    },
    BioVariable {
        code: "bio16",
        long_name: "Precipitation of Wettest Quarter",
        unit: "kg / m**2 / month",
        description: "Precipitation of the wettest three-month period.",
    },
    BioVariable {
        code: "bio17",
        long_name: "Precipitation of Driest Quarter",
        unit: "kg / m**2 / month",
        description: "Precipitation of the driest three-month period.",
    },
    BioVariable {
        code: "bio18",
        long_name: "Precipitation of Warmest Quarter",
        unit: "kg / m**2 / month",
        description: "Precipitation of the warmest three-month period.",
    },
    BioVariable {
        code: "bio19",
        long_name: "Precipitation of Coldest Quarter",
        unit: "kg / m**2 / month",
        description: "Precipitation of the coldest three-month period.",
    },
];

/// The WorldClim elevation layer, appended to every extraction.
pub const ELEVATION: BioVariable = BioVariable {
    code: "elevation",
    long_name: "Elevation",
    unit: "meters",
    description: "Elevation in meters derived from the Shuttle Radar Topography Mission.",
};

/// How a remote file lands in the data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RemoteFileKind {
    /// A GeoTIFF stored as-is.
    Plain,
    /// A zip archive that is unpacked into the data directory and deleted.
    ZipArchive,
}

/// One entry of a dataset's download manifest.
#[derive(Debug, Clone)]
pub(crate) struct RemoteFile {
    pub url: String,
    /// Name the payload is stored under while downloading.
    pub file_name: String,
    /// File whose presence in the data directory marks this entry done.
    pub satisfied_by: String,
    pub kind: RemoteFileKind,
}

impl Dataset {
    pub(crate) fn slug(&self) -> &'static str {
        match self {
            Dataset::Chelsa => "chelsa",
            Dataset::Worldclim => "worldclim",
        }
    }

    /// Human-readable dataset title used in log lines.
    pub fn title(&self) -> &'static str {
        match self {
            Dataset::Chelsa => "CHELSA V2.1 (1981-2010)",
            Dataset::Worldclim => "WorldClim 2.1 (1970-2000)",
        }
    }

    /// The 19 bioclim variables of this dataset, in output order.
    pub fn variables(&self) -> &'static [BioVariable] {
        &BIO_VARIABLES
    }

    /// The elevation layer sampled alongside the bioclim variables.
    pub fn elevation(&self) -> &'static BioVariable {
        &ELEVATION
    }

    /// The full extraction column order: bio1..bio19 followed by elevation.
    pub fn all_variables(&self) -> Vec<&'static BioVariable> {
        let mut vars: Vec<&'static BioVariable> = BIO_VARIABLES.iter().collect();
        vars.push(&ELEVATION);
        vars
    }

    /// On-disk raster file name for a variable of this dataset.
    pub(crate) fn file_name(&self, variable: &BioVariable) -> String {
        if variable.code == ELEVATION.code {
            return WORLDCLIM_ELEV_TIF.to_string();
        }
        match self {
            Dataset::Chelsa => format!("CHELSA_{}_1981-2010_V.2.1.tif", variable.code),
            Dataset::Worldclim => {
                // "bio7" -> "wc2.1_30s_bio_7.tif"
                let number = &variable.code["bio".len()..];
                format!("wc2.1_30s_bio_{number}.tif")
            }
        }
    }

    /// Multiplier applied to raw pixel values. CHELSA rasters are packed as
    /// integers at 0.1 units per digit; WorldClim and elevation are stored
    /// in physical units.
    pub(crate) fn scale(&self, variable: &BioVariable) -> f64 {
        if variable.code == ELEVATION.code {
            return 1.0;
        }
        match self {
            Dataset::Chelsa => 0.1,
            Dataset::Worldclim => 1.0,
        }
    }

    /// Additive correction applied after scaling. CHELSA temperature
    /// variables are packed in Kelvin.
    pub(crate) fn offset(&self, variable: &BioVariable) -> f64 {
        match self {
            Dataset::Chelsa if CHELSA_KELVIN_VARIABLES.contains(&variable.code) => -273.15,
            _ => 0.0,
        }
    }

    /// The download manifest for this dataset. The CHELSA manifest includes
    /// the WorldClim elevation archive so a CHELSA-only download still
    /// supports full extraction.
    pub(crate) fn remote_files(&self) -> Vec<RemoteFile> {
        let elevation_archive = RemoteFile {
            url: format!("{WORLDCLIM_BASE_URL}{WORLDCLIM_ELEV_ZIP}"),
            file_name: WORLDCLIM_ELEV_ZIP.to_string(),
            satisfied_by: WORLDCLIM_ELEV_TIF.to_string(),
            kind: RemoteFileKind::ZipArchive,
        };
        match self {
            Dataset::Chelsa => {
                let mut files: Vec<RemoteFile> = BIO_VARIABLES
                    .iter()
                    .map(|variable| {
                        let file_name = self.file_name(variable);
                        RemoteFile {
                            url: format!("{CHELSA_BASE_URL}{file_name}"),
                            satisfied_by: file_name.clone(),
                            file_name,
                            kind: RemoteFileKind::Plain,
                        }
                    })
                    .collect();
                files.push(elevation_archive);
                files
            }
            Dataset::Worldclim => vec![
                RemoteFile {
                    url: format!("{WORLDCLIM_BASE_URL}{WORLDCLIM_BIO_ZIP}"),
                    file_name: WORLDCLIM_BIO_ZIP.to_string(),
                    // Any member works as the marker; the first is enough.
                    satisfied_by: "wc2.1_30s_bio_1.tif".to_string(),
                    kind: RemoteFileKind::ZipArchive,
                },
                elevation_archive,
            ],
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}
