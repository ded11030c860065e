//! Nearest-neighbour point sampling over single-band GeoTIFF rasters.
//!
//! Chunks (strips or tiles) are decoded on demand and cached, so batches of
//! nearby points pay the decode cost once per chunk instead of once per
//! point.

use crate::raster::error::RasterError;
use log::debug;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tiff::decoder::ifd::Value;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

#[derive(Debug)]
enum ChunkLayout {
    Stripped {
        rows_per_strip: u32,
    },
    Tiled {
        tile_width: u32,
        tile_height: u32,
        tiles_per_row: u32,
    },
}

/// North-up affine geotransform: pixel (0, 0) has its outer corner at
/// (`origin_x`, `origin_y`) and pixel sizes are positive.
#[derive(Debug)]
struct GeoTransform {
    origin_x: f64,
    origin_y: f64,
    pixel_width: f64,
    pixel_height: f64,
}

/// One decoded chunk. Edge chunks are clipped to the image, so the row
/// stride can be narrower than the nominal tile width.
#[derive(Debug)]
struct CachedChunk {
    stride: u32,
    data: Vec<f64>,
}

/// A GeoTIFF raster opened for repeated point lookups.
#[derive(Debug)]
pub struct GeoTiffSampler {
    path: PathBuf,
    decoder: Decoder<BufReader<File>>,
    width: u32,
    height: u32,
    layout: ChunkLayout,
    transform: GeoTransform,
    nodata: Option<f64>,
    cache: HashMap<u32, CachedChunk>,
}

impl GeoTiffSampler {
    /// Opens a raster and reads its georeferencing tags. Fails when the file
    /// carries no geotransform, since point lookups would be meaningless.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RasterError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| RasterError::Open(path.clone(), e))?;
        let mut decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| RasterError::Decode(path.clone(), e))?;

        let (width, height) = decoder
            .dimensions()
            .map_err(|e| RasterError::Decode(path.clone(), e))?;
        let (chunk_width, chunk_height) = decoder.chunk_dimensions();
        let layout = if chunk_width == width {
            ChunkLayout::Stripped {
                rows_per_strip: chunk_height,
            }
        } else {
            ChunkLayout::Tiled {
                tile_width: chunk_width,
                tile_height: chunk_height,
                tiles_per_row: width.div_ceil(chunk_width),
            }
        };

        let transform = Self::read_geotransform(&mut decoder, &path)?;
        let nodata = Self::read_nodata(&mut decoder, &path)?;

        debug!(
            "Opened raster {} ({}x{}, {}x{} chunks, nodata {:?})",
            path.display(),
            width,
            height,
            chunk_width,
            chunk_height,
            nodata
        );

        Ok(Self {
            path,
            decoder,
            width,
            height,
            layout,
            transform,
            nodata,
            cache: HashMap::new(),
        })
    }

    fn read_geotransform(
        decoder: &mut Decoder<BufReader<File>>,
        path: &Path,
    ) -> Result<GeoTransform, RasterError> {
        let scale = Self::read_f64_tag(decoder, path, Tag::ModelPixelScaleTag)?;
        let tiepoint = Self::read_f64_tag(decoder, path, Tag::ModelTiepointTag)?;
        let (Some(scale), Some(tiepoint)) = (scale, tiepoint) else {
            return Err(RasterError::MissingGeoTags(path.to_path_buf()));
        };
        if scale.len() < 2 || tiepoint.len() < 6 {
            return Err(RasterError::MissingGeoTags(path.to_path_buf()));
        }
        // Tiepoint maps raster (i, j) to model (x, y); in practice always
        // the top-left corner (0, 0).
        Ok(GeoTransform {
            origin_x: tiepoint[3] - tiepoint[0] * scale[0],
            origin_y: tiepoint[4] + tiepoint[1] * scale[1],
            pixel_width: scale[0],
            pixel_height: scale[1],
        })
    }

    fn read_f64_tag(
        decoder: &mut Decoder<BufReader<File>>,
        path: &Path,
        tag: Tag,
    ) -> Result<Option<Vec<f64>>, RasterError> {
        decoder
            .find_tag(tag)
            .map_err(|e| RasterError::Decode(path.to_path_buf(), e))?
            .map(|value| {
                value
                    .into_f64_vec()
                    .map_err(|e| RasterError::Decode(path.to_path_buf(), e))
            })
            .transpose()
    }

    fn read_nodata(
        decoder: &mut Decoder<BufReader<File>>,
        path: &Path,
    ) -> Result<Option<f64>, RasterError> {
        let value = decoder
            .find_tag(Tag::GdalNodata)
            .map_err(|e| RasterError::Decode(path.to_path_buf(), e))?;
        // GDAL stores the nodata value as an ASCII string, NUL-padded.
        Ok(match value {
            Some(Value::Ascii(text)) => text.trim_end_matches('\0').trim().parse::<f64>().ok(),
            _ => None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw nearest-neighbour pixel value at WGS84 (`lon`, `lat`).
    ///
    /// Returns `None` when the point falls outside the raster extent or hits
    /// a nodata/NaN pixel. No scale/offset correction is applied here; that
    /// is dataset knowledge, not raster knowledge.
    pub fn sample(&mut self, lon: f64, lat: f64) -> Result<Option<f64>, RasterError> {
        let col = (lon - self.transform.origin_x) / self.transform.pixel_width;
        let row = (self.transform.origin_y - lat) / self.transform.pixel_height;
        if col < 0.0 || row < 0.0 {
            return Ok(None);
        }
        let (col, row) = (col.floor() as u32, row.floor() as u32);
        if col >= self.width || row >= self.height {
            return Ok(None);
        }

        let (chunk_index, local_row, local_col) = match &self.layout {
            ChunkLayout::Stripped { rows_per_strip } => {
                (row / rows_per_strip, row % rows_per_strip, col)
            }
            ChunkLayout::Tiled {
                tile_width,
                tile_height,
                tiles_per_row,
            } => {
                let chunk_index = (row / tile_height) * tiles_per_row + col / tile_width;
                (chunk_index, row % tile_height, col % tile_width)
            }
        };

        if !self.cache.contains_key(&chunk_index) {
            // Edge chunks come back clipped to the image, so the decoded
            // buffer's stride is the data width, not the nominal tile width.
            let (data_width, _) = self.decoder.chunk_data_dimensions(chunk_index);
            let result = self
                .decoder
                .read_chunk(chunk_index)
                .map_err(|e| RasterError::Decode(self.path.clone(), e))?;
            let data = Self::chunk_to_f64(result)
                .ok_or_else(|| RasterError::UnsupportedSampleFormat(self.path.clone()))?;
            self.cache.insert(
                chunk_index,
                CachedChunk {
                    stride: data_width,
                    data,
                },
            );
        }

        let chunk = &self.cache[&chunk_index];
        let raw = chunk
            .data
            .get(local_row as usize * chunk.stride as usize + local_col as usize)
            .copied();
        Ok(raw.filter(|v| !self.is_nodata(*v)))
    }

    fn is_nodata(&self, value: f64) -> bool {
        if value.is_nan() {
            return true;
        }
        match self.nodata {
            Some(nodata) => value == nodata || (nodata.is_nan() && value.is_nan()),
            None => false,
        }
    }

    fn chunk_to_f64(result: DecodingResult) -> Option<Vec<f64>> {
        Some(match result {
            DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
            DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
            DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::F64(v) => v,
        })
    }
}
