//! Storage capabilities the processing pipeline depends on.
//!
//! Bands are 1-indexed throughout, matching GDAL.

use crate::error::Result;
use crate::iterator::{BlockSize, Extent, Tile};
use crate::options::CreateOptions;
use std::path::Path;

/// Sample type of a raster's bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelType {
    UInt8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    #[default]
    Float32,
    Float64,
}

impl PixelType {
    /// Round and saturate `value` to what this type can hold.
    pub fn quantize(self, value: f32) -> f32 {
        let clamp = |min: f64, max: f64| {
            if value.is_nan() {
                0.0
            } else {
                (value as f64).round().clamp(min, max) as f32
            }
        };
        match self {
            PixelType::UInt8 => clamp(u8::MIN as f64, u8::MAX as f64),
            PixelType::UInt16 => clamp(u16::MIN as f64, u16::MAX as f64),
            PixelType::Int16 => clamp(i16::MIN as f64, i16::MAX as f64),
            PixelType::UInt32 => clamp(u32::MIN as f64, u32::MAX as f64),
            PixelType::Int32 => clamp(i32::MIN as f64, i32::MAX as f64),
            PixelType::Float32 | PixelType::Float64 => value,
        }
    }
}

/// Geometry and band layout of a raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterMetadata {
    pub extent: Extent,
    pub band_count: usize,
    pub pixel_type: PixelType,
    pub geotransform: [f64; 6],
    pub projection: String,
    /// No-data value for each band, index 0 is band 1.
    pub no_data: Vec<Option<f64>>,
    /// Native block layout of band 1.
    pub natural_block: BlockSize,
}

impl RasterMetadata {
    pub fn band_no_data(&self, band: usize) -> Option<f64> {
        band.checked_sub(1)
            .and_then(|i| self.no_data.get(i).copied())
            .flatten()
    }
}

/// Opens and creates rasters.
pub trait StorageBackend {
    type Source: RasterSource;
    type Dest: RasterDest;

    /// Open an existing raster for reading. Fails with `SourceOpenFailed`.
    fn open(&self, path: &Path) -> Result<Self::Source>;

    /// Create a raster with the extent, band count, pixel type, geotransform
    /// and projection of `like`. No-data values are not copied.
    /// Fails with `DestCreateFailed`.
    fn create(
        &self,
        path: &Path,
        like: &RasterMetadata,
        options: &CreateOptions,
    ) -> Result<Self::Dest>;
}

pub trait RasterSource {
    fn metadata(&self) -> &RasterMetadata;

    /// Read the pixels of `tile` from `band` into `buffer`, which holds
    /// exactly `tile.pixel_count()` elements.
    fn read_tile(&self, band: usize, tile: &Tile, buffer: &mut [f32]) -> Result<()>;
}

pub trait RasterDest {
    fn set_no_data_value(&mut self, band: usize, value: Option<f64>) -> Result<()>;

    /// No-data value of `band`. Fails if the band does not exist.
    fn no_data_value(&self, band: usize) -> Result<Option<f64>>;

    /// Write `buffer` (exactly `tile.pixel_count()` elements) to `tile` in `band`.
    fn write_tile(&mut self, band: usize, tile: &Tile, buffer: &[f32]) -> Result<()>;

    /// Flush pending writes and release the raster.
    fn close(self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_integer_types() {
        assert_eq!(PixelType::UInt8.quantize(300.0), 255.0);
        assert_eq!(PixelType::UInt8.quantize(-4.0), 0.0);
        assert_eq!(PixelType::Int16.quantize(12.6), 13.0);
        assert_eq!(PixelType::Int32.quantize(f32::NAN), 0.0);
        assert_eq!(PixelType::Float32.quantize(0.25), 0.25);
    }

    #[test]
    fn test_band_no_data_is_one_indexed() {
        let meta = RasterMetadata {
            extent: Extent::new(4, 4).unwrap(),
            band_count: 2,
            pixel_type: PixelType::Float32,
            geotransform: [0.0, 1.0, 0.0, 0.0, 0.0, -1.0],
            projection: String::new(),
            no_data: vec![Some(-1.0), None],
            natural_block: BlockSize::new(4, 1),
        };
        assert_eq!(meta.band_no_data(0), None);
        assert_eq!(meta.band_no_data(1), Some(-1.0));
        assert_eq!(meta.band_no_data(2), None);
        assert_eq!(meta.band_no_data(3), None);
    }
}
