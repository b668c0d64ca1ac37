use crate::error::{Result, WindowMapError};
use crate::iterator::{BlockSize, Extent, Tile};
use crate::options::CreateOptions;
use crate::storage::{PixelType, RasterDest, RasterMetadata, RasterSource, StorageBackend};
use gdal::cpl::CslStringList;
use gdal::raster::{Buffer, GdalDataType, RasterBand};
use gdal::{Dataset, DriverManager};
use log::{debug, info, warn};
use std::path::Path;

/// GDAL-backed storage. Reads anything GDAL can open and writes GeoTIFF.
#[derive(Debug, Clone, Copy, Default)]
pub struct GdalBackend;

pub struct GdalSource {
    dataset: Dataset,
    metadata: RasterMetadata,
}

pub struct GdalDest {
    dataset: Dataset,
}

fn pixel_type_from_gdal(data_type: GdalDataType) -> PixelType {
    match data_type {
        GdalDataType::UInt8 => PixelType::UInt8,
        GdalDataType::UInt16 => PixelType::UInt16,
        GdalDataType::Int16 => PixelType::Int16,
        GdalDataType::UInt32 => PixelType::UInt32,
        GdalDataType::Int32 => PixelType::Int32,
        GdalDataType::Float32 => PixelType::Float32,
        GdalDataType::Float64 => PixelType::Float64,
        other => {
            warn!("Unsupported band type {:?}, writing Float32", other);
            PixelType::Float32
        }
    }
}

/// Extract metadata from a dataset without reading any pixels
pub fn extract_metadata_from_dataset(dataset: &Dataset) -> Result<RasterMetadata> {
    let (width, height) = dataset.raster_size();
    let extent = Extent::new(width, height)?;

    let band_count = dataset.raster_count() as usize;
    if band_count == 0 {
        return Err(WindowMapError::InvalidDimensions(width, height));
    }

    let first: RasterBand = dataset.rasterband(1)?;
    let pixel_type = pixel_type_from_gdal(first.band_type());
    let (block_x, block_y) = first.block_size();

    let mut no_data = Vec::with_capacity(band_count);
    for band in 1..=band_count {
        no_data.push(dataset.rasterband(band)?.no_data_value());
    }

    // Rasters without a geotransform still process; pixel space is identity
    let geotransform = dataset
        .geo_transform()
        .unwrap_or([0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

    debug!(
        "Raster {}x{}, {} band(s), {:?}, natural block {}x{}",
        width, height, band_count, pixel_type, block_x, block_y
    );

    Ok(RasterMetadata {
        extent,
        band_count,
        pixel_type,
        geotransform,
        projection: dataset.projection(),
        no_data,
        natural_block: BlockSize::new(block_x.min(width), block_y.min(height)),
    })
}

fn band_of<'a>(dataset: &'a Dataset, band: usize) -> Result<RasterBand<'a>> {
    let count = dataset.raster_count() as usize;
    if band == 0 || band > count {
        return Err(WindowMapError::BandOutOfRange { band, count });
    }
    Ok(dataset.rasterband(band)?)
}

fn check_buffer(tile: &Tile, len: usize) -> Result<()> {
    if len != tile.pixel_count() {
        return Err(WindowMapError::BufferSizeMismatch {
            expected: tile.pixel_count(),
            actual: len,
        });
    }
    Ok(())
}

impl StorageBackend for GdalBackend {
    type Source = GdalSource;
    type Dest = GdalDest;

    fn open(&self, path: &Path) -> Result<GdalSource> {
        info!("Opening input raster: {}", path.display());
        let opened = Dataset::open(path)
            .map_err(WindowMapError::from)
            .and_then(|dataset| {
                let metadata = extract_metadata_from_dataset(&dataset)?;
                Ok(GdalSource { dataset, metadata })
            });
        opened.map_err(|e| WindowMapError::SourceOpenFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn create(
        &self,
        path: &Path,
        like: &RasterMetadata,
        options: &CreateOptions,
    ) -> Result<GdalDest> {
        info!("Creating output raster: {}", path.display());
        create_output_dataset(path, like, options)
            .map(|dataset| GdalDest { dataset })
            .map_err(|e| WindowMapError::DestCreateFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
    }
}

/// Create a GeoTIFF matching `like` in geometry and band type
pub fn create_output_dataset(
    path: &Path,
    like: &RasterMetadata,
    options: &CreateOptions,
) -> Result<Dataset> {
    let driver = DriverManager::get_driver_by_name("GTiff")?;

    let mut gdal_options = CslStringList::new();
    for opt in options.to_creation_options() {
        gdal_options.add_string(&opt)?;
    }

    let (width, height, bands) = (like.extent.width, like.extent.height, like.band_count);
    macro_rules! create_as {
        ($t:ty) => {
            driver.create_with_band_type_with_options::<$t, _>(
                path,
                width,
                height,
                bands,
                &gdal_options,
            )?
        };
    }

    let mut dataset = match like.pixel_type {
        PixelType::UInt8 => create_as!(u8),
        PixelType::UInt16 => create_as!(u16),
        PixelType::Int16 => create_as!(i16),
        PixelType::UInt32 => create_as!(u32),
        PixelType::Int32 => create_as!(i32),
        PixelType::Float32 => create_as!(f32),
        PixelType::Float64 => create_as!(f64),
    };

    dataset.set_geo_transform(&like.geotransform)?;
    if !like.projection.is_empty() {
        dataset.set_projection(&like.projection)?;
    }

    Ok(dataset)
}

impl RasterSource for GdalSource {
    fn metadata(&self) -> &RasterMetadata {
        &self.metadata
    }

    fn read_tile(&self, band: usize, tile: &Tile, buffer: &mut [f32]) -> Result<()> {
        check_buffer(tile, buffer.len())?;
        let rasterband = band_of(&self.dataset, band)?;
        let size = (tile.x_size, tile.y_size);
        rasterband.read_into_slice::<f32>(
            (tile.x_off as isize, tile.y_off as isize),
            size,
            size,
            buffer,
            None,
        )?;
        Ok(())
    }
}

impl RasterDest for GdalDest {
    fn set_no_data_value(&mut self, band: usize, value: Option<f64>) -> Result<()> {
        let mut rasterband = band_of(&self.dataset, band)?;
        rasterband.set_no_data_value(value)?;
        Ok(())
    }

    fn no_data_value(&self, band: usize) -> Result<Option<f64>> {
        Ok(band_of(&self.dataset, band)?.no_data_value())
    }

    fn write_tile(&mut self, band: usize, tile: &Tile, buffer: &[f32]) -> Result<()> {
        check_buffer(tile, buffer.len())?;
        let mut rasterband = band_of(&self.dataset, band)?;
        let size = (tile.x_size, tile.y_size);
        let mut data = Buffer::new(size, buffer.to_vec());
        rasterband.write((tile.x_off as isize, tile.y_off as isize), size, &mut data)?;
        Ok(())
    }

    fn close(mut self) -> Result<()> {
        self.dataset.flush_cache()?;
        debug!("Output raster flushed");
        Ok(())
    }
}
