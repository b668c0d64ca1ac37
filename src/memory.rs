//! In-memory storage, keyed by path.
//!
//! Destinations are registered in the store as soon as they are created and
//! every write lands there immediately. A `map` call that aborts part-way
//! leaves the partial raster visible, as a file-backed store would.

use crate::error::{Result, WindowMapError};
use crate::iterator::Tile;
use crate::options::CreateOptions;
use crate::storage::{RasterDest, RasterMetadata, RasterSource, StorageBackend};
use log::debug;
use ndarray::{s, Array2, ArrayView2};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A raster held as one `Array2<f32>` per band, shaped `(height, width)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MemRaster {
    pub metadata: RasterMetadata,
    pub bands: Vec<Array2<f32>>,
    /// Layout requested at creation, `None` for seeded rasters.
    pub creation: Option<CreateOptions>,
}

impl MemRaster {
    /// Build a raster from band arrays. Every band must match the metadata
    /// extent and the band count.
    pub fn new(metadata: RasterMetadata, bands: Vec<Array2<f32>>) -> Result<Self> {
        let (width, height) = (metadata.extent.width, metadata.extent.height);
        if bands.len() != metadata.band_count {
            return Err(WindowMapError::BandOutOfRange {
                band: bands.len(),
                count: metadata.band_count,
            });
        }
        if let Some(bad) = bands.iter().find(|b| b.dim() != (height, width)) {
            let (rows, cols) = bad.dim();
            return Err(WindowMapError::InvalidDimensions(cols, rows));
        }
        Ok(Self {
            metadata,
            bands,
            creation: None,
        })
    }

    /// Blank raster shaped like `like`, filled with each band's no-data value (or 0).
    fn blank(like: &RasterMetadata, creation: CreateOptions) -> Self {
        let shape = (like.extent.height, like.extent.width);
        let bands = (1..=like.band_count)
            .map(|band| {
                let fill = like.band_no_data(band).map_or(0.0, |nd| nd as f32);
                Array2::from_elem(shape, fill)
            })
            .collect();
        Self {
            metadata: like.clone(),
            bands,
            creation: Some(creation),
        }
    }

    fn band(&self, band: usize) -> Result<&Array2<f32>> {
        let count = self.bands.len();
        band.checked_sub(1)
            .and_then(|i| self.bands.get(i))
            .ok_or(WindowMapError::BandOutOfRange { band, count })
    }

    fn band_mut(&mut self, band: usize) -> Result<&mut Array2<f32>> {
        let count = self.bands.len();
        band.checked_sub(1)
            .and_then(|i| self.bands.get_mut(i))
            .ok_or(WindowMapError::BandOutOfRange { band, count })
    }
}

type Store = Rc<RefCell<HashMap<PathBuf, MemRaster>>>;

/// Storage backend that keeps rasters in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    store: Store,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, raster: MemRaster) {
        self.store.borrow_mut().insert(path.into(), raster);
    }

    /// Snapshot of the raster stored at `path`.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<MemRaster> {
        self.store.borrow().get(path.as_ref()).cloned()
    }
}

pub struct MemSource {
    raster: MemRaster,
}

pub struct MemDest {
    store: Store,
    path: PathBuf,
}

impl MemDest {
    fn with_raster<R>(&self, f: impl FnOnce(&mut MemRaster) -> Result<R>) -> Result<R> {
        let mut store = self.store.borrow_mut();
        let raster = store
            .get_mut(&self.path)
            .ok_or_else(|| WindowMapError::MissingRaster(self.path.display().to_string()))?;
        f(raster)
    }
}

fn check_tile(tile: &Tile, raster: &MemRaster, len: usize) -> Result<()> {
    let extent = raster.metadata.extent;
    if tile.x_off + tile.x_size > extent.width || tile.y_off + tile.y_size > extent.height {
        return Err(WindowMapError::TileOutOfBounds {
            x_off: tile.x_off,
            y_off: tile.y_off,
            x_size: tile.x_size,
            y_size: tile.y_size,
            width: extent.width,
            height: extent.height,
        });
    }
    if len != tile.pixel_count() {
        return Err(WindowMapError::BufferSizeMismatch {
            expected: tile.pixel_count(),
            actual: len,
        });
    }
    Ok(())
}

impl StorageBackend for MemoryBackend {
    type Source = MemSource;
    type Dest = MemDest;

    fn open(&self, path: &Path) -> Result<MemSource> {
        self.get(path)
            .map(|raster| MemSource { raster })
            .ok_or_else(|| WindowMapError::SourceOpenFailed {
                path: path.display().to_string(),
                reason: "no such raster in memory store".to_string(),
            })
    }

    fn create(
        &self,
        path: &Path,
        like: &RasterMetadata,
        options: &CreateOptions,
    ) -> Result<MemDest> {
        debug!("Creating in-memory raster {}", path.display());
        let mut blank_like = like.clone();
        blank_like.no_data = vec![None; like.band_count];
        self.insert(path, MemRaster::blank(&blank_like, *options));
        Ok(MemDest {
            store: Rc::clone(&self.store),
            path: path.to_path_buf(),
        })
    }
}

impl RasterSource for MemSource {
    fn metadata(&self) -> &RasterMetadata {
        &self.raster.metadata
    }

    fn read_tile(&self, band: usize, tile: &Tile, buffer: &mut [f32]) -> Result<()> {
        check_tile(tile, &self.raster, buffer.len())?;
        let window = self.raster.band(band)?.slice(s![
            tile.y_off..tile.y_off + tile.y_size,
            tile.x_off..tile.x_off + tile.x_size
        ]);
        for (dst, &src) in buffer.iter_mut().zip(window.iter()) {
            *dst = src;
        }
        Ok(())
    }
}

impl RasterDest for MemDest {
    fn set_no_data_value(&mut self, band: usize, value: Option<f64>) -> Result<()> {
        self.with_raster(|raster| {
            raster.band_mut(band)?;
            let fill = value.map_or(0.0, |nd| nd as f32);
            raster.metadata.no_data[band - 1] = value;
            // Unwritten pixels read back as the new sentinel
            raster.bands[band - 1].fill(fill);
            Ok(())
        })
    }

    fn no_data_value(&self, band: usize) -> Result<Option<f64>> {
        self.with_raster(|raster| {
            raster.band(band)?;
            Ok(raster.metadata.band_no_data(band))
        })
    }

    fn write_tile(&mut self, band: usize, tile: &Tile, buffer: &[f32]) -> Result<()> {
        self.with_raster(|raster| {
            check_tile(tile, raster, buffer.len())?;
            let pixel_type = raster.metadata.pixel_type;
            let src = ArrayView2::from_shape((tile.y_size, tile.x_size), buffer)?;
            let mut window = raster.band_mut(band)?.slice_mut(s![
                tile.y_off..tile.y_off + tile.y_size,
                tile.x_off..tile.x_off + tile.x_size
            ]);
            window.zip_mut_with(&src, |dst, &v| *dst = pixel_type.quantize(v));
            Ok(())
        })
    }

    fn close(self) -> Result<()> {
        debug!("Closing in-memory raster {}", self.path.display());
        Ok(())
    }
}
