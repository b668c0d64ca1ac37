//! Windowed raster processing: walk a raster in fixed-size, optionally
//! overlapping tiles and run a [`Transform`] over each one.

pub mod cli;
pub mod error;
pub mod focal;
pub mod io;
pub mod iterator;
pub mod memory;
pub mod options;
pub mod process;
pub mod storage;
pub mod transform;

// Re-export commonly used types
pub use error::{ErrorKind, Result, WindowMapError};
pub use focal::FocalMean;
pub use io::GdalBackend;
pub use iterator::{BlockSize, Extent, Tile, TileIterator};
pub use memory::{MemRaster, MemoryBackend};
pub use options::{Compression, CreateOptions};
pub use process::{MapOptions, MapSummary, RasterProcessor};
pub use storage::{PixelType, RasterDest, RasterMetadata, RasterSource, StorageBackend};
pub use transform::{Identity, Threshold, ThresholdKind, Transform};
