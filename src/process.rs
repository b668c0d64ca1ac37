use crate::error::{Result, WindowMapError};
use crate::iterator::{BlockSize, Tile, TileIterator};
use crate::options::{Compression, CreateOptions};
use crate::storage::{RasterDest, RasterMetadata, RasterSource, StorageBackend};
use crate::transform::{is_no_data, Transform};
use log::{debug, info};
use std::path::Path;

/// Tiling and output settings for one `map` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MapOptions {
    /// Nominal tile size. Defaults to the source's natural block size.
    /// Without a halo the block must reach the last row and column, see
    /// [`TileIterator::covers_extent`].
    pub block_size: Option<BlockSize>,
    /// Halo width. A positive value selects overlapping tiles.
    pub buffer_size: Option<usize>,
    /// Create a sparse destination and skip writing tiles that are entirely
    /// no-data. Tiles are only skipped without a halo, so overlapping runs
    /// write every tile and match a dense run pixel for pixel.
    pub skip_holes: bool,
    pub compression: Compression,
}

impl MapOptions {
    pub fn with_block_size(mut self, width: usize, height: usize) -> Self {
        self.block_size = Some(BlockSize::new(width, height));
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = Some(buffer_size);
        self
    }

    pub fn with_skip_holes(mut self, skip_holes: bool) -> Self {
        self.skip_holes = skip_holes;
        self
    }

    fn create_options(&self) -> CreateOptions {
        CreateOptions {
            compression: self.compression,
            tiled: true,
            sparse: self.skip_holes,
        }
    }
}

/// Outcome of a successful `map` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MapSummary {
    pub bands: usize,
    pub tiles_written: usize,
    /// Tiles left unwritten because their output was entirely no-data.
    pub tiles_skipped: usize,
}

/// Drives a [`Transform`] over a raster tile by tile.
#[derive(Debug, Clone, Default)]
pub struct RasterProcessor<B> {
    backend: B,
}

impl<B: StorageBackend> RasterProcessor<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Apply `transform` to every tile of every band of `source`, writing the
    /// results to a new raster at `dest` with the same geometry.
    ///
    /// Bands are processed in ascending order and tiles in row-major order.
    /// The first failing read, transform call or write aborts the run and
    /// leaves `dest` partially written.
    pub fn map<T>(
        &self,
        transform: &T,
        source: impl AsRef<Path>,
        dest: impl AsRef<Path>,
        options: &MapOptions,
    ) -> Result<MapSummary>
    where
        T: Transform + ?Sized,
    {
        let (source, dest) = (source.as_ref(), dest.as_ref());

        let src = self.backend.open(source)?;
        let metadata = src.metadata().clone();
        info!(
            "Source {}: {}x{}, {} band(s)",
            source.display(),
            metadata.extent.width,
            metadata.extent.height,
            metadata.band_count
        );

        // Validate the tiling before anything is created
        let template = build_iterator(&metadata, options)?;

        let mut dst = self
            .backend
            .create(dest, &metadata, &options.create_options())?;
        for band in 1..=metadata.band_count {
            dst.set_no_data_value(band, metadata.band_no_data(band))?;
        }

        let buffer_len = template.max_tile_len();
        let mut input = alloc_tile_buffer(buffer_len)?;
        let mut output = alloc_tile_buffer(buffer_len)?;
        debug!("Allocated two tile buffers of {} pixels", buffer_len);

        // A skipped tile would leave its neighbour's halo in the shared overlap
        let skip_empty = options.skip_holes && template.buffer_size() == 0;
        let mut summary = MapSummary {
            bands: metadata.band_count,
            ..MapSummary::default()
        };

        for band in 1..=metadata.band_count {
            let in_no_data = metadata.band_no_data(band);
            let out_no_data = dst.no_data_value(band)?;
            debug!(
                "Band {}: no-data in={:?} out={:?}",
                band, in_no_data, out_no_data
            );

            for tile in template.clone() {
                let n = tile.pixel_count();
                let (input, output) = (&mut input[..n], &mut output[..n]);

                src.read_tile(band, &tile, input)
                    .map_err(|e| tile_error(e, band, &tile, TileStage::Read))?;

                transform
                    .process(
                        input,
                        output,
                        tile.x_size,
                        tile.y_size,
                        in_no_data,
                        out_no_data,
                    )
                    .map_err(|e| tile_error(e, band, &tile, TileStage::Transform))?;

                if skip_empty
                    && out_no_data.is_some()
                    && output.iter().all(|&v| is_no_data(v, out_no_data))
                {
                    debug!("Band {}: skipping empty tile {:?}", band, tile);
                    summary.tiles_skipped += 1;
                    continue;
                }

                dst.write_tile(band, &tile, output)
                    .map_err(|e| tile_error(e, band, &tile, TileStage::Write))?;
                summary.tiles_written += 1;
            }
        }

        dst.close()?;
        info!(
            "Wrote {} tile(s) across {} band(s) to {} ({} skipped)",
            summary.tiles_written,
            summary.bands,
            dest.display(),
            summary.tiles_skipped
        );
        Ok(summary)
    }

    /// Chain several transforms over each tile read.
    ///
    /// Not implemented yet. Returns `NotImplemented` without touching storage.
    pub fn map_many(
        &self,
        _transforms: &[&dyn Transform],
        _source: impl AsRef<Path>,
        _dest: impl AsRef<Path>,
        _options: &MapOptions,
    ) -> Result<MapSummary> {
        Err(WindowMapError::NotImplemented("map_many"))
    }

    /// Combine several input rasters into one output with a single transform.
    ///
    /// Not implemented yet. Returns `NotImplemented` without touching storage.
    pub fn reduce<T, P>(
        &self,
        _transform: &T,
        _sources: &[P],
        _dest: impl AsRef<Path>,
        _options: &MapOptions,
    ) -> Result<MapSummary>
    where
        T: Transform + ?Sized,
        P: AsRef<Path>,
    {
        Err(WindowMapError::NotImplemented("reduce"))
    }
}

/// Configured, unstarted iterator for `metadata`. Clone it for each band.
pub fn build_iterator(metadata: &RasterMetadata, options: &MapOptions) -> Result<TileIterator> {
    let halo = options.buffer_size.unwrap_or(0);
    let mut iterator = if halo > 0 {
        TileIterator::buffered(metadata.extent)
    } else {
        TileIterator::new(metadata.extent)
    };

    let block = options.block_size.unwrap_or(metadata.natural_block);
    iterator.set_block_size(block.width, block.height)?;
    if halo > 0 {
        iterator.set_buffer_size(halo)?;
    }
    if !iterator.covers_extent() {
        return Err(WindowMapError::InvalidConfig(format!(
            "Block size {}x{} never reaches the last row or column of the {}x{} raster; \
             pick another block size or a positive buffer size",
            block.width, block.height, metadata.extent.width, metadata.extent.height
        )));
    }

    debug!(
        "Tiling with {}x{} blocks, buffer {}",
        block.width, block.height, halo
    );
    Ok(iterator)
}

fn alloc_tile_buffer(len: usize) -> Result<Vec<f32>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| WindowMapError::AllocFailed(len))?;
    buffer.resize(len, 0.0);
    Ok(buffer)
}

#[derive(Debug, Clone, Copy)]
enum TileStage {
    Read,
    Transform,
    Write,
}

fn tile_error(err: WindowMapError, band: usize, tile: &Tile, stage: TileStage) -> WindowMapError {
    let (x_off, y_off, reason) = (tile.x_off, tile.y_off, err.to_string());
    match stage {
        TileStage::Read => WindowMapError::ReadFailed {
            band,
            x_off,
            y_off,
            reason,
        },
        TileStage::Transform => WindowMapError::TransformFailed {
            band,
            x_off,
            y_off,
            reason,
        },
        TileStage::Write => WindowMapError::WriteFailed {
            band,
            x_off,
            y_off,
            reason,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::iterator::Extent;
    use crate::memory::MemoryBackend;
    use crate::storage::PixelType;
    use crate::transform::Identity;

    fn metadata(width: usize, height: usize) -> RasterMetadata {
        RasterMetadata {
            extent: Extent::new(width, height).unwrap(),
            band_count: 1,
            pixel_type: PixelType::Float32,
            geotransform: [0.0, 1.0, 0.0, 0.0, 0.0, -1.0],
            projection: String::new(),
            no_data: vec![None],
            natural_block: BlockSize::new(width, 1),
        }
    }

    #[test]
    fn test_build_iterator_defaults_to_natural_block() {
        let mut meta = metadata(10, 12);
        meta.natural_block = BlockSize::new(5, 4);
        let it = build_iterator(&meta, &MapOptions::default()).unwrap();
        assert!(!it.is_buffered());
        assert_eq!(it.block_size(), BlockSize::new(5, 4));
    }

    #[test]
    fn test_build_iterator_rejects_strip_block_that_misses_last_row() {
        let err = build_iterator(&metadata(10, 12), &MapOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);

        let options = MapOptions::default().with_block_size(5, 5);
        assert!(build_iterator(&metadata(11, 12), &options).is_err());
    }

    #[test]
    fn test_build_iterator_accepts_strip_block_with_halo() {
        let options = MapOptions::default().with_buffer_size(1);
        let it = build_iterator(&metadata(10, 12), &options).unwrap();
        assert!(it.covers_extent());
        assert_eq!(it.block_size(), BlockSize::new(10, 1));
    }

    #[test]
    fn test_build_iterator_selects_overlap() {
        let options = MapOptions::default()
            .with_block_size(5, 5)
            .with_buffer_size(1);
        let it = build_iterator(&metadata(10, 12), &options).unwrap();
        assert!(it.is_buffered());
        assert_eq!(it.buffer_size(), 1);
        assert_eq!(it.max_tile_len(), 49);
    }

    #[test]
    fn test_build_iterator_zero_buffer_is_plain() {
        let options = MapOptions::default()
            .with_block_size(5, 5)
            .with_buffer_size(0);
        let it = build_iterator(&metadata(10, 12), &options).unwrap();
        assert!(!it.is_buffered());
    }

    #[test]
    fn test_build_iterator_rejects_oversized_block() {
        let options = MapOptions::default().with_block_size(11, 5);
        let err = build_iterator(&metadata(10, 12), &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn test_alloc_tile_buffer() {
        assert_eq!(alloc_tile_buffer(25).unwrap().len(), 25);
        assert!(matches!(
            alloc_tile_buffer(usize::MAX),
            Err(WindowMapError::AllocFailed(_))
        ));
    }

    #[test]
    fn test_tile_error_wraps_stage() {
        let tile = Tile::new(5, 10, 5, 2);
        let err = tile_error(
            WindowMapError::Process("boom".into()),
            2,
            &tile,
            TileStage::Write,
        );
        assert_eq!(err.kind(), ErrorKind::WriteFailed);
        assert_eq!(
            err.to_string(),
            "Write failed on band 2 at (5,10): Processing error: boom"
        );
    }

    #[test]
    fn test_map_many_and_reduce_not_implemented() {
        let processor = RasterProcessor::new(MemoryBackend::new());
        let options = MapOptions::default();
        let identity = Identity;
        let chain: [&dyn Transform; 2] = [&identity, &identity];
        let err = processor
            .map_many(&chain, "a", "b", &options)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotImplemented);
        let err = processor
            .reduce(&identity, &["a", "b"], "c", &options)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotImplemented);
        assert!(processor.backend().get("c").is_none());
    }
}
